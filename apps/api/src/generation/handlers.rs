//! Axum route handlers for the Generation API.

use axum::{extract::State, response::Response, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::generation::extract_latex;
use crate::generation::generator::{edit_latex, generate_latex};
use crate::render::handlers::pdf_response;
use crate::state::AppState;
use crate::templates::TemplateChoice;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub input_text: String,
    pub template_override: Option<String>,
    pub template_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub latex: String,
    pub instruction: String,
}

#[derive(Debug, Serialize)]
pub struct LatexResponse {
    pub latex: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /generate
///
/// Drafts LaTeX from notes. Template precedence: override > id > stored default.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<LatexResponse>, AppError> {
    let latex = draft(&state, &request, "OpenAI generation failed").await?;
    Ok(Json(LatexResponse { latex }))
}

/// POST /generate-pdf
///
/// Generate and compile in one call; responds with the PDF.
pub async fn handle_generate_pdf(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, AppError> {
    let latex = draft(&state, &request, "Generation failed").await?;
    let artifact = state.compiler.compile(&latex).await?;
    pdf_response(artifact).await
}

/// POST /edit
pub async fn handle_edit(
    State(state): State<AppState>,
    Json(request): Json<EditRequest>,
) -> Result<Json<LatexResponse>, AppError> {
    if request.latex.trim().is_empty() {
        return Err(AppError::Validation("LaTeX must not be empty.".to_string()));
    }
    if request.instruction.trim().is_empty() {
        return Err(AppError::Validation(
            "Instruction must not be empty.".to_string(),
        ));
    }

    let raw = edit_latex(state.llm.as_ref(), &request.latex, &request.instruction)
        .await
        .map_err(|e| AppError::generation("OpenAI edit failed", e))?;

    Ok(Json(LatexResponse {
        latex: extract_latex(&raw),
    }))
}

/// Resolves the template, asks the model for a draft and normalises the output.
async fn draft(
    state: &AppState,
    request: &GenerateRequest,
    failure_context: &str,
) -> Result<String, AppError> {
    let template = TemplateChoice::from_request(
        request.template_override.as_deref(),
        request.template_id.as_deref(),
    )
    .resolve(&state.templates)
    .await?;

    let raw = generate_latex(state.llm.as_ref(), &request.input_text, Some(&template))
        .await
        .map_err(|e| AppError::generation(failure_context, e))?;

    Ok(extract_latex(&raw))
}

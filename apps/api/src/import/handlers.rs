//! Axum route handlers for the Import API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::generation::extract_latex;
use crate::generation::generator::generate_from_markup;
use crate::generation::handlers::LatexResponse;
use crate::import::ProfileSource;
use crate::state::AppState;
use crate::templates::TemplateChoice;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: String,
    pub template_override: Option<String>,
    pub template_id: Option<String>,
}

/// POST /import/:source
///
/// Fetches a public profile page and drafts LaTeX from it. URL, domain and content
/// type are all checked before the model is called.
pub async fn handle_import(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<LatexResponse>, AppError> {
    let source = ProfileSource::from_slug(&source)
        .ok_or_else(|| AppError::NotFound(format!("Unknown profile source: {source}")))?;

    let url = state.fetcher.validate(source, &request.url)?;
    let html = state.fetcher.fetch(url).await?;
    info!("Fetched {:?} profile markup ({} bytes)", source, html.len());

    let template = TemplateChoice::from_request(
        request.template_override.as_deref(),
        request.template_id.as_deref(),
    )
    .resolve(&state.templates)
    .await?;

    let raw = generate_from_markup(state.llm.as_ref(), &html, Some(&template))
        .await
        .map_err(|e| AppError::generation("OpenAI generation failed", e))?;

    let latex = extract_latex(&raw);
    if latex.is_empty() {
        return Err(AppError::Generation("No LaTeX produced.".to_string()));
    }

    Ok(Json(LatexResponse { latex }))
}

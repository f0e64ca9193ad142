//! Axum route handlers for the Render API.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::generation::extract_latex;
use crate::render::ArtifactGuard;
use crate::state::AppState;

const PDF_FILENAME: &str = "cv.pdf";

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub latex: String,
}

/// POST /render
///
/// Compiles submitted LaTeX. Fenced model output is accepted and unwrapped first.
pub async fn handle_render(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Result<Response, AppError> {
    let latex = extract_latex(&request.latex);
    if latex.is_empty() {
        return Err(AppError::Validation("LaTeX must not be empty.".to_string()));
    }

    let artifact = state.compiler.compile(&latex).await?;
    pdf_response(artifact).await
}

/// Streams an artifact as a PDF download. The file is removed once the body is done.
pub async fn pdf_response(artifact: ArtifactGuard) -> Result<Response, AppError> {
    let body = artifact
        .into_body()
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("Failed to open PDF")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{PDF_FILENAME}\""),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;

    use crate::test_support::{state_with, ScriptedGenerator, TestEnv};

    #[tokio::test]
    async fn test_blank_source_is_rejected_before_compiling() {
        let env = TestEnv::new();
        let state = state_with(env.config(), Arc::new(ScriptedGenerator::failing()));

        let err = handle_render(
            State(state),
            Json(RenderRequest {
                latex: "```latex\n   \n```".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "LaTeX must not be empty.");
    }

    #[tokio::test]
    async fn test_pdf_response_headers_and_cleanup() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"%PDF-1.5").unwrap();

        let response = pdf_response(ArtifactGuard::new(path.clone())).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"cv.pdf\""
        );

        drop(response);
        assert!(!path.exists());
    }
}

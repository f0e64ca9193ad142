use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::import::FetchError;
use crate::llm_client::LlmError;
use crate::render::CompileError;
use crate::templates::TemplateError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// This is the only place where error kinds turn into HTTP status codes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// An external system answered with an error status; `status` is the raw upstream code.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    Generation(String),

    #[error("{0}")]
    Compilation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wraps a completion failure. A missing credential is a configuration problem,
    /// everything else is reported as a failed generation with `context` as prefix.
    pub fn generation(context: &str, err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => AppError::Configuration(err.to_string()),
            other => AppError::Generation(format!("{context}: {other}")),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Upstream { status, .. } => map_upstream_status(*status),
            AppError::Generation(_)
            | AppError::Compilation(_)
            | AppError::Configuration(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Collapses an upstream status code onto the small set we pass through.
///
/// 401, 403 and 404 are kept; any other error code, or a code that is not a
/// registered HTTP status, becomes 502. The non-standard 999 some sites use
/// to signal bot blocking is treated as 403.
pub fn map_upstream_status(code: u16) -> StatusCode {
    let known = StatusCode::from_u16(code)
        .ok()
        .filter(|s| s.canonical_reason().is_some());

    match known {
        Some(status) => match code {
            401 | 403 | 404 => status,
            c if c < 400 => status,
            _ => StatusCode::BAD_GATEWAY,
        },
        None if code == 999 => StatusCode::FORBIDDEN,
        None => StatusCode::BAD_GATEWAY,
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::InvalidIdentifier | TemplateError::NotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            TemplateError::EmptyTemplate => AppError::Validation(err.to_string()),
            TemplateError::Io(e) => {
                AppError::Internal(anyhow::Error::new(e).context("Template storage failed"))
            }
        }
    }
}

impl From<CompileError> for AppError {
    fn from(err: CompileError) -> Self {
        AppError::Compilation(format!("LaTeX compilation failed: {err}"))
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl | FetchError::DomainNotAllowed | FetchError::NotHtml(_) => {
                AppError::Validation(err.to_string())
            }
            FetchError::Status(status) => AppError::Upstream {
                status,
                message: err.to_string(),
            },
            FetchError::Transport(_) => AppError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{message}");
        } else if let AppError::Upstream { status: original, .. } = &self {
            tracing::info!(
                "Mapped upstream status {original} -> {}",
                status.as_u16()
            );
        }

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

//! Axum route handlers for the Template API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;
use crate::templates::TemplateInfo;

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateInfo>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub template: String,
}

#[derive(Debug, Deserialize)]
pub struct TemplateUpdateRequest {
    pub template: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// GET /templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Result<Json<TemplateListResponse>, AppError> {
    let templates = state.templates.list().await?;
    Ok(Json(TemplateListResponse { templates }))
}

/// GET /template?id=
///
/// Without an id, returns the stored default (or the bundled one).
pub async fn handle_get_template(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<TemplateResponse>, AppError> {
    let template = match query.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => state.templates.resolve_by_id(id).await?,
        None => state.templates.resolve_default().await?,
    };
    Ok(Json(TemplateResponse { template }))
}

/// PUT /template
pub async fn handle_update_template(
    State(state): State<AppState>,
    Json(request): Json<TemplateUpdateRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    state.templates.write_default(&request.template).await?;
    Ok(Json(StatusResponse { status: "updated" }))
}

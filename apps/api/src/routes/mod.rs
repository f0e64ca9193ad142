pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::require_auth;
use crate::state::AppState;
use crate::{generation, import, render, templates};

/// Builds the full router. Everything except health sits behind bearer auth, and
/// all routes share the configured prefix.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        // Template API
        .route(
            "/templates",
            get(templates::handlers::handle_list_templates),
        )
        .route(
            "/template",
            get(templates::handlers::handle_get_template)
                .put(templates::handlers::handle_update_template),
        )
        // Generation API
        .route("/generate", post(generation::handlers::handle_generate))
        .route(
            "/generate-pdf",
            post(generation::handlers::handle_generate_pdf),
        )
        .route("/edit", post(generation::handlers::handle_edit))
        // Render API
        .route("/render", post(render::handlers::handle_render))
        // Import API
        .route("/import/:source", post(import::handlers::handle_import))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .route("/health", get(health::health_handler))
        .merge(protected);

    let prefix = state.config.api_prefix.clone();
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };

    app.with_state(state)
}

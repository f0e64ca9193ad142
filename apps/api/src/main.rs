mod auth;
mod config;
mod errors;
mod generation;
mod import;
mod llm_client;
mod render;
mod routes;
mod state;
mod templates;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::render::InstalledEngines;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; malformed values abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Vitae API v{}", env!("CARGO_PKG_VERSION"));

    if config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY not set; generation endpoints will fail");
    }
    info!("LLM model: {}", config.openai_model);

    let engines = InstalledEngines::detect();
    if engines.is_empty() {
        warn!("No LaTeX engine found on PATH; PDF endpoints will fail");
    } else {
        info!("LaTeX engines: {:?}", engines);
    }

    let state = AppState::from_config(config.clone())?;
    if let Some(auth) = &state.auth {
        info!("Bearer auth enabled (issuer: {})", auth.issuer());
    } else {
        warn!("AUTH0_DOMAIN/AUTH0_AUDIENCE not set; protected routes will refuse requests");
    }
    info!(
        "Templates: custom={} builtin={}",
        config.template_dir.display(),
        config.builtin_template_dir.display()
    );

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}{}", config.api_prefix);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

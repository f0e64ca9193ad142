use std::sync::Arc;

use anyhow::Result;

use crate::auth::AuthVerifier;
use crate::config::Config;
use crate::import::ProfileFetcher;
use crate::llm_client::{LlmClient, TextGenerator};
use crate::render::DocumentCompiler;
use crate::templates::TemplateStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub templates: TemplateStore,
    /// Completion backend. Default: `LlmClient`; tests inject fakes.
    pub llm: Arc<dyn TextGenerator>,
    pub compiler: DocumentCompiler,
    pub fetcher: ProfileFetcher,
    /// `None` when auth settings are missing; protected routes then refuse requests.
    pub auth: Option<Arc<AuthVerifier>>,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self> {
        let llm = LlmClient::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
            config.generation_timeout,
        )?;
        Self::with_generator(config, Arc::new(llm))
    }

    pub fn with_generator(config: Config, llm: Arc<dyn TextGenerator>) -> Result<Self> {
        let templates = TemplateStore::new(&config.template_dir, &config.builtin_template_dir);
        let compiler = DocumentCompiler::new(config.compile_timeout);
        let fetcher = ProfileFetcher::new(
            config.fetch_timeout,
            config.import_max_chars,
            config.import_allowed_domains.clone(),
        )?;
        let auth = AuthVerifier::from_settings(
            config.auth0_domain.as_deref(),
            config.auth0_audience.as_deref(),
        )?
        .map(Arc::new);

        Ok(Self {
            config: Arc::new(config),
            templates,
            llm,
            compiler,
            fetcher,
            auth,
        })
    }
}

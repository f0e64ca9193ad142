use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Constructed once at startup and shared read-only through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub api_prefix: String,
    /// Writable directory for custom templates (and the stored default).
    pub template_dir: PathBuf,
    /// Bundled, read-only templates shipped with the service.
    pub builtin_template_dir: PathBuf,
    /// Missing key is not fatal at startup; generation calls fail instead.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub generation_timeout: Duration,
    pub compile_timeout: Duration,
    pub fetch_timeout: Duration,
    pub import_max_chars: usize,
    /// Comma-separated override of the per-source profile domains.
    pub import_allowed_domains: Option<Vec<String>>,
    pub auth0_domain: Option<String>,
    pub auth0_audience: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            api_prefix: normalize_prefix(
                &std::env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            ),
            template_dir: PathBuf::from(
                std::env::var("TEMPLATE_DIR").unwrap_or_else(|_| "/app/templates".to_string()),
            ),
            builtin_template_dir: std::env::var("BUILTIN_TEMPLATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))
                }),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            generation_timeout: Duration::from_secs(parse_env("GENERATION_TIMEOUT_SECS", 120)?),
            compile_timeout: Duration::from_secs(parse_env("COMPILE_TIMEOUT_SECS", 120)?),
            fetch_timeout: Duration::from_secs(parse_env("FETCH_TIMEOUT_SECS", 20)?),
            import_max_chars: parse_env("IMPORT_MAX_CHARS", 150_000)?,
            import_allowed_domains: optional_env("IMPORT_ALLOWED_DOMAINS")
                .map(|raw| parse_domain_list(&raw)),
            auth0_domain: optional_env("AUTH0_DOMAIN"),
            auth0_audience: optional_env("AUTH0_AUDIENCE"),
        })
    }
}

/// Treats unset and blank variables alike.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().trim_end_matches('.').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

#[cfg(test)]
impl Config {
    /// Config rooted in temporary directories, with auth and generation unconfigured.
    pub fn for_tests(template_dir: PathBuf, builtin_template_dir: PathBuf) -> Self {
        Config {
            port: 0,
            rust_log: "debug".to_string(),
            api_prefix: "/api".to_string(),
            template_dir,
            builtin_template_dir,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "http://127.0.0.1:9".to_string(),
            generation_timeout: Duration::from_secs(5),
            compile_timeout: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(5),
            import_max_chars: 150_000,
            import_allowed_domains: None,
            auth0_domain: None,
            auth0_audience: None,
        }
    }
}

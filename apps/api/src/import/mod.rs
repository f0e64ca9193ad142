//! Profile import. Fetches a public profile page so the model can turn it into a CV.
//!
//! URLs are checked against a per-source domain allow-list before any request is
//! made, and only HTML responses are accepted. Markup is truncated to a bounded
//! number of characters before it reaches the prompt.

pub mod handlers;

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{info, warn};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL.")]
    InvalidUrl,

    #[error("Please provide a profile URL from a supported domain.")]
    DomainNotAllowed,

    #[error("Unexpected content type '{0}'. Expected HTML.")]
    NotHtml(String),

    /// Upstream answered with an error status (raw code, mapped at the API boundary).
    #[error("Profile could not be retrieved (login required or not public).")]
    Status(u16),

    #[error("Could not load profile: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Sites profiles can be imported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    LinkedIn,
}

impl ProfileSource {
    /// Path segment used in `/import/:source`.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug.to_ascii_lowercase().as_str() {
            "linkedin" => Some(ProfileSource::LinkedIn),
            _ => None,
        }
    }

    /// Domains accepted when no explicit allow-list is configured.
    pub fn default_domains(self) -> &'static [&'static str] {
        match self {
            ProfileSource::LinkedIn => &["linkedin.com"],
        }
    }
}

/// Parses `raw` and checks scheme and host. The host must be one of `allowed`
/// or a subdomain of one.
pub fn validate_url<S: AsRef<str>>(raw: &str, allowed: &[S]) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|_| FetchError::InvalidUrl)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl);
    }

    let host = url
        .host_str()
        .ok_or(FetchError::InvalidUrl)?
        .trim_end_matches('.')
        .to_ascii_lowercase();
    let permitted = allowed.iter().any(|domain| {
        let domain = domain.as_ref();
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    });

    if permitted {
        Ok(url)
    } else {
        Err(FetchError::DomainNotAllowed)
    }
}

/// Rejects anything that is not an HTML document.
pub fn ensure_html(content_type: &str) -> Result<(), FetchError> {
    if content_type.to_ascii_lowercase().contains("text/html") {
        Ok(())
    } else {
        Err(FetchError::NotHtml(content_type.to_string()))
    }
}

/// Cuts `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}

/// HTTP client for profile pages. Follows redirects, bounded by a timeout.
#[derive(Clone)]
pub struct ProfileFetcher {
    client: Client,
    max_chars: usize,
    /// Replaces every source's default domains when set.
    allowed_domains: Option<Vec<String>>,
}

impl ProfileFetcher {
    pub fn new(
        timeout: Duration,
        max_chars: usize,
        allowed_domains: Option<Vec<String>>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            max_chars,
            allowed_domains,
        })
    }

    /// Validates `raw` against the allow-list that applies to `source`.
    pub fn validate(&self, source: ProfileSource, raw: &str) -> Result<Url, FetchError> {
        match &self.allowed_domains {
            Some(domains) => validate_url(raw, domains),
            None => validate_url(raw, source.default_domains()),
        }
    }

    /// Fetches the page at `url` and returns its (possibly truncated) HTML.
    pub async fn fetch(&self, url: Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, BROWSER_ACCEPT)
            .send()
            .await
            .map_err(|e| {
                warn!("Profile fetch failed: {e}");
                FetchError::Transport(e)
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if status.as_u16() >= 400 {
            info!(
                "Profile upstream error: status={} url={} ctype={}",
                status.as_u16(),
                url,
                content_type
            );
            return Err(FetchError::Status(status.as_u16()));
        }

        ensure_html(&content_type)?;

        let html = response.text().await?;
        let original_len = html.len();
        let html = truncate_chars(html, self.max_chars);
        if html.len() < original_len {
            info!("Profile markup truncated from {original_len} to {} bytes", html.len());
        }
        Ok(html)
    }
}

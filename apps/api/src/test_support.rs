//! Fixtures shared by handler and router tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;
use tempfile::TempDir;

use crate::config::Config;
use crate::llm_client::{LlmError, TextGenerator};
use crate::state::AppState;

/// Custom and builtin template directories that live as long as the test.
pub struct TestEnv {
    pub custom: TempDir,
    pub builtin: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            custom: TempDir::new().unwrap(),
            builtin: TempDir::new().unwrap(),
        }
    }

    pub fn config(&self) -> Config {
        Config::for_tests(
            self.custom.path().to_path_buf(),
            self.builtin.path().to_path_buf(),
        )
    }

    pub fn write_builtin(&self, id: &str, text: &str) {
        std::fs::write(self.builtin.path().join(format!("{id}.tex")), text).unwrap();
    }
}

/// State with a generator that always fails; `auth` is `(domain, audience)`.
pub fn test_state(env: &TestEnv, auth: Option<(&str, &str)>) -> AppState {
    let mut config = env.config();
    if let Some((domain, audience)) = auth {
        config.auth0_domain = Some(domain.to_string());
        config.auth0_audience = Some(audience.to_string());
    }
    AppState::with_generator(config, Arc::new(ScriptedGenerator::failing())).unwrap()
}

/// Generator returning a fixed reply (or a transport-style failure) and
/// recording the prompts it was given.
pub struct ScriptedGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
    last_user_prompt: std::sync::Mutex<Option<String>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_user_prompt: std::sync::Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_user_prompt: std::sync::Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.last_user_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user_prompt.lock().unwrap() = Some(user.to_string());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(LlmError::Api {
                status: 503,
                message: "connection reset by peer".to_string(),
            }),
        }
    }
}

/// State wired to `generator`, keeping a handle so tests can inspect calls.
pub fn state_with(config: Config, generator: Arc<ScriptedGenerator>) -> AppState {
    AppState::with_generator(config, generator).unwrap()
}

/// Runs `app` on an ephemeral loopback port for the rest of the test.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Serves one page on a loopback port and returns its URL.
pub async fn serve_page(status: u16, content_type: &'static str, body: &'static str) -> String {
    let status = StatusCode::from_u16(status).unwrap();
    let app = Router::new().route(
        "/in/jane",
        get(move || async move { (status, [(header::CONTENT_TYPE, content_type)], body) }),
    );
    let addr = serve(app).await;
    format!("http://{addr}/in/jane")
}

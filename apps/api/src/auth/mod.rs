//! Bearer-token authentication against an Auth0-style tenant.
//!
//! Tokens are RS256 JWTs checked for audience, issuer and expiry (10s leeway).
//! Signing keys come from the tenant's JWKS endpoint; the set is fetched on first
//! use, cached, and refreshed once when a token names an unknown `kid`.

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::state::AppState;

const LEEWAY_SECS: u64 = 10;
const JWKS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Token expired")]
    Expired,

    #[error("Invalid audience")]
    InvalidAudience,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Token validation failed")]
    Invalid,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

/// Claims of a validated token, attached to the request as an extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Verifies bearer tokens for one tenant. Built once at startup.
pub struct AuthVerifier {
    audience: String,
    issuer: String,
    jwks_url: String,
    http: Client,
    keys: RwLock<Option<JwkSet>>,
}

impl AuthVerifier {
    pub fn new(domain: &str, audience: &str) -> Result<Self, reqwest::Error> {
        let domain = domain
            .trim()
            .trim_start_matches("https://")
            .trim_end_matches('/');
        Ok(Self {
            audience: audience.to_string(),
            issuer: format!("https://{domain}/"),
            jwks_url: format!("https://{domain}/.well-known/jwks.json"),
            http: Client::builder().timeout(JWKS_TIMEOUT).build()?,
            keys: RwLock::new(None),
        })
    }

    /// Both settings must be present for auth to be considered configured.
    pub fn from_settings(
        domain: Option<&str>,
        audience: Option<&str>,
    ) -> Result<Option<Self>, reqwest::Error> {
        match (domain, audience) {
            (Some(domain), Some(audience)) => Self::new(domain, audience).map(Some),
            _ => Ok(None),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Fetches signing keys from `url` instead of the tenant's well-known endpoint.
    #[cfg(test)]
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| {
            debug!("Undecodable token header: {e}");
            AuthError::Invalid
        })?;
        let kid = header.kid.ok_or(AuthError::Invalid)?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = LEEWAY_SECS;

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| classify(&e))
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        // Unknown kid: the tenant may have rotated keys.
        let fresh = self.fetch_jwks().await?;
        let key = fresh.find(kid).map(DecodingKey::from_jwk).transpose();
        *self.keys.write().await = Some(fresh);

        key.map_err(|e| {
            warn!("Unusable JWK '{kid}': {e}");
            AuthError::Invalid
        })?
        .ok_or(AuthError::Invalid)
    }

    async fn cached_key(&self, kid: &str) -> Result<Option<DecodingKey>, AuthError> {
        let guard = self.keys.read().await;
        match guard.as_ref().and_then(|set| set.find(kid)) {
            Some(jwk) => DecodingKey::from_jwk(jwk).map(Some).map_err(|e| {
                warn!("Unusable JWK '{kid}': {e}");
                AuthError::Invalid
            }),
            None => Ok(None),
        }
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let fetch = async {
            self.http
                .get(&self.jwks_url)
                .send()
                .await?
                .error_for_status()?
                .json::<JwkSet>()
                .await
        };
        fetch.await.map_err(|e| {
            warn!("JWKS fetch from {} failed: {e}", self.jwks_url);
            AuthError::Invalid
        })
    }
}

/// Maps token validation failures onto the messages clients see.
fn classify(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        other => {
            debug!("Token rejected: {other:?}");
            AuthError::Invalid
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware guarding every route except health.
///
/// Without auth settings the protected routes answer 500 instead of letting
/// requests through.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let verifier = state
        .auth
        .as_deref()
        .ok_or_else(|| AppError::Configuration("Auth not configured".to_string()))?;

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AuthError::MissingToken)?;

    let claims = verifier.verify(token).await?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{middleware, Extension, Router};
    use http_body_util::BodyExt;
    use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{serve, test_state, TestEnv};

    const DOMAIN: &str = "tenant.test";
    const AUDIENCE: &str = "vitae";
    const KID: &str = "test-key";
    const PRIVATE_KEY: &str = include_str!("../../testdata/jwt_rs256.pem");
    const JWKS: &str = include_str!("../../testdata/jwks.json");

    /// Serves the fixture key set and counts how often it is fetched.
    async fn serve_jwks() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/.well-known/jwks.json",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ([(header::CONTENT_TYPE, "application/json")], JWKS)
                }
            }),
        );
        let addr = serve(app).await;
        (format!("http://{addr}/.well-known/jwks.json"), hits)
    }

    fn verifier(jwks_url: &str) -> AuthVerifier {
        AuthVerifier::new(DOMAIN, AUDIENCE)
            .unwrap()
            .with_jwks_url(jwks_url)
    }

    /// Claims expiring `expires_in` seconds from now (negative: already expired).
    fn claims(expires_in: i64) -> serde_json::Value {
        let now = get_current_timestamp() as i64;
        json!({
            "sub": "auth0|jane",
            "aud": AUDIENCE,
            "iss": format!("https://{DOMAIN}/"),
            "exp": now + expires_in,
            "scope": "read:cv",
        })
    }

    fn sign(kid: &str, claims: &serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_yields_claims() {
        let (url, hits) = serve_jwks().await;
        let claims = verifier(&url).verify(&sign(KID, &claims(600))).await.unwrap();

        assert_eq!(claims.sub.as_deref(), Some("auth0|jane"));
        assert_eq!(claims.scope.as_deref(), Some("read:cv"));
        assert_eq!(claims.extra["aud"], AUDIENCE);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiry_within_leeway_is_accepted() {
        let (url, _) = serve_jwks().await;
        assert!(verifier(&url).verify(&sign(KID, &claims(-3))).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (url, _) = serve_jwks().await;
        let err = verifier(&url)
            .verify(&sign(KID, &claims(-120)))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Expired);
    }

    #[tokio::test]
    async fn test_wrong_audience_is_rejected() {
        let (url, _) = serve_jwks().await;
        let mut claims = claims(600);
        claims["aud"] = json!("someone-else");

        let err = verifier(&url).verify(&sign(KID, &claims)).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidAudience);
    }

    #[tokio::test]
    async fn test_wrong_issuer_is_rejected() {
        let (url, _) = serve_jwks().await;
        let mut claims = claims(600);
        claims["iss"] = json!("https://other.tenant/");

        let err = verifier(&url).verify(&sign(KID, &claims)).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidIssuer);
    }

    #[tokio::test]
    async fn test_tampered_token_is_rejected() {
        let (url, _) = serve_jwks().await;
        let token = sign(KID, &claims(600));
        let (head, signature) = token.rsplit_once('.').unwrap();
        let forged = format!("{head}.{}", signature.chars().rev().collect::<String>());

        let err = verifier(&url).verify(&forged).await.unwrap_err();
        assert_eq!(err, AuthError::Invalid);
    }

    #[tokio::test]
    async fn test_keys_are_cached_and_unknown_kid_refreshes_once() {
        let (url, hits) = serve_jwks().await;
        let verifier = verifier(&url);
        let valid = sign(KID, &claims(600));

        verifier.verify(&valid).await.unwrap();
        verifier.verify(&valid).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let rotated = sign("rotated-key", &claims(600));
        assert_eq!(verifier.verify(&rotated).await.unwrap_err(), AuthError::Invalid);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        verifier.verify(&valid).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreachable_jwks_is_invalid() {
        let err = verifier("http://127.0.0.1:9/.well-known/jwks.json")
            .verify(&sign(KID, &claims(600)))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Invalid);
    }

    async fn call_whoami(verifier: AuthVerifier, token: &str) -> (StatusCode, String) {
        let env = TestEnv::new();
        let mut state = test_state(&env, None);
        state.auth = Some(Arc::new(verifier));

        let app = Router::new()
            .route(
                "/whoami",
                get(|Extension(claims): Extension<Claims>| async move {
                    claims.sub.unwrap_or_default()
                }),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state);

        let request = HttpRequest::builder()
            .uri("/whoami")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_middleware_attaches_claims_to_request() {
        let (url, _) = serve_jwks().await;
        let (status, body) = call_whoami(verifier(&url), &sign(KID, &claims(600))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "auth0|jane");
    }

    #[tokio::test]
    async fn test_middleware_rejects_expired_token_with_detail() {
        let (url, _) = serve_jwks().await;
        let (status, body) = call_whoami(verifier(&url), &sign(KID, &claims(-120))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["detail"], "Token expired");
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn test_classify_known_failures() {
        let expired = jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature);
        assert_eq!(classify(&expired), AuthError::Expired);

        let audience = jsonwebtoken::errors::Error::from(ErrorKind::InvalidAudience);
        assert_eq!(classify(&audience), AuthError::InvalidAudience);

        let issuer = jsonwebtoken::errors::Error::from(ErrorKind::InvalidIssuer);
        assert_eq!(classify(&issuer), AuthError::InvalidIssuer);

        let signature = jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature);
        assert_eq!(classify(&signature), AuthError::Invalid);
    }

    #[test]
    fn test_settings_require_domain_and_audience() {
        assert!(AuthVerifier::from_settings(None, Some("aud")).unwrap().is_none());
        assert!(AuthVerifier::from_settings(Some("t.eu.auth0.com"), None)
            .unwrap()
            .is_none());

        let verifier = AuthVerifier::from_settings(Some("https://t.eu.auth0.com/"), Some("aud"))
            .unwrap()
            .unwrap();
        assert_eq!(verifier.issuer(), "https://t.eu.auth0.com/");
    }

    #[tokio::test]
    async fn test_malformed_token_is_rejected_without_fetching_keys() {
        let verifier = AuthVerifier::new("tenant.invalid", "aud").unwrap();
        assert_eq!(verifier.verify("not-a-jwt").await.unwrap_err(), AuthError::Invalid);
    }

    #[test]
    fn test_auth_errors_become_401() {
        let err: AppError = AuthError::Expired.into();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Token expired");
    }
}

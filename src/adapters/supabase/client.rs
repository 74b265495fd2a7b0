//! Shared HTTP client for the hosted backend.
//!
//! Table and auth adapters share one [`SupabaseClient`] so that table
//! requests carry the signed-in user's access token (row-level security
//! filters rows by it) and fall back to the anonymous key otherwise.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::ports::RemoteError;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,

    /// Public anonymous API key.
    pub anon_key: SecretString,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Tokens expiring within this margin are refreshed.
    pub refresh_margin: Duration,

    /// How often the auto-refresh task checks token expiry.
    pub refresh_tick: Duration,
}

impl SupabaseConfig {
    /// Create a configuration with default timings.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: SecretString::new(anon_key.into()),
            timeout: Duration::from_secs(30),
            refresh_margin: Duration::from_secs(60),
            refresh_tick: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_refresh(mut self, margin: Duration, tick: Duration) -> Self {
        self.refresh_margin = margin;
        self.refresh_tick = tick;
        self
    }

    fn base(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// URL of a table endpoint.
    pub(super) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base(), table)
    }

    /// URL of an auth endpoint (`path` without leading slash).
    pub(super) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base(), path)
    }
}

/// Tokens of the signed-in user.
#[derive(Debug, Clone)]
pub(super) struct TokenSet {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: Timestamp,
    pub user: AuthenticatedUser,
}

impl TokenSet {
    /// True if the access token expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        let deadline = Timestamp::now().plus_secs(margin.as_secs());
        !deadline.is_before(&self.expires_at)
    }
}

/// HTTP client plus the current token set.
#[derive(Clone)]
pub struct SupabaseClient {
    config: Arc<SupabaseConfig>,
    http: Client,
    tokens: Arc<RwLock<Option<TokenSet>>>,
}

impl SupabaseClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the HTTP client cannot be built
    /// (TLS backend initialisation failure).
    pub fn new(config: SupabaseConfig) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            http,
            tokens: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    pub(super) fn http(&self) -> &Client {
        &self.http
    }

    pub(super) async fn tokens(&self) -> Option<TokenSet> {
        self.tokens.read().await.clone()
    }

    pub(super) async fn set_tokens(&self, tokens: Option<TokenSet>) {
        *self.tokens.write().await = tokens;
    }

    /// Adds the API key and bearer token headers.
    ///
    /// Uses the user's access token when signed in, the anonymous key
    /// otherwise.
    pub(super) async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let anon_key = self.config.anon_key.expose_secret();
        let bearer = match self.tokens.read().await.as_ref() {
            Some(tokens) => tokens.access_token.expose_secret().clone(),
            None => anon_key.clone(),
        };

        request
            .header("apikey", anon_key.as_str())
            .header("Authorization", format!("Bearer {}", bearer))
    }

    /// Adds only the API key header (for endpoints called before sign-in).
    pub(super) fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", self.config.anon_key.expose_secret().as_str())
    }
}

/// Sends a request, mapping transport failures.
pub(super) async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
    request.send().await.map_err(|e| {
        if e.is_timeout() {
            RemoteError::unavailable("Request timed out")
        } else if e.is_connect() {
            RemoteError::unavailable(format!("Connection failed: {}", e))
        } else {
            RemoteError::unavailable(e.to_string())
        }
    })
}

/// Turns a non-success response into `RemoteError::Rejected`.
pub(super) async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::rejected(status.as_u16(), error_message(&body)))
}

/// Extracts a readable message from an error body.
///
/// The table API answers `{"message": ...}`; the auth API answers
/// `{"error_description": ...}` or `{"msg": ...}` depending on the endpoint.
pub(super) fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

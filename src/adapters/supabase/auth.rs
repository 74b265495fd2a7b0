//! Hosted email/password auth adapter.
//!
//! Implements the `AuthBackend` port against the hosted auth endpoints:
//!
//! 1. `token?grant_type=password` for sign-in
//! 2. `signup` for registration (metadata stored on the account)
//! 3. `token?grant_type=refresh_token` for renewal
//! 4. `logout` for sign-out
//!
//! When a `KeyValueStore` is attached the refresh token is persisted so a
//! later process can restore the session with `current_session`.
//!
//! Auto-refresh runs as a background tokio task that renews the access token
//! shortly before it expires. The host pauses it while the app is in the
//! background.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use super::client::{error_message, send, SupabaseClient, TokenSet};
use crate::domain::foundation::{AuthError, AuthenticatedUser, Timestamp, UserId};
use crate::ports::{
    AuthBackend, AuthChange, KeyValueStore, RemoteError, DISPLAY_NAME_METADATA_KEY,
};

/// Key under which the refresh token is persisted.
pub const REFRESH_TOKEN_KEY: &str = "classroom_tracker:refresh_token";

const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Map<String, Value>,
}

impl UserPayload {
    fn into_user(self) -> Result<AuthenticatedUser, AuthError> {
        let id = UserId::new(self.id).map_err(|e| AuthError::Rejected(e.to_string()))?;
        let display_name = self
            .user_metadata
            .get(DISPLAY_NAME_METADATA_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(AuthenticatedUser::new(
            id,
            self.email.unwrap_or_default(),
            display_name,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
    user: UserPayload,
}

impl SessionPayload {
    fn into_tokens(self) -> Result<TokenSet, AuthError> {
        Ok(TokenSet {
            access_token: SecretString::new(self.access_token),
            refresh_token: SecretString::new(self.refresh_token),
            expires_at: Timestamp::now().plus_secs(self.expires_in),
            user: self.user.into_user()?,
        })
    }
}

/// Token bookkeeping shared between the adapter and its refresh task.
#[derive(Clone)]
struct SessionKeeper {
    client: SupabaseClient,
    changes: broadcast::Sender<AuthChange>,
    session_store: Option<Arc<dyn KeyValueStore>>,
}

impl SessionKeeper {
    /// Posts to a token-issuing endpoint and parses the session.
    async fn request_session(&self, path: &str, body: Value) -> Result<SessionPayload, AuthError> {
        let url = self.client.config().auth_url(path);
        let request = self
            .client
            .with_api_key(self.client.http().post(&url).json(&body));

        let response = send(request).await.map_err(remote_to_auth)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &error_message(&body)));
        }

        response
            .json::<SessionPayload>()
            .await
            .map_err(|e| AuthError::Rejected(format!("Unexpected auth response: {}", e)))
    }

    /// Stores a fresh token set and persists its refresh token.
    async fn adopt(&self, tokens: TokenSet) -> AuthenticatedUser {
        let user = tokens.user.clone();
        if let Some(store) = &self.session_store {
            if let Err(e) = store
                .set(REFRESH_TOKEN_KEY, tokens.refresh_token.expose_secret())
                .await
            {
                tracing::warn!(error = %e, "Failed to persist refresh token");
            }
        }
        self.client.set_tokens(Some(tokens)).await;
        user
    }

    /// Drops local tokens and the persisted refresh token.
    async fn forget(&self) {
        self.client.set_tokens(None).await;
        if let Some(store) = &self.session_store {
            if let Err(e) = store.remove(REFRESH_TOKEN_KEY).await {
                tracing::warn!(error = %e, "Failed to remove persisted refresh token");
            }
        }
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthenticatedUser, AuthError> {
        let payload = self
            .request_session(
                "token?grant_type=refresh_token",
                json!({ "refresh_token": refresh_token.expose_secret() }),
            )
            .await?;
        let user = self.adopt(payload.into_tokens()?).await;
        let _ = self.changes.send(AuthChange::TokenRefreshed(user.clone()));
        Ok(user)
    }

    /// One auto-refresh check.
    async fn refresh_if_due(&self) {
        let Some(tokens) = self.client.tokens().await else {
            return;
        };
        if !tokens.expires_within(self.client.config().refresh_margin) {
            return;
        }

        match self.refresh(&tokens.refresh_token).await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "Access token refreshed");
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Token refresh failed, will retry");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh rejected, signing out");
                self.forget().await;
                let _ = self.changes.send(AuthChange::SignedOut);
            }
        }
    }

    async fn run_auto_refresh(self) {
        let mut interval = time::interval(self.client.config().refresh_tick);
        loop {
            interval.tick().await;
            self.refresh_if_due().await;
        }
    }
}

/// `AuthBackend` backed by the hosted auth endpoints.
pub struct SupabaseAuth {
    keeper: SessionKeeper,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl SupabaseAuth {
    /// Create an adapter that keeps the session in memory only.
    pub fn new(client: SupabaseClient) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            keeper: SessionKeeper {
                client,
                changes,
                session_store: None,
            },
            refresh_task: Mutex::new(None),
        }
    }

    /// Persist the refresh token in the given store.
    pub fn with_session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.keeper.session_store = Some(store);
        self
    }

    async fn persisted_refresh_token(&self) -> Option<SecretString> {
        let store = self.keeper.session_store.as_ref()?;
        match store.get(REFRESH_TOKEN_KEY).await {
            Ok(token) => token.map(SecretString::new),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted refresh token");
                None
            }
        }
    }
}

impl Drop for SupabaseAuth {
    fn drop(&mut self) {
        if let Some(task) = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

#[async_trait]
impl AuthBackend for SupabaseAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let payload = self
            .keeper
            .request_session(
                "token?grant_type=password",
                json!({ "email": email, "password": password }),
            )
            .await?;

        let user = self.keeper.adopt(payload.into_tokens()?).await;
        let _ = self.keeper.changes.send(AuthChange::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Map<String, Value>,
    ) -> Result<AuthenticatedUser, AuthError> {
        let url = self.keeper.client.config().auth_url("signup");
        let body = json!({ "email": email, "password": password, "data": metadata });
        let request = self
            .keeper
            .client
            .with_api_key(self.keeper.client.http().post(&url).json(&body));

        let response = send(request).await.map_err(remote_to_auth)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            if message.to_lowercase().contains("already") {
                return Err(AuthError::EmailAlreadyRegistered);
            }
            return Err(classify_failure(status.as_u16(), &message));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(format!("Unexpected auth response: {}", e)))?;

        // A session comes back unless email confirmation is required, in
        // which case the body is the bare user.
        if value.get("access_token").is_some() {
            let payload: SessionPayload = serde_json::from_value(value)
                .map_err(|e| AuthError::Rejected(format!("Unexpected auth response: {}", e)))?;
            let user = self.keeper.adopt(payload.into_tokens()?).await;
            let _ = self.keeper.changes.send(AuthChange::SignedIn(user.clone()));
            return Ok(user);
        }

        let payload: UserPayload = serde_json::from_value(value)
            .map_err(|e| AuthError::Rejected(format!("Unexpected auth response: {}", e)))?;
        payload.into_user()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let tokens = self.keeper.client.tokens().await;
        self.keeper.forget().await;
        let _ = self.keeper.changes.send(AuthChange::SignedOut);

        let Some(tokens) = tokens else {
            return Ok(());
        };

        let url = self.keeper.client.config().auth_url("logout");
        let request = self.keeper.client.with_api_key(
            self.keeper
                .client
                .http()
                .post(&url)
                .bearer_auth(tokens.access_token.expose_secret()),
        );
        let response = send(request).await.map_err(remote_to_auth)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &error_message(&body)));
        }
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthenticatedUser>, AuthError> {
        let margin = self.keeper.client.config().refresh_margin;
        let refresh_token = match self.keeper.client.tokens().await {
            Some(tokens) if !tokens.expires_within(margin) => return Ok(Some(tokens.user)),
            Some(tokens) => Some(tokens.refresh_token),
            None => self.persisted_refresh_token().await,
        };

        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };

        match self.keeper.refresh(&refresh_token).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "Stored session could not be refreshed");
                self.keeper.forget().await;
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.keeper.changes.subscribe()
    }

    fn start_auto_refresh(&self) {
        let mut task = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                *task = Some(runtime.spawn(self.keeper.clone().run_auto_refresh()));
                tracing::debug!("Token auto-refresh started");
            }
            Err(_) => {
                tracing::warn!("No tokio runtime available, token auto-refresh not started");
            }
        }
    }

    fn stop_auto_refresh(&self) {
        if let Some(handle) = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
            tracing::debug!("Token auto-refresh stopped");
        }
    }
}

fn remote_to_auth(error: RemoteError) -> AuthError {
    AuthError::service_unavailable(error.to_string())
}

/// Maps an auth endpoint failure status to a domain error.
fn classify_failure(status: u16, message: &str) -> AuthError {
    match status {
        400 | 401 if message.to_lowercase().contains("invalid") => AuthError::InvalidCredentials,
        400 | 401 | 403 => AuthError::Rejected(message.to_string()),
        429 | 500..=599 => AuthError::service_unavailable(message),
        _ => AuthError::Rejected(message.to_string()),
    }
}

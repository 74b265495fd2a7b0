//! Auth backend port - hosted email/password authentication.
//!
//! Besides request/response calls, the backend emits asynchronous
//! [`AuthChange`] notifications (sign-in elsewhere, token refresh, remote
//! sign-out). Subscribers receive them through a `tokio::sync::broadcast`
//! receiver and must drop it when torn down.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Account metadata key holding the display name given at sign-up.
pub const DISPLAY_NAME_METADATA_KEY: &str = "nome";

/// Session change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn(AuthenticatedUser),
    TokenRefreshed(AuthenticatedUser),
    SignedOut,
}

/// Email/password authentication of the hosted backend.
///
/// # Contract
///
/// - `sign_in_with_password` fails with `InvalidCredentials` for a wrong
///   email/password pair
/// - `sign_up` fails with `EmailAlreadyRegistered` for a taken email;
///   `metadata` is stored on the account
/// - `current_session` returns the user of a still-valid (possibly
///   persisted) session, or `None`
/// - auto-refresh only controls background token renewal; it never signs
///   anyone in or out by itself
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Map<String, Value>,
    ) -> Result<AuthenticatedUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn current_session(&self) -> Result<Option<AuthenticatedUser>, AuthError>;

    /// Subscribes to session change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    fn start_auto_refresh(&self);

    fn stop_auto_refresh(&self);
}

//! Authentication types for the domain layer.
//!
//! These types describe the identity returned by the hosted auth backend.
//! They carry no provider specifics; any adapter implementing the
//! `AuthBackend` port can populate them.

use super::UserId;
use thiserror::Error;

/// Identity confirmed by the auth backend.
///
/// This is the raw auth account. The teacher profile (display name) lives in
/// a separate table and is resolved by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique user identifier from the auth backend.
    pub id: UserId,

    /// Email the account was registered with.
    pub email: String,

    /// Display name stored in the account metadata at sign-up, if any.
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
        }
    }

    /// Returns the user's display name, or email as fallback.
    pub fn display_name_or_email(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Authentication errors reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Email/password pair was rejected.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Sign-up attempted with an email that already has an account.
    #[error("Email already registered")]
    EmailAlreadyRegistered,

    /// The stored session can no longer be refreshed.
    #[error("Session expired")]
    SessionExpired,

    /// No session is active for an operation that needs one.
    #[error("Not signed in")]
    NotSignedIn,

    /// The backend refused the request for another reason.
    #[error("Auth request rejected: {0}")]
    Rejected(String),

    /// The authentication service is unavailable (network, config, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_email() {
        let user = AuthenticatedUser::new(UserId::new("u-1").unwrap(), "ana@escola.br", None);
        assert_eq!(user.display_name_or_email(), "ana@escola.br");
    }

    #[test]
    fn only_service_unavailable_is_transient() {
        assert!(AuthError::service_unavailable("timeout").is_transient());
        assert!(!AuthError::InvalidCredentials.is_transient());
    }
}

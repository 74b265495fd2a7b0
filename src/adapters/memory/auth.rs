//! In-memory auth backend.
//!
//! Keeps email/password accounts in memory and emits the same change
//! notifications as the hosted service, which makes session flows testable
//! without a network.
//!
//! # Security Note
//!
//! Passwords are stored in plain text. This adapter is for **testing and
//! offline use** only and uses `.expect()` on lock operations.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::{AuthBackend, AuthChange, DISPLAY_NAME_METADATA_KEY};

/// Capacity of the change notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
struct Account {
    user: AuthenticatedUser,
    password: String,
}

/// In-memory email/password auth.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned.
pub struct InMemoryAuthBackend {
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<AuthenticatedUser>>,
    changes: broadcast::Sender<AuthChange>,
    auto_refresh: AtomicBool,
    force_error: RwLock<Option<AuthError>>,
}

impl InMemoryAuthBackend {
    /// Creates a backend with no accounts and no session.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            changes,
            auto_refresh: AtomicBool::new(false),
            force_error: RwLock::new(None),
        }
    }

    /// Registers an account with a fixed user id.
    pub fn with_account(
        self,
        user_id: UserId,
        email: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        let email = email.into();
        let user = AuthenticatedUser::new(user_id, email.clone(), Some(display_name.into()));
        self.accounts
            .write()
            .expect("InMemoryAuthBackend: accounts lock poisoned")
            .insert(
                email,
                Account {
                    user,
                    password: password.into(),
                },
            );
        self
    }

    /// Starts with a persisted session for an existing account.
    pub fn with_session(self, email: &str) -> Self {
        let user = self
            .accounts
            .read()
            .expect("InMemoryAuthBackend: accounts lock poisoned")
            .get(email)
            .map(|account| account.user.clone());
        *self
            .current
            .write()
            .expect("InMemoryAuthBackend: session lock poisoned") = user;
        self
    }

    /// Forces all requests to fail with the given error.
    pub fn with_error(self, error: AuthError) -> Self {
        self.set_error(Some(error));
        self
    }

    /// Sets or clears the forced error at runtime.
    pub fn set_error(&self, error: Option<AuthError>) {
        *self
            .force_error
            .write()
            .expect("InMemoryAuthBackend: error lock poisoned") = error;
    }

    // === Test Helpers ===

    /// Ends the session from the backend side, as an expired or revoked
    /// token would.
    pub fn revoke_session(&self) {
        self.current
            .write()
            .expect("InMemoryAuthBackend: session lock poisoned")
            .take();
        let _ = self.changes.send(AuthChange::SignedOut);
    }

    /// Emits a sign-in for an existing account, as a sign-in from another
    /// component sharing the same auth client would.
    pub fn sign_in_externally(&self, email: &str) -> bool {
        let user = self
            .accounts
            .read()
            .expect("InMemoryAuthBackend: accounts lock poisoned")
            .get(email)
            .map(|account| account.user.clone());

        match user {
            Some(user) => {
                self.set_current(Some(user.clone()));
                let _ = self.changes.send(AuthChange::SignedIn(user));
                true
            }
            None => false,
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.auto_refresh.load(Ordering::SeqCst)
    }

    pub fn account_count(&self) -> usize {
        self.accounts
            .read()
            .expect("InMemoryAuthBackend: accounts lock poisoned")
            .len()
    }

    fn check_error(&self) -> Result<(), AuthError> {
        match self
            .force_error
            .read()
            .expect("InMemoryAuthBackend: error lock poisoned")
            .clone()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn set_current(&self, user: Option<AuthenticatedUser>) {
        *self
            .current
            .write()
            .expect("InMemoryAuthBackend: session lock poisoned") = user;
    }
}

impl Default for InMemoryAuthBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthBackend for InMemoryAuthBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        self.check_error()?;

        let user = self
            .accounts
            .read()
            .expect("InMemoryAuthBackend: accounts lock poisoned")
            .get(email)
            .filter(|account| account.password == password)
            .map(|account| account.user.clone())
            .ok_or(AuthError::InvalidCredentials)?;

        self.set_current(Some(user.clone()));
        let _ = self.changes.send(AuthChange::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Map<String, Value>,
    ) -> Result<AuthenticatedUser, AuthError> {
        self.check_error()?;

        let user = {
            let mut accounts = self
                .accounts
                .write()
                .expect("InMemoryAuthBackend: accounts lock poisoned");

            if accounts.contains_key(email) {
                return Err(AuthError::EmailAlreadyRegistered);
            }

            let user_id = UserId::new(Uuid::new_v4().to_string())
                .map_err(|e| AuthError::Rejected(e.to_string()))?;
            let display_name = metadata
                .get(DISPLAY_NAME_METADATA_KEY)
                .and_then(Value::as_str)
                .map(str::to_string);
            let user = AuthenticatedUser::new(user_id, email, display_name);

            accounts.insert(
                email.to_string(),
                Account {
                    user: user.clone(),
                    password: password.to_string(),
                },
            );
            user
        };

        self.set_current(Some(user.clone()));
        let _ = self.changes.send(AuthChange::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.check_error()?;
        self.set_current(None);
        let _ = self.changes.send(AuthChange::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthenticatedUser>, AuthError> {
        self.check_error()?;
        Ok(self
            .current
            .read()
            .expect("InMemoryAuthBackend: session lock poisoned")
            .clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }

    fn start_auto_refresh(&self) {
        self.auto_refresh.store(true, Ordering::SeqCst);
    }

    fn stop_auto_refresh(&self) {
        self.auto_refresh.store(false, Ordering::SeqCst);
    }
}

//! SessionManager - current teacher identity.
//!
//! Owns the [`Session`] and publishes it through a `watch` channel. Every
//! operation resolves to a boolean or nothing; failures are logged here and
//! never propagated to callers.
//!
//! Two long-lived listeners keep the session in sync with the outside world:
//!
//! - [`SessionManager::spawn_auth_listener`] follows backend notifications
//!   (sign-in elsewhere, remote sign-out, token refresh)
//! - [`SessionManager::spawn_lifecycle_listener`] suspends background token
//!   refresh while the app is not in the foreground

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use super::listener::ListenerHandle;
use super::services::ProfileService;
use crate::domain::foundation::AuthenticatedUser;
use crate::domain::session::{LoginForm, RegistrationForm, Session};
use crate::ports::{AppLifecycle, AuthChange};

/// Owner of the current session.
pub struct SessionManager {
    profiles: ProfileService,
    session: watch::Sender<Option<Session>>,
    loading: AtomicBool,
}

impl SessionManager {
    /// Creates a manager with no session, loading until the first restore.
    pub fn new(profiles: ProfileService) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            profiles,
            session,
            loading: AtomicBool::new(true),
        }
    }

    /// Receiver that observes every session change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_some()
    }

    /// True until the first `restore_session` completes.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Recovers a persisted backend session, if any.
    ///
    /// Failures are treated as "no session".
    pub async fn restore_session(&self) {
        match self.profiles.current_session().await {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user_id(), "Session restored");
                self.set_session(Some(session));
            }
            Ok(None) => {
                tracing::debug!("No session to restore");
                self.set_session(None);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session restore failed");
                self.set_session(None);
            }
        }
        self.loading.store(false, Ordering::SeqCst);
    }

    /// Signs in. Returns false on invalid input, wrong credentials, missing
    /// profile or an unreachable backend.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.profiles.login(&LoginForm::new(email, password)).await {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id(), "Signed in");
                self.set_session(Some(session));
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                false
            }
        }
    }

    /// Creates an account and its profile, then signs in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> bool {
        let form = RegistrationForm::new(name, email, password, password);
        match self.profiles.register(&form).await {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id(), "Account registered");
                self.set_session(Some(session));
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Registration failed");
                false
            }
        }
    }

    /// Clears the session whatever the remote sign-out outcome.
    pub async fn logout(&self) {
        if let Err(e) = self.profiles.logout().await {
            tracing::warn!(error = %e, "Remote sign-out failed");
        }
        self.set_session(None);
    }

    /// Follows backend session notifications until released.
    pub fn spawn_auth_listener(self: &Arc<Self>) -> ListenerHandle {
        let manager = Arc::clone(self);
        let mut changes = self.profiles.auth().subscribe();

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => manager.apply_auth_change(change).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Auth notifications dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        ListenerHandle::new("auth", task)
    }

    /// Starts token auto-refresh in the foreground and stops it otherwise.
    pub fn spawn_lifecycle_listener(
        self: &Arc<Self>,
        mut lifecycle: watch::Receiver<AppLifecycle>,
    ) -> ListenerHandle {
        let manager = Arc::clone(self);

        let task = tokio::spawn(async move {
            let initial = *lifecycle.borrow_and_update();
            manager.apply_lifecycle(initial);
            while lifecycle.changed().await.is_ok() {
                let state = *lifecycle.borrow_and_update();
                manager.apply_lifecycle(state);
            }
        });

        ListenerHandle::new("lifecycle", task)
    }

    async fn apply_auth_change(&self, change: AuthChange) {
        match change {
            AuthChange::SignedIn(user) => {
                if self.is_current_user(&user) {
                    return;
                }
                // A failed lookup keeps the current session: during
                // registration the profile row lands after the notification.
                match self.profiles.session_for(&user).await {
                    Ok(session) => {
                        tracing::info!(user_id = %user.id, "Session changed by backend");
                        self.set_session(Some(session));
                    }
                    Err(e) => {
                        tracing::warn!(user_id = %user.id, error = %e, "Profile lookup failed");
                    }
                }
            }
            AuthChange::TokenRefreshed(user) => {
                tracing::debug!(user_id = %user.id, "Token refreshed");
            }
            AuthChange::SignedOut => {
                if self.is_authenticated() {
                    tracing::info!("Signed out by backend");
                }
                self.set_session(None);
            }
        }
    }

    fn apply_lifecycle(&self, state: AppLifecycle) {
        let auth = self.profiles.auth();
        if state.is_foreground() {
            auth.start_auto_refresh();
        } else {
            auth.stop_auto_refresh();
        }
        tracing::debug!(?state, "Auto-refresh updated for lifecycle");
    }

    fn is_current_user(&self, user: &AuthenticatedUser) -> bool {
        self.session
            .borrow()
            .as_ref()
            .map_or(false, |session| session.user_id() == &user.id)
    }

    /// Publishes the session, notifying only on an actual change.
    fn set_session(&self, next: Option<Session>) {
        self.session.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

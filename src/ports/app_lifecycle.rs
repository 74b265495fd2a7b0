//! Application lifecycle signal.
//!
//! The host platform reports foreground/background transitions through a
//! `tokio::sync::watch` channel of [`AppLifecycle`] values. The session
//! manager uses it to pause token refresh while the app is not visible.

use tokio::sync::watch;

/// Foreground state reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppLifecycle {
    #[default]
    Active,
    Inactive,
    Background,
}

impl AppLifecycle {
    pub fn is_foreground(self) -> bool {
        self == AppLifecycle::Active
    }
}

/// Creates a lifecycle channel starting in the foreground.
///
/// The host keeps the sender and reports transitions with `send`.
pub fn lifecycle_channel() -> (watch::Sender<AppLifecycle>, watch::Receiver<AppLifecycle>) {
    watch::channel(AppLifecycle::Active)
}

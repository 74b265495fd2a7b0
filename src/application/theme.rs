//! ThemeController - persisted light/dark preference.

use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::preferences::ThemePreference;
use crate::ports::KeyValueStore;

/// Storage key of the theme preference.
pub const THEME_KEY: &str = "classroom_tracker:theme";

/// Holds the active theme and writes every change to the store.
pub struct ThemeController {
    store: Arc<dyn KeyValueStore>,
    theme: watch::Sender<ThemePreference>,
}

impl ThemeController {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (theme, _) = watch::channel(ThemePreference::default());
        Self { store, theme }
    }

    pub fn current(&self) -> ThemePreference {
        *self.theme.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemePreference> {
        self.theme.subscribe()
    }

    /// Reads the stored preference, falling back to the system scheme.
    pub async fn load(&self, system_is_dark: bool) -> ThemePreference {
        let fallback = ThemePreference::from_system(system_is_dark);

        let theme = match self.store.get(THEME_KEY).await {
            Ok(Some(stored)) => stored.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring stored theme");
                fallback
            }),
            Ok(None) => fallback,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read theme preference");
                fallback
            }
        };

        self.theme.send_replace(theme);
        theme
    }

    /// Flips the theme, then persists it. Storage failures are logged only.
    pub async fn toggle(&self) -> ThemePreference {
        let next = self.current().toggled();
        self.theme.send_replace(next);

        if let Err(e) = self.store.set(THEME_KEY, next.as_str()).await {
            tracing::warn!(error = %e, theme = %next, "Failed to persist theme preference");
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryKeyValueStore;

    #[tokio::test]
    async fn load_defaults_to_system_scheme() {
        let controller = ThemeController::new(Arc::new(InMemoryKeyValueStore::new()));

        assert_eq!(controller.load(true).await, ThemePreference::Dark);
        assert_eq!(controller.load(false).await, ThemePreference::Light);
    }

    #[tokio::test]
    async fn stored_value_overrides_system_scheme() {
        let store = InMemoryKeyValueStore::new();
        store.set(THEME_KEY, "dark").await.unwrap();
        let controller = ThemeController::new(Arc::new(store));

        assert_eq!(controller.load(false).await, ThemePreference::Dark);
    }

    #[tokio::test]
    async fn toggle_persists_new_value() {
        let store = InMemoryKeyValueStore::new();
        let controller = ThemeController::new(Arc::new(store.clone()));
        controller.load(false).await;

        assert_eq!(controller.toggle().await, ThemePreference::Dark);
        assert_eq!(store.get(THEME_KEY).await.unwrap().as_deref(), Some("dark"));

        assert_eq!(controller.toggle().await, ThemePreference::Light);
        assert_eq!(store.get(THEME_KEY).await.unwrap().as_deref(), Some("light"));
    }

    #[tokio::test]
    async fn unknown_stored_value_falls_back() {
        let store = InMemoryKeyValueStore::new();
        store.set(THEME_KEY, "sepia").await.unwrap();
        let controller = ThemeController::new(Arc::new(store));

        assert_eq!(controller.load(true).await, ThemePreference::Dark);
    }
}

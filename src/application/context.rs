//! AppContext - explicit wiring of the managers and their listeners.
//!
//! Everything the presentation layer consumes is reachable from here. The
//! listeners live exactly as long as the context is started.

use std::sync::Arc;

use tokio::sync::watch;

use super::collection_manager::CollectionStateManager;
use super::listener::ListenerHandle;
use super::services::tables::IDENTITY_COLUMNS;
use super::services::{ActivityService, ClassService, ProfileService};
use super::session_manager::SessionManager;
use super::theme::ThemeController;
use crate::adapters::memory::{InMemoryAuthBackend, InMemoryTableStore};
use crate::adapters::storage::InMemoryKeyValueStore;
use crate::ports::{lifecycle_channel, AppLifecycle, AuthBackend, KeyValueStore, TableStore};

/// Application state with a start/stop lifetime.
pub struct AppContext {
    auth: Arc<dyn AuthBackend>,
    session: Arc<SessionManager>,
    collections: Arc<CollectionStateManager>,
    theme: ThemeController,
    lifecycle: watch::Sender<AppLifecycle>,
    listeners: Vec<ListenerHandle>,
}

impl AppContext {
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        tables: Arc<dyn TableStore>,
        preferences: Arc<dyn KeyValueStore>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(ProfileService::new(
            auth.clone(),
            tables.clone(),
        )));
        let collections = Arc::new(CollectionStateManager::new(
            ClassService::new(tables.clone()),
            ActivityService::new(tables),
            session.subscribe(),
        ));
        let (lifecycle, _) = lifecycle_channel();

        Self {
            auth,
            session,
            collections,
            theme: ThemeController::new(preferences),
            lifecycle,
            listeners: Vec::new(),
        }
    }

    /// Context backed entirely by in-process adapters.
    pub fn in_memory() -> Self {
        let tables = IDENTITY_COLUMNS
            .iter()
            .fold(InMemoryTableStore::new(), |store, (table, column)| {
                store.with_identity(*table, *column)
            });

        Self::new(
            Arc::new(InMemoryAuthBackend::new()),
            Arc::new(tables),
            Arc::new(InMemoryKeyValueStore::new()),
        )
    }

    /// Spawns the listeners, restores the session and loads the theme.
    ///
    /// Starting an already started context only reloads state.
    pub async fn start(&mut self, system_is_dark: bool) {
        if self.listeners.is_empty() {
            self.listeners.push(self.session.spawn_auth_listener());
            self.listeners.push(self.collections.spawn_session_sync());
            self.listeners
                .push(self.session.spawn_lifecycle_listener(self.lifecycle.subscribe()));
        }

        self.session.restore_session().await;
        let theme = self.theme.load(system_is_dark).await;
        tracing::info!(
            signed_in = self.session.is_authenticated(),
            %theme,
            "Application context started"
        );
    }

    /// Releases every listener and stops background token refresh.
    pub fn shutdown(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.release();
        }
        self.auth.stop_auto_refresh();
        tracing::info!("Application context stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn collections(&self) -> &Arc<CollectionStateManager> {
        &self.collections
    }

    pub fn theme(&self) -> &ThemeController {
        &self.theme
    }

    /// Reports a foreground/background transition from the host.
    pub fn set_lifecycle(&self, state: AppLifecycle) {
        self.lifecycle.send_replace(state);
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown();
        }
    }
}

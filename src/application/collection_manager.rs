//! CollectionStateManager - cached classes and activities of the session.
//!
//! The backend is authoritative. Local lists are replaced wholesale by a
//! fresh fetch after every successful mutation and never patched in place:
//!
//! ```text
//! Idle -> Pending (remote call) -> Reloading (refetch) -> Idle
//!                       \-> Idle on failure
//! ```
//!
//! The activity list holds the activities of the last loaded class only.
//! Edit and delete recover the owning class from that list, so an activity
//! that is not cached cannot be edited or deleted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use super::listener::ListenerHandle;
use super::services::{ActivityService, ClassService};
use crate::domain::classroom::{
    ActivityEntity, ClassDeletion, ClassEntity, CLASS_DELETE_FAILED, CLASS_HAS_ACTIVITIES,
    NO_ACTIVE_SESSION,
};
use crate::domain::foundation::{ActivityId, ClassId, UserId};
use crate::domain::session::Session;

/// Progress of the current mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// Remote mutation in flight.
    Pending,
    /// Mutation succeeded, list refetch in flight.
    Reloading,
}

/// Returns the state to `Idle` when the mutation ends, on every path.
struct MutationGuard<'a> {
    state: &'a watch::Sender<SyncState>,
}

impl<'a> MutationGuard<'a> {
    fn begin(state: &'a watch::Sender<SyncState>) -> Self {
        state.send_replace(SyncState::Pending);
        Self { state }
    }

    fn reloading(&self) {
        self.state.send_replace(SyncState::Reloading);
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.state.send_replace(SyncState::Idle);
    }
}

/// Session-scoped cache of classes and activities.
pub struct CollectionStateManager {
    classes_service: ClassService,
    activities_service: ActivityService,
    session: watch::Receiver<Option<Session>>,
    classes: RwLock<Vec<ClassEntity>>,
    activities: RwLock<Vec<ActivityEntity>>,
    loads_in_flight: AtomicUsize,
    class_loads: watch::Sender<u64>,
    sync_state: watch::Sender<SyncState>,
}

impl CollectionStateManager {
    pub fn new(
        classes_service: ClassService,
        activities_service: ActivityService,
        session: watch::Receiver<Option<Session>>,
    ) -> Self {
        let (sync_state, _) = watch::channel(SyncState::Idle);
        let (class_loads, _) = watch::channel(0);
        Self {
            classes_service,
            activities_service,
            session,
            classes: RwLock::new(Vec::new()),
            activities: RwLock::new(Vec::new()),
            loads_in_flight: AtomicUsize::new(0),
            class_loads,
            sync_state,
        }
    }

    // === Snapshots ===

    pub async fn classes(&self) -> Vec<ClassEntity> {
        self.classes.read().await.clone()
    }

    pub async fn activities(&self) -> Vec<ActivityEntity> {
        self.activities.read().await.clone()
    }

    /// True while a list load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loads_in_flight.load(Ordering::SeqCst) > 0
    }

    /// Receiver notified each time a fetched class list is stored.
    pub fn subscribe_class_loads(&self) -> watch::Receiver<u64> {
        self.class_loads.subscribe()
    }

    pub fn sync_state(&self) -> SyncState {
        *self.sync_state.borrow()
    }

    pub fn subscribe_sync_state(&self) -> watch::Receiver<SyncState> {
        self.sync_state.subscribe()
    }

    /// Local lookup only.
    pub async fn find_class(&self, class_id: ClassId) -> Option<ClassEntity> {
        self.classes
            .read()
            .await
            .iter()
            .find(|class| class.id == class_id)
            .cloned()
    }

    // === Classes ===

    /// Replaces the class list with the current teacher's classes.
    ///
    /// Without a session the list is cleared. A failed fetch also leaves an
    /// empty list. A fetch that completes after the session changed is
    /// dropped.
    pub async fn load_classes(&self) {
        let Some(owner) = self.owner() else {
            self.classes.write().await.clear();
            return;
        };

        self.loads_in_flight.fetch_add(1, Ordering::SeqCst);
        let classes = match self.classes_service.list_by_owner(&owner).await {
            Ok(classes) => {
                tracing::debug!(user_id = %owner, count = classes.len(), "Classes reloaded");
                classes
            }
            Err(e) => {
                tracing::error!(user_id = %owner, error = %e, "Failed to load classes");
                Vec::new()
            }
        };

        let mut cached = self.classes.write().await;
        if self.is_owner(&owner) {
            *cached = classes;
            self.class_loads.send_modify(|loads| *loads += 1);
        } else {
            tracing::debug!(user_id = %owner, "Discarding classes of a previous session");
        }
        drop(cached);
        self.loads_in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub async fn create_class(&self, name: &str) -> bool {
        let Some(owner) = self.owner() else {
            tracing::warn!("Create class without a session");
            return false;
        };

        let guard = MutationGuard::begin(&self.sync_state);
        match self.classes_service.create(name, &owner).await {
            Ok(class) => {
                tracing::info!(class_id = %class.id, "Class created");
                guard.reloading();
                self.load_classes().await;
                true
            }
            Err(e) => {
                tracing::error!(user_id = %owner, error = %e, "Failed to create class");
                false
            }
        }
    }

    /// Deletes a class that has no activities.
    pub async fn delete_class(&self, class_id: ClassId) -> ClassDeletion {
        if self.owner().is_none() {
            return ClassDeletion::rejected(NO_ACTIVE_SESSION);
        }

        let guard = MutationGuard::begin(&self.sync_state);
        match self.activities_service.has_activities(class_id).await {
            Ok(false) => {}
            Ok(true) => {
                tracing::info!(
                    class_id = %class_id,
                    "Class deletion refused, activities attached"
                );
                return ClassDeletion::rejected(CLASS_HAS_ACTIVITIES);
            }
            Err(e) => {
                tracing::error!(
                    class_id = %class_id,
                    error = %e,
                    "Failed to check class activities"
                );
                return ClassDeletion::rejected(CLASS_DELETE_FAILED);
            }
        }

        if let Err(e) = self.classes_service.delete(class_id).await {
            tracing::error!(class_id = %class_id, error = %e, "Failed to delete class");
            return ClassDeletion::rejected(CLASS_DELETE_FAILED);
        }

        tracing::info!(class_id = %class_id, "Class deleted");
        guard.reloading();
        self.load_classes().await;
        ClassDeletion::deleted()
    }

    // === Activities ===

    /// Replaces the activity list with the activities of `class_id`.
    ///
    /// Activities of any previously loaded class are discarded.
    pub async fn load_activities(&self, class_id: ClassId) {
        let Some(owner) = self.owner() else {
            self.activities.write().await.clear();
            return;
        };

        self.loads_in_flight.fetch_add(1, Ordering::SeqCst);
        let activities = match self.activities_service.list_by_class(class_id).await {
            Ok(activities) => {
                tracing::debug!(
                    class_id = %class_id,
                    count = activities.len(),
                    "Activities reloaded"
                );
                activities
            }
            Err(e) => {
                tracing::error!(class_id = %class_id, error = %e, "Failed to load activities");
                Vec::new()
            }
        };

        let mut cached = self.activities.write().await;
        if self.is_owner(&owner) {
            *cached = activities;
        } else {
            tracing::debug!(class_id = %class_id, "Discarding activities of a previous session");
        }
        drop(cached);
        self.loads_in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub async fn create_activity(&self, class_id: ClassId, description: &str) -> bool {
        if self.owner().is_none() {
            tracing::warn!(class_id = %class_id, "Create activity without a session");
            return false;
        }

        let guard = MutationGuard::begin(&self.sync_state);
        match self.activities_service.create(class_id, description).await {
            Ok(activity) => {
                tracing::info!(
                    class_id = %class_id,
                    activity_id = %activity.id,
                    "Activity created"
                );
                guard.reloading();
                self.load_activities(class_id).await;
                true
            }
            Err(e) => {
                tracing::error!(class_id = %class_id, error = %e, "Failed to create activity");
                false
            }
        }
    }

    /// Updates the description of a cached activity.
    pub async fn edit_activity(&self, activity_id: ActivityId, description: &str) -> bool {
        let Some(class_id) = self.cached_class_of(activity_id).await else {
            return false;
        };

        let guard = MutationGuard::begin(&self.sync_state);
        match self.activities_service.update(activity_id, description).await {
            Ok(()) => {
                tracing::info!(activity_id = %activity_id, "Activity updated");
                guard.reloading();
                self.load_activities(class_id).await;
                true
            }
            Err(e) => {
                tracing::error!(
                    activity_id = %activity_id,
                    error = %e,
                    "Failed to update activity"
                );
                false
            }
        }
    }

    /// Deletes a cached activity.
    pub async fn delete_activity(&self, activity_id: ActivityId) -> bool {
        let Some(class_id) = self.cached_class_of(activity_id).await else {
            return false;
        };

        let guard = MutationGuard::begin(&self.sync_state);
        match self.activities_service.delete(activity_id).await {
            Ok(()) => {
                tracing::info!(activity_id = %activity_id, "Activity deleted");
                guard.reloading();
                self.load_activities(class_id).await;
                true
            }
            Err(e) => {
                tracing::error!(
                    activity_id = %activity_id,
                    error = %e,
                    "Failed to delete activity"
                );
                false
            }
        }
    }

    // === Session binding ===

    /// Loads classes whenever a session appears and clears both lists when
    /// it ends.
    pub fn spawn_session_sync(self: &Arc<Self>) -> ListenerHandle {
        let manager = Arc::clone(self);
        let mut session = self.session.clone();

        let task = tokio::spawn(async move {
            loop {
                let signed_in = session.borrow_and_update().is_some();
                if signed_in {
                    manager.load_classes().await;
                } else {
                    manager.clear().await;
                }
                if session.changed().await.is_err() {
                    break;
                }
            }
        });

        ListenerHandle::new("session-sync", task)
    }

    async fn clear(&self) {
        self.classes.write().await.clear();
        self.activities.write().await.clear();
    }

    fn owner(&self) -> Option<UserId> {
        self.session
            .borrow()
            .as_ref()
            .map(|session| session.user_id().clone())
    }

    /// True while `owner` is still the signed-in user.
    fn is_owner(&self, owner: &UserId) -> bool {
        self.session
            .borrow()
            .as_ref()
            .map_or(false, |session| session.user_id() == owner)
    }

    /// Owning class of a cached activity, if a session is active.
    async fn cached_class_of(&self, activity_id: ActivityId) -> Option<ClassId> {
        if self.owner().is_none() {
            tracing::warn!(activity_id = %activity_id, "Activity change without a session");
            return None;
        }

        let class_id = self
            .activities
            .read()
            .await
            .iter()
            .find(|activity| activity.id == activity_id)
            .map(|activity| activity.class_id);

        if class_id.is_none() {
            tracing::warn!(activity_id = %activity_id, "Activity not in local cache");
        }
        class_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryTableStore;
    use crate::application::services::tables::{ACTIVITIES, ACTIVITY_ID, CLASSES, CLASS_ID};
    use crate::ports::{RemoteError, TableStore};
    use std::time::Duration;

    struct Fixture {
        store: Arc<InMemoryTableStore>,
        session: watch::Sender<Option<Session>>,
        manager: CollectionStateManager,
    }

    fn session(user_id: &str) -> Session {
        Session::new(UserId::new(user_id).unwrap(), "Ana", "ana@escola.br")
    }

    fn fixture() -> Fixture {
        fixture_with_read_latency(Duration::ZERO)
    }

    fn fixture_with_read_latency(latency: Duration) -> Fixture {
        let store = Arc::new(
            InMemoryTableStore::new()
                .with_identity(CLASSES, CLASS_ID)
                .with_identity(ACTIVITIES, ACTIVITY_ID)
                .with_latency(latency, Duration::ZERO),
        );
        let (session_tx, session_rx) = watch::channel(Some(session("t-1")));
        let tables: Arc<dyn TableStore> = store.clone();
        let manager = CollectionStateManager::new(
            ClassService::new(tables.clone()),
            ActivityService::new(tables),
            session_rx,
        );
        Fixture {
            store,
            session: session_tx,
            manager,
        }
    }

    #[tokio::test]
    async fn create_class_reloads_numbered_list() {
        let f = fixture();

        assert!(f.manager.create_class("Math101").await);
        assert!(f.manager.create_class("Physics").await);

        let classes = f.manager.classes().await;
        let numbered: Vec<_> = classes
            .iter()
            .map(|c| (c.name.as_str(), c.sequence_number))
            .collect();
        assert_eq!(numbered, vec![("Math101", 1), ("Physics", 2)]);
        assert_eq!(f.manager.sync_state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn create_class_failure_leaves_list_untouched() {
        let f = fixture();
        assert!(f.manager.create_class("Math101").await);

        f.store.set_error(Some(RemoteError::unavailable("offline")));
        assert!(!f.manager.create_class("Physics").await);

        assert_eq!(f.manager.classes().await.len(), 1);
        assert_eq!(f.manager.sync_state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn delete_class_refused_while_activities_exist() {
        let f = fixture();
        f.manager.create_class("Math101").await;
        let class_id = f.manager.classes().await[0].id;
        f.manager.create_activity(class_id, "HW1").await;

        let outcome = f.manager.delete_class(class_id).await;

        assert_eq!(outcome, ClassDeletion::rejected(CLASS_HAS_ACTIVITIES));
        assert!(f.manager.find_class(class_id).await.is_some());
    }

    #[tokio::test]
    async fn delete_class_without_activities_succeeds() {
        let f = fixture();
        f.manager.create_class("Math101").await;
        let class_id = f.manager.classes().await[0].id;

        let outcome = f.manager.delete_class(class_id).await;

        assert!(outcome.is_success());
        assert!(f.manager.classes().await.is_empty());
    }

    #[tokio::test]
    async fn failed_activity_check_rejects_deletion() {
        let f = fixture();
        f.manager.create_class("Math101").await;
        let class_id = f.manager.classes().await[0].id;
        let mutations = f.store.mutation_count();

        f.store.set_error(Some(RemoteError::unavailable("offline")));
        let outcome = f.manager.delete_class(class_id).await;

        assert_eq!(outcome, ClassDeletion::rejected(CLASS_DELETE_FAILED));
        assert_eq!(f.store.mutation_count(), mutations);
    }

    #[tokio::test]
    async fn load_activities_replaces_rather_than_merges() {
        let f = fixture();
        f.manager.create_class("A").await;
        f.manager.create_class("B").await;
        let classes = f.manager.classes().await;
        let (a, b) = (classes[0].id, classes[1].id);
        f.manager.create_activity(a, "HW-A").await;
        f.manager.create_activity(b, "HW-B").await;

        f.manager.load_activities(a).await;
        f.manager.load_activities(b).await;

        let activities = f.manager.activities().await;
        assert_eq!(activities.len(), 1);
        assert!(activities.iter().all(|activity| activity.belongs_to(b)));
    }

    #[tokio::test]
    async fn edit_activity_cache_miss_skips_remote_call() {
        let f = fixture();
        let mutations = f.store.mutation_count();

        assert!(!f.manager.edit_activity(ActivityId::new(42), "Changed").await);
        assert!(!f.manager.delete_activity(ActivityId::new(42)).await);

        assert_eq!(f.store.mutation_count(), mutations);
    }

    #[tokio::test]
    async fn edit_activity_updates_and_reloads() {
        let f = fixture();
        f.manager.create_class("Math101").await;
        let class_id = f.manager.classes().await[0].id;
        f.manager.create_activity(class_id, "HW1").await;
        let activity_id = f.manager.activities().await[0].id;

        assert!(f.manager.edit_activity(activity_id, "HW1 (revised)").await);

        let activities = f.manager.activities().await;
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].description, "HW1 (revised)");
    }

    #[tokio::test]
    async fn load_failure_empties_list() {
        let f = fixture();
        f.manager.create_class("Math101").await;

        f.store.set_error(Some(RemoteError::rejected(500, "boom")));
        f.manager.load_classes().await;

        assert!(f.manager.classes().await.is_empty());
        assert!(!f.manager.is_loading());
    }

    #[tokio::test]
    async fn mutations_without_session_make_no_remote_call() {
        let f = fixture();
        f.session.send_replace(None);

        assert!(!f.manager.create_class("Math101").await);
        assert!(!f.manager.create_activity(ClassId::new(1), "HW1").await);
        assert_eq!(
            f.manager.delete_class(ClassId::new(1)).await,
            ClassDeletion::rejected(NO_ACTIVE_SESSION)
        );
        assert_eq!(f.store.mutation_count(), 0);
        assert_eq!(f.store.select_count(), 0);
    }

    #[tokio::test]
    async fn classes_are_scoped_to_session_owner() {
        let f = fixture();
        f.manager.create_class("Mine").await;

        f.session.send_replace(Some(session("t-2")));
        f.manager.load_classes().await;

        assert!(f.manager.classes().await.is_empty());
    }

    #[tokio::test]
    async fn session_sync_loads_and_clears() {
        let f = fixture();
        f.manager.create_class("Math101").await;
        f.session.send_replace(None);
        f.manager.load_classes().await;
        assert!(f.manager.classes().await.is_empty());

        let manager = Arc::new(f.manager);
        let _sync = manager.spawn_session_sync();

        f.session.send_replace(Some(session("t-1")));
        for _ in 0..100 {
            if !manager.classes().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(manager.classes().await.len(), 1);

        f.session.send_replace(None);
        for _ in 0..100 {
            if manager.classes().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(manager.classes().await.is_empty());
    }

    #[tokio::test]
    async fn class_load_finishing_after_logout_is_discarded() {
        let f = fixture_with_read_latency(Duration::from_millis(60));
        f.manager.create_class("Math101").await;
        let manager = Arc::new(f.manager);
        let _sync = manager.spawn_session_sync();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.classes().await.len(), 1);

        let in_flight = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.load_classes().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.session.send_replace(None);
        in_flight.await.unwrap();

        assert!(manager.classes().await.is_empty());
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn class_loads_notify_only_stored_lists() {
        let f = fixture_with_read_latency(Duration::from_millis(40));
        let mut loads = f.manager.subscribe_class_loads();
        let manager = Arc::new(f.manager);

        manager.load_classes().await;
        assert!(loads.has_changed().unwrap());
        let _ = loads.borrow_and_update();

        let in_flight = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.load_classes().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.session.send_replace(None);
        in_flight.await.unwrap();

        assert!(!loads.has_changed().unwrap());
    }

    #[tokio::test]
    async fn activity_load_finishing_after_session_switch_is_discarded() {
        let f = fixture_with_read_latency(Duration::from_millis(60));
        f.manager.create_class("Math101").await;
        let class_id = f.manager.classes().await[0].id;
        f.manager.create_activity(class_id, "HW1").await;
        f.manager.load_activities(ClassId::new(999)).await;
        assert!(f.manager.activities().await.is_empty());
        let manager = Arc::new(f.manager);

        let in_flight = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.load_activities(class_id).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.session.send_replace(Some(session("t-2")));
        in_flight.await.unwrap();

        assert!(manager.activities().await.is_empty());
    }
}

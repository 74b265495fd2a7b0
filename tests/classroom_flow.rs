//! Integration tests for the teacher workflow.
//!
//! These tests drive the public managers end to end against the in-memory
//! backend:
//! 1. Sign in / registration through the session manager
//! 2. Class and activity mutations followed by list reloads
//! 3. The class deletion guard and the activity cache lookup

use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use classroom_tracker::adapters::memory::{InMemoryAuthBackend, InMemoryTableStore};
use classroom_tracker::adapters::storage::InMemoryKeyValueStore;
use classroom_tracker::application::services::tables::{
    ACTIVITIES, ACTIVITY_ID, CLASSES, CLASS_ID, PROFESSORS,
};
use classroom_tracker::application::{AppContext, SyncState};
use classroom_tracker::domain::foundation::{ActivityId, UserId};
use classroom_tracker::ports::{AppLifecycle, RemoteError, TableStore};

// =============================================================================
// Test Infrastructure
// =============================================================================

const EMAIL: &str = "ana@escola.br";
const PASSWORD: &str = "secret1";

struct Harness {
    auth: Arc<InMemoryAuthBackend>,
    tables: Arc<InMemoryTableStore>,
    context: AppContext,
}

fn tables() -> InMemoryTableStore {
    InMemoryTableStore::new()
        .with_identity(CLASSES, CLASS_ID)
        .with_identity(ACTIVITIES, ACTIVITY_ID)
}

/// Started context with one registered teacher who is not signed in.
async fn harness() -> Harness {
    harness_with(tables()).await
}

/// Same as [`harness`], with every table call taking a remote round trip.
async fn slow_harness() -> Harness {
    harness_with(tables().with_latency(Duration::from_millis(60), Duration::from_millis(30))).await
}

async fn harness_with(tables: InMemoryTableStore) -> Harness {
    let auth = Arc::new(InMemoryAuthBackend::new().with_account(
        UserId::new("t-1").unwrap(),
        EMAIL,
        PASSWORD,
        "Ana",
    ));
    let tables = Arc::new(tables);
    tables
        .insert(
            PROFESSORS,
            json!({"id": "t-1", "nome": "Ana"}).as_object().cloned().unwrap(),
        )
        .await
        .unwrap();

    let mut context = AppContext::new(
        auth.clone(),
        tables.clone(),
        Arc::new(InMemoryKeyValueStore::new()),
    );
    context.start(false).await;

    Harness {
        auth,
        tables,
        context,
    }
}

/// Started context with the teacher signed in.
async fn signed_in() -> Harness {
    let h = harness().await;
    assert!(h.context.session().login(EMAIL, PASSWORD).await);
    h
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn bad_login_returns_false_and_leaves_session_unset() {
    let h = harness().await;

    assert!(!h.context.session().login("bad@x.com", "wrong").await);
    assert!(h.context.session().current().is_none());
}

#[tokio::test]
async fn logout_clears_cached_collections() {
    let h = signed_in().await;
    let collections = h.context.collections().clone();
    assert!(collections.create_class("Math101").await);

    h.context.session().logout().await;

    wait_until(|| {
        let collections = collections.clone();
        async move { collections.classes().await.is_empty() }
    })
    .await;
}

#[tokio::test]
async fn remote_sign_out_clears_session() {
    let h = signed_in().await;

    h.auth.revoke_session();

    let session = h.context.session().clone();
    wait_until(|| {
        let session = session.clone();
        async move { session.current().is_none() }
    })
    .await;
}

#[tokio::test]
async fn background_pauses_token_refresh() {
    let h = harness().await;
    let auth = h.auth.clone();
    wait_until(|| {
        let auth = auth.clone();
        async move { auth.is_auto_refreshing() }
    })
    .await;

    h.context.set_lifecycle(AppLifecycle::Background);

    let auth = h.auth.clone();
    wait_until(|| {
        let auth = auth.clone();
        async move { !auth.is_auto_refreshing() }
    })
    .await;
}

#[tokio::test]
async fn registration_then_class_listing() {
    let h = harness().await;

    assert!(h.context.session().register("Bia", "bia@escola.br", "secret2").await);
    assert!(h.context.collections().create_class("Art").await);

    let classes = h.context.collections().classes().await;
    assert_eq!(classes.len(), 1);
    assert_eq!(
        &classes[0].owner_id,
        h.context.session().current().unwrap().user_id()
    );
}

#[tokio::test]
async fn registration_survives_slow_profile_lookup() {
    let h = slow_harness().await;

    assert!(h.context.session().register("Bia", "bia@escola.br", "secret2").await);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let session = h.context.session().current();
    assert_eq!(session.map(|s| s.display_name().to_string()), Some("Bia".to_string()));
}

#[tokio::test]
async fn logout_during_slow_reload_leaves_no_classes() {
    let h = slow_harness().await;
    assert!(h.context.session().login(EMAIL, PASSWORD).await);
    let collections = h.context.collections().clone();
    assert!(collections.create_class("Math101").await);

    let reload = {
        let collections = collections.clone();
        tokio::spawn(async move { collections.load_classes().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.context.session().logout().await;
    reload.await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(collections.classes().await.is_empty());
}

// =============================================================================
// Classes and Activities
// =============================================================================

#[tokio::test]
async fn math101_scenario() {
    let h = signed_in().await;
    let collections = h.context.collections();

    assert!(collections.create_class("Math101").await);
    collections.load_classes().await;
    let classes = collections.classes().await;
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].name, "Math101");
    assert_eq!(classes[0].sequence_number, 1);
    let class_id = classes[0].id;

    assert!(collections.create_activity(class_id, "HW1").await);
    collections.load_activities(class_id).await;
    let activities = collections.activities().await;
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].sequence_number, 1);
    assert_eq!(activities[0].class_id, class_id);

    let refused = collections.delete_class(class_id).await;
    assert!(!refused.success);
    assert!(!refused.reason.unwrap_or_default().is_empty());

    assert!(collections.delete_activity(activities[0].id).await);
    let deleted = collections.delete_class(class_id).await;
    assert!(deleted.success);
    assert!(collections.find_class(class_id).await.is_none());
    assert_eq!(collections.sync_state(), SyncState::Idle);
}

#[tokio::test]
async fn reload_after_mutation_matches_fresh_fetch() {
    let h = signed_in().await;
    let collections = h.context.collections();
    collections.create_class("A").await;
    collections.create_class("B").await;
    let class_id = collections.classes().await[1].id;
    collections.create_activity(class_id, "one").await;
    collections.create_activity(class_id, "two").await;

    let after_mutation = (collections.classes().await, collections.activities().await);
    collections.load_classes().await;
    collections.load_activities(class_id).await;
    let fresh = (collections.classes().await, collections.activities().await);

    assert_eq!(after_mutation, fresh);
}

#[tokio::test]
async fn activities_of_another_class_replace_the_list() {
    let h = signed_in().await;
    let collections = h.context.collections();
    collections.create_class("A").await;
    collections.create_class("B").await;
    let classes = collections.classes().await;
    collections.create_activity(classes[0].id, "for A").await;
    collections.create_activity(classes[1].id, "for B").await;

    collections.load_activities(classes[0].id).await;
    collections.load_activities(classes[1].id).await;

    let activities = collections.activities().await;
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].class_id, classes[1].id);
}

#[tokio::test]
async fn edit_of_uncached_activity_makes_no_remote_call() {
    let h = signed_in().await;
    let collections = h.context.collections();
    collections.create_class("A").await;
    collections.create_class("B").await;
    let classes = collections.classes().await;
    collections.create_activity(classes[0].id, "for A").await;
    let uncached = collections.activities().await[0].id;
    collections.load_activities(classes[1].id).await;
    let mutations = h.tables.mutation_count();

    assert!(!collections.edit_activity(uncached, "changed").await);
    assert!(!collections.delete_activity(ActivityId::new(999)).await);

    assert_eq!(h.tables.mutation_count(), mutations);
}

#[tokio::test]
async fn remote_failure_collapses_to_false() {
    let h = signed_in().await;
    let collections = h.context.collections();
    collections.create_class("A").await;
    let class_id = collections.classes().await[0].id;
    collections.create_activity(class_id, "HW").await;
    let activity_id = collections.activities().await[0].id;

    h.tables.set_error(Some(RemoteError::unavailable("offline")));

    assert!(!collections.create_class("B").await);
    assert!(!collections.create_activity(class_id, "HW2").await);
    assert!(!collections.edit_activity(activity_id, "HW!").await);
    assert!(!collections.delete_activity(activity_id).await);
    assert!(!collections.delete_class(class_id).await.success);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn created_classes_are_all_listed(
        names in prop::collection::vec("[A-Za-z][A-Za-z0-9 ]{0,12}", 0..8)
    ) {
        // Single-threaded, like the tokio tests above: background reloads
        // only run when the test yields.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (listed, ordinals) = runtime.block_on(async {
            let h = signed_in().await;
            let collections = h.context.collections();
            for name in &names {
                assert!(collections.create_class(name).await);
            }
            collections.load_classes().await;
            let classes = collections.classes().await;
            let ordinals: Vec<u32> = classes.iter().map(|c| c.sequence_number).collect();
            (classes.len(), ordinals)
        });

        prop_assert_eq!(listed, names.len());
        prop_assert_eq!(ordinals, (1..=names.len() as u32).collect::<Vec<_>>());
    }
}

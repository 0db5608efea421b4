//! Contract: recorded resources that are no longer declared get pruned
//!
//! The state store is what distinguishes "never managed" from "managed and
//! then removed from the declaration"; only the latter is deleted remotely.

mod common;

use artcfg_core::engine::Action;
use artcfg_core::traits::{StateRecord, StateStore};
use artcfg_core::Reconciler;
use common::{backup_handlers, backup_spec, reconcile_config, shared_memory_store, MockHandlerState};

#[tokio::test]
async fn test_undeclared_recorded_resource_is_deleted() {
    let state = MockHandlerState::new();
    let (store, inspect) = shared_memory_store();

    // A backup applied in an earlier run, now dropped from the declaration
    let stale = StateRecord::new("backup", "stale", serde_json::json!({"cron_exp": "0 0 1 * * ?"}));
    inspect.set_record("backup:stale", &stale).await.unwrap();
    state
        .remote
        .lock()
        .unwrap()
        .insert("stale".to_string(), serde_json::json!({"cron_exp": "0 0 1 * * ?"}));

    let config = reconcile_config(vec![backup_spec("nightly")], false);
    let (reconciler, _events) =
        Reconciler::new(backup_handlers(state.clone()), store, config).unwrap();

    let plan = reconciler.plan().await.unwrap();
    assert_eq!(plan.count(Action::Delete), 1);
    assert_eq!(plan.count(Action::Create), 1);

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.created, 1);

    // Gone remotely and gone from state
    assert!(!state.remote.lock().unwrap().contains_key("stale"));
    assert!(inspect.get_record("backup:stale").await.unwrap().is_none());
    assert!(inspect.get_record("backup:nightly").await.unwrap().is_some());
}

#[tokio::test]
async fn test_unmanaged_remote_objects_are_left_alone() {
    let state = MockHandlerState::new();
    let (store, inspect) = shared_memory_store();

    // A backup that exists remotely but was never applied by us
    state
        .remote
        .lock()
        .unwrap()
        .insert("handmade".to_string(), serde_json::json!({"cron_exp": "0 0 6 * * ?"}));

    let config = reconcile_config(vec![backup_spec("nightly")], false);
    let (reconciler, _events) =
        Reconciler::new(backup_handlers(state.clone()), store, config).unwrap();

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.deleted, 0);

    assert!(state.remote.lock().unwrap().contains_key("handmade"));
    assert!(inspect.get_record("backup:handmade").await.unwrap().is_none());
}

//! Contract: out-of-band changes are detected and converged
//!
//! A resource deleted behind the reconciler's back is re-created; a modified
//! resource is updated. Both raise a drift event first.

mod common;

use artcfg_core::engine::Action;
use artcfg_core::{ReconcileEvent, Reconciler};
use common::{backup_handlers, backup_spec, reconcile_config, shared_memory_store, MockHandlerState};

fn drain(events: &mut tokio::sync::mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

#[tokio::test]
async fn test_vanished_resource_is_recreated() {
    let state = MockHandlerState::new();
    let (store, _inspect) = shared_memory_store();
    let config = reconcile_config(vec![backup_spec("nightly")], false);
    let (reconciler, mut events) =
        Reconciler::new(backup_handlers(state.clone()), store, config).unwrap();

    reconciler.apply().await.unwrap();
    drain(&mut events);

    // Someone deletes the backup directly on the instance
    state.remove_remote("nightly");

    let plan = reconciler.plan().await.unwrap();
    assert_eq!(plan.count(Action::Create), 1);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        ReconcileEvent::DriftDetected { address } if address == "backup:nightly"
    )));

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.created, 1);
    assert!(state.remote.lock().unwrap().contains_key("nightly"));
}

#[tokio::test]
async fn test_tampered_resource_is_updated() {
    let state = MockHandlerState::new();
    let (store, _inspect) = shared_memory_store();
    let config = reconcile_config(vec![backup_spec("nightly")], false);
    let (reconciler, mut events) =
        Reconciler::new(backup_handlers(state.clone()), store, config).unwrap();

    reconciler.apply().await.unwrap();
    drain(&mut events);

    // Someone changes the schedule directly on the instance
    state.tamper_remote("nightly", "cron_exp", serde_json::json!("0 0 5 * * ?"));

    let plan = reconciler.plan().await.unwrap();
    assert_eq!(plan.count(Action::Update), 1);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, ReconcileEvent::DriftDetected { .. })));

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.updated, 1);

    // Converged again: the next plan has nothing to do
    let plan = reconciler.plan().await.unwrap();
    assert!(!plan.has_changes());
}

#[tokio::test]
async fn test_server_computed_fields_are_not_drift() {
    let state = MockHandlerState::new();
    let (store, _inspect) = shared_memory_store();
    let config = reconcile_config(vec![backup_spec("nightly")], false);
    let (reconciler, _events) =
        Reconciler::new(backup_handlers(state.clone()), store, config).unwrap();

    reconciler.apply().await.unwrap();

    // The server decorates the object with a field we never declared
    state.tamper_remote("nightly", "precalculated", serde_json::json!(true));

    let plan = reconciler.plan().await.unwrap();
    assert!(!plan.has_changes(), "extra observed fields must not drift");
}

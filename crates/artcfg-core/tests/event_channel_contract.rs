//! Contract: the event channel never blocks the engine
//!
//! Events are delivered with try_send. When the channel is full the event
//! is dropped with a warning, so a slow or absent consumer cannot stall
//! plan or apply.

mod common;

use tokio::sync::mpsc::error::TryRecvError;

use artcfg_core::{ReconcileEvent, Reconciler};
use common::{
    backup_handlers, backup_spec, reconcile_config_with_capacity, shared_memory_store,
    MockHandlerState,
};

#[tokio::test]
async fn test_full_channel_drops_events_without_blocking_apply() {
    let state = MockHandlerState::new();
    let (store, _inspect) = shared_memory_store();
    let config = reconcile_config_with_capacity(
        vec![backup_spec("nightly"), backup_spec("weekly")],
        false,
        1,
    );
    let (reconciler, mut events) =
        Reconciler::new(backup_handlers(state.clone()), store, config).unwrap();

    // Nobody drains the receiver while apply runs; apply must still finish
    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.created, 2);
    assert_eq!(summary.failed, 0);

    // Only the first event fit; everything after it was dropped
    assert_eq!(
        events.try_recv().unwrap(),
        ReconcileEvent::Started { resource_count: 2 }
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_plan_completes_with_undrained_channel() {
    let state = MockHandlerState::new();
    let (store, _inspect) = shared_memory_store();
    let config =
        reconcile_config_with_capacity(vec![backup_spec("nightly")], false, 1);
    let (reconciler, _events) =
        Reconciler::new(backup_handlers(state.clone()), store, config).unwrap();

    // Repeated plans keep trying to emit into the already full channel
    let first = reconciler.plan().await.unwrap();
    let second = reconciler.plan().await.unwrap();
    assert_eq!(first.actions.len(), 1);
    assert_eq!(second.actions.len(), 1);
}

//! Store-hosted plan: commands, effects, and broadcast updates.
//!
//! Run with: `cargo test --test store_flow_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;
use tischplan::{
    AllocationRequest, ChannelBroadcaster, Config, LayoutPreset, PlanAction, PlanEnvironment,
    PlanReducer, PlanState, Selection, TableNumber, TransferRequest,
};
use tischplan_core::environment::Clock;
use tischplan_runtime::Store;
use tischplan_testing::test_clock;
use tokio::sync::broadcast::error::TryRecvError;
use tokio_test::assert_ok;

type PlanStore = Store<PlanState, PlanAction, PlanEnvironment, PlanReducer>;

fn setup() -> (PlanStore, Arc<ChannelBroadcaster>) {
    let config = Config::default();
    let broadcaster = Arc::new(ChannelBroadcaster::new(16));
    let env = PlanEnvironment::new(Arc::new(test_clock()), Arc::clone(&broadcaster) as _);
    let store = Store::with_broadcast_capacity(
        PlanState::new(config.build_plan().unwrap()),
        PlanReducer::new(),
        env,
        config.broadcast_capacity,
    );
    (store, broadcaster)
}

async fn send(store: &PlanStore, action: PlanAction) {
    let mut handle = store.send(action).await.unwrap();
    assert_ok!(handle.wait_with_timeout(Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_successful_command_publishes_snapshot() {
    let (store, broadcaster) = setup();
    let mut updates = broadcaster.subscribe();

    send(
        &store,
        PlanAction::Allocate {
            request: AllocationRequest::new("Huber", 6).preferring(TableNumber::new(4)),
        },
    )
    .await;

    let update = updates.recv().await.unwrap();
    assert_eq!(update.revision, 1);
    assert_eq!(update.reason, "Allocate");
    assert_eq!(update.snapshot.reservations_by_table["4"][0].cards, 6);
    assert_eq!(update.snapshot.last_booking_seq, 1);

    let (revision, published) = store.state(|s| (s.revision, s.published_revision)).await;
    assert_eq!((revision, published), (1, 1));
}

#[tokio::test]
async fn test_rejected_command_publishes_nothing() {
    let (store, broadcaster) = setup();
    let mut updates = broadcaster.subscribe();
    let mut actions = store.subscribe_actions();

    send(
        &store,
        PlanAction::Allocate {
            request: AllocationRequest::new("Huber", 0),
        },
    )
    .await;

    assert!(matches!(updates.try_recv(), Err(TryRecvError::Empty)));
    let error = store.state(|s| s.last_error.clone()).await;
    assert!(error.unwrap().contains("greater than zero"));

    let observed = actions.try_recv().unwrap();
    assert!(matches!(
        observed,
        PlanAction::ValidationFailed { ref error } if error.contains("greater than zero")
    ));
    assert!(matches!(actions.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(store.state(|s| s.revision).await, 0);
}

#[tokio::test]
async fn test_subscribers_see_rejections_of_each_command() {
    let (store, _broadcaster) = setup();
    let mut actions = store.subscribe_actions();

    send(
        &store,
        PlanAction::Allocate {
            request: AllocationRequest::new("", 2),
        },
    )
    .await;
    send(&store, PlanAction::RemoveTable { number: TableNumber::new(99) }).await;
    send(&store, PlanAction::AddNextTable).await;

    let mut seen = Vec::new();
    while let Ok(action) = actions.try_recv() {
        seen.push(action.name());
    }
    assert_eq!(seen, vec!["ValidationFailed", "ValidationFailed", "SnapshotPublished"]);
    assert!(store.state(|s| s.last_error.is_none()).await);
}

#[tokio::test]
async fn test_send_and_wait_for_publication() {
    let (store, _broadcaster) = setup();

    let published = store
        .send_and_wait_for(
            PlanAction::AddNextTable,
            |action| matches!(action, PlanAction::SnapshotPublished { .. }),
            Duration::from_secs(2),
        )
        .await
        .unwrap();

    assert!(matches!(published, PlanAction::SnapshotPublished { revision: 1 }));
    let added = store.state(|s| s.plan.ledger().contains(TableNumber::new(18))).await;
    assert!(added);
}

#[tokio::test]
async fn test_preview_then_commit_through_store() {
    let (store, broadcaster) = setup();
    let mut updates = broadcaster.subscribe();

    send(
        &store,
        PlanAction::Allocate {
            request: AllocationRequest::new("Huber", 10).preferring(TableNumber::new(1)),
        },
    )
    .await;
    let (booking, id) = store
        .state(|s| {
            let r = &s.plan.reservations().bucket(TableNumber::new(1))[0];
            (r.booking_id.clone(), r.id.clone())
        })
        .await;

    let request = TransferRequest::moving(
        TableNumber::new(1),
        TableNumber::new(2),
        vec![Selection::new(id, 4)],
    );
    let now = test_clock().now();
    let preview = store
        .state(|s| s.preview_transfer(&request, now))
        .await
        .unwrap();
    assert!(preview.is_committable());
    assert_eq!(store.state(|s| s.revision).await, 1);

    send(&store, PlanAction::CommitTransfer { request }).await;

    let info = store
        .state(|s| s.plan.split_info(&booking, TableNumber::new(1)))
        .await;
    assert_eq!(info.as_deref(), Some("Weitere Plätze: Tisch 2 (4)"));

    let revisions: Vec<u64> = [updates.recv().await, updates.recv().await]
        .into_iter()
        .map(|u| u.unwrap().revision)
        .collect();
    assert_eq!(revisions, vec![1, 2]);
}

#[tokio::test]
async fn test_empty_layout_and_shutdown() {
    let config = Config {
        layout: LayoutPreset::Empty,
        ..Config::default()
    };
    let store: PlanStore = Store::new(
        PlanState::new(config.build_plan().unwrap()),
        PlanReducer::new(),
        PlanEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(ChannelBroadcaster::new(config.broadcast_capacity)),
        ),
    );

    send(&store, PlanAction::RemoveHighestTable).await;
    assert!(store.state(|s| s.last_error.is_some()).await);

    assert_ok!(store.shutdown(Duration::from_secs(1)).await);
    assert!(store.send(PlanAction::AddNextTable).await.is_err());
}

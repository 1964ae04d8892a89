//! Seating plan demo
//!
//! Walks through a short evening at the box office:
//! - Bookings with and without a preferred table
//! - Moving part of a booking to the standing area (split booking)
//! - Swapping two parties between tables
//! - Cart checkout
//!
//! # Usage
//!
//! ```bash
//! TISCHPLAN_SHORTFALL_POLICY=reject cargo run --bin demo
//! ```

use std::sync::Arc;
use std::time::Duration;
use tischplan::{
    AllocationRequest, ChannelBroadcaster, Config, PlanAction, PlanEnvironment, PlanReducer,
    PlanState, Selection, TableNumber, TransferRequest,
};
use tischplan_core::environment::SystemClock;
use tischplan_runtime::Store;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type PlanStore = Store<PlanState, PlanAction, PlanEnvironment, PlanReducer>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n============================================");
    println!("   Tischplan - Live Demo");
    println!("============================================\n");

    let broadcaster = Arc::new(ChannelBroadcaster::new(config.broadcast_capacity));
    let mut updates = broadcaster.subscribe();
    let store: PlanStore = Store::with_broadcast_capacity(
        PlanState::new(config.build_plan()?),
        PlanReducer::new(),
        PlanEnvironment::new(Arc::new(SystemClock), broadcaster),
        config.broadcast_capacity,
    );
    let mut actions = store.subscribe_actions();

    // Step 1: bookings
    println!("1. Booking three parties...");
    send(&store, PlanAction::Allocate {
        request: AllocationRequest::new("Familie Huber", 22).preferring(TableNumber::new(3)),
    })
    .await?;
    send(&store, PlanAction::Allocate {
        request: AllocationRequest::new("Gruber", 18),
    })
    .await?;
    send(&store, PlanAction::Allocate {
        request: AllocationRequest::new("Maier", 6).preferring(TableNumber::new(14)),
    })
    .await?;
    print_plan(&store).await;

    // Step 2: move two of the Huber cards to the standing area
    println!("\n2. Moving two Huber cards from table 3 to the standing area...");
    let huber = store
        .state(|s| s.plan.reservations().bucket(TableNumber::new(3)).first().cloned())
        .await;
    if let Some(huber) = huber {
        let request = TransferRequest::moving(
            TableNumber::new(3),
            TableNumber::STANDING,
            vec![Selection::new(huber.id.clone(), 2)],
        );
        let now = chrono::Utc::now();
        let preview = store.state(|s| s.preview_transfer(&request, now)).await?;
        println!(
            "   preview: table 3 {} -> {}, standing {} -> {}",
            preview.source_free_before,
            preview.source_free_after,
            preview.target_free_before,
            preview.target_free_after
        );
        if preview.is_committable() {
            send(&store, PlanAction::CommitTransfer { request }).await?;
        }
        let info = store
            .state(|s| s.plan.split_info(&huber.booking_id, TableNumber::new(3)))
            .await;
        println!("   Huber at table 3: {}", info.unwrap_or_default());
    }

    // Step 3: swap Maier (table 14) with part of Gruber
    println!("\n3. Swapping Maier with six Gruber cards...");
    let (maier, gruber) = store
        .state(|s| {
            let plan = &s.plan;
            let maier = plan.search("Maier").first().map(|(t, r)| (*t, r.id.clone()));
            let gruber = plan.search("Gruber").first().map(|(t, r)| (*t, r.id.clone()));
            (maier, gruber)
        })
        .await;
    if let (Some((maier_table, maier_id)), Some((gruber_table, gruber_id))) = (maier, gruber) {
        let request = TransferRequest::swapping(
            maier_table,
            gruber_table,
            vec![Selection::new(maier_id, 6)],
            vec![Selection::new(gruber_id, 6)],
        );
        send(&store, PlanAction::CommitTransfer { request }).await?;
    }
    print_plan(&store).await;

    // Step 4: cart checkout
    println!("\n4. Selling every Huber fragment...");
    let fragments = store
        .state(|s| {
            s.plan
                .search("Huber")
                .into_iter()
                .map(|(t, r)| (t, r.id.clone()))
                .collect::<Vec<_>>()
        })
        .await;
    for (table, reservation_id) in fragments {
        send(&store, PlanAction::AddToCart { table, reservation_id }).await?;
    }
    send(&store, PlanAction::CheckoutCart).await?;
    if let Some(summary) = store.state(|s| s.last_checkout).await {
        println!("   sold {} reservations, {} cards", summary.sold, summary.total_cards);
    }

    // Drain published updates
    let mut published = 0;
    while let Ok(update) = updates.try_recv() {
        published += 1;
        tracing::debug!(revision = update.revision, reason = %update.reason, "Update received");
    }
    println!("\n{published} plan updates published");

    let rejected = std::iter::from_fn(|| actions.try_recv().ok())
        .filter(|action| matches!(action, PlanAction::ValidationFailed { .. }))
        .count();
    println!("{rejected} commands rejected");

    store.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

async fn send(store: &PlanStore, action: PlanAction) -> anyhow::Result<()> {
    let name = action.name();
    let mut handle = store.send(action).await?;
    handle.wait_with_timeout(Duration::from_secs(5)).await?;
    if let Some(error) = store.state(|s| s.last_error.clone()).await {
        println!("   {name} rejected: {error}");
    }
    Ok(())
}

async fn print_plan(store: &PlanStore) {
    let lines = store
        .state(|s| {
            s.plan
                .ledger()
                .tables()
                .iter()
                .filter(|t| t.free_seats < t.capacity)
                .map(|t| {
                    let guests: Vec<String> = s
                        .plan
                        .reservations()
                        .bucket(t.number)
                        .iter()
                        .map(|r| format!("{} ({})", r.name, r.cards))
                        .collect();
                    format!(
                        "   {:<11} {:>2}/{:<2} free  {}",
                        t.number.label(),
                        t.free_seats,
                        t.capacity,
                        guests.join(", ")
                    )
                })
                .collect::<Vec<_>>()
        })
        .await;
    for line in lines {
        println!("{line}");
    }
}

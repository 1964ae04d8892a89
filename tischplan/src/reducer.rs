//! Seating plan reducer.
//!
//! Every mutating operation of [`SeatingPlan`] is a command of [`PlanAction`].
//! The reducer applies it to the plan held in [`PlanState`]; on success the
//! revision moves forward and a single effect publishes the new snapshot,
//! feeding back [`PlanAction::SnapshotPublished`]. A rejected command leaves
//! the plan untouched and feeds back [`PlanAction::ValidationFailed`], which
//! records the error in `last_error` and reaches every action subscriber.
//!
//! Transfer previews are queries and run directly against the state.

use crate::allocation::{Allocation, AllocationRequest, ShortfallPolicy};
use crate::broadcast::{PlanBroadcaster, PlanUpdate};
use crate::error::SeatingError;
use crate::plan::{CheckoutSummary, SeatingPlan};
use crate::snapshot::{PlanSnapshot, ReservationBuckets};
use crate::transfer::{TransferPreview, TransferRequest};
use crate::types::{AisleNeighbor, Position, Reservation, ReservationId, TableNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tischplan_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use tischplan_macros::Action;

// ============================================================================
// Actions
// ============================================================================

/// Actions for the seating plan
#[derive(Action, Clone, Debug, Serialize, Deserialize)]
pub enum PlanAction {
    // Commands
    /// Book cards for a customer
    #[command]
    Allocate {
        /// Name, cards and optional preferred table
        request: AllocationRequest,
    },

    /// Apply a move or swap between two tables
    #[command]
    CommitTransfer {
        /// Same request the preview was computed from
        request: TransferRequest,
    },

    /// Change the card count of a reservation
    #[command]
    EditCards {
        /// Table holding the reservation
        table: TableNumber,
        /// Reservation to edit
        reservation_id: ReservationId,
        /// New card count
        cards: u32,
    },

    /// Replace the notes of a reservation
    #[command]
    EditNotes {
        /// Table holding the reservation
        table: TableNumber,
        /// Reservation to edit
        reservation_id: ReservationId,
        /// New notes
        notes: String,
    },

    /// Delete a reservation and release its seats
    #[command]
    DeleteReservation {
        /// Table holding the reservation
        table: TableNumber,
        /// Reservation to delete
        reservation_id: ReservationId,
    },

    /// Put a reservation into the cart
    #[command]
    AddToCart {
        /// Table holding the reservation
        table: TableNumber,
        /// Reservation to add
        reservation_id: ReservationId,
    },

    /// Take a reservation out of the cart
    #[command]
    RemoveFromCart {
        /// Table holding the reservation
        table: TableNumber,
        /// Reservation to remove
        reservation_id: ReservationId,
    },

    /// Mark a single reservation sold
    #[command]
    MarkSold {
        /// Table holding the reservation
        table: TableNumber,
        /// Reservation to sell
        reservation_id: ReservationId,
    },

    /// Undo a sale
    #[command]
    RevertSold {
        /// Table holding the reservation
        table: TableNumber,
        /// Reservation to revert
        reservation_id: ReservationId,
    },

    /// Mark everything in the cart sold
    #[command]
    CheckoutCart,

    /// Add a table with the next free number
    #[command]
    AddNextTable,

    /// Add a table with explicit settings
    #[command]
    AddTable {
        /// Table number
        number: TableNumber,
        /// Seats
        capacity: u32,
        /// Row
        position: Position,
        /// Aisle side
        aisle_neighbor: Option<AisleNeighbor>,
    },

    /// Remove a table and its reservations
    #[command]
    RemoveTable {
        /// Table number
        number: TableNumber,
    },

    /// Remove the table with the highest number
    #[command]
    RemoveHighestTable,

    /// Change capacity, position and aisle of a table
    #[command]
    ReconfigureTable {
        /// Table number
        number: TableNumber,
        /// New seats
        capacity: u32,
        /// New row
        position: Position,
        /// New aisle side
        aisle_neighbor: Option<AisleNeighbor>,
    },

    /// Switch the shortfall policy
    #[command]
    SetShortfallPolicy {
        /// New policy
        policy: ShortfallPolicy,
    },

    /// Replace the whole plan
    #[command]
    LoadSnapshot {
        /// State to load
        snapshot: PlanSnapshot,
    },

    /// Replace all reservations, keeping the tables
    #[command]
    ImportReservations {
        /// Parsed reservation export
        buckets: ReservationBuckets,
    },

    // Events
    /// A snapshot was handed to the broadcaster
    #[event]
    SnapshotPublished {
        /// Revision of the published snapshot
        revision: u64,
    },

    /// A command was rejected
    #[event]
    ValidationFailed {
        /// Error message
        error: String,
    },
}

impl PlanAction {
    /// Variant name, used as the reason of published updates
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Allocate { .. } => "Allocate",
            Self::CommitTransfer { .. } => "CommitTransfer",
            Self::EditCards { .. } => "EditCards",
            Self::EditNotes { .. } => "EditNotes",
            Self::DeleteReservation { .. } => "DeleteReservation",
            Self::AddToCart { .. } => "AddToCart",
            Self::RemoveFromCart { .. } => "RemoveFromCart",
            Self::MarkSold { .. } => "MarkSold",
            Self::RevertSold { .. } => "RevertSold",
            Self::CheckoutCart => "CheckoutCart",
            Self::AddNextTable => "AddNextTable",
            Self::AddTable { .. } => "AddTable",
            Self::RemoveTable { .. } => "RemoveTable",
            Self::RemoveHighestTable => "RemoveHighestTable",
            Self::ReconfigureTable { .. } => "ReconfigureTable",
            Self::SetShortfallPolicy { .. } => "SetShortfallPolicy",
            Self::LoadSnapshot { .. } => "LoadSnapshot",
            Self::ImportReservations { .. } => "ImportReservations",
            Self::SnapshotPublished { .. } => "SnapshotPublished",
            Self::ValidationFailed { .. } => "ValidationFailed",
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Plan plus the outcome of the last command
#[derive(Clone, Debug, Default)]
pub struct PlanState {
    /// The seating plan
    pub plan: SeatingPlan,
    /// Incremented by every successful command
    pub revision: u64,
    /// Highest revision the broadcaster has received
    pub published_revision: u64,
    /// Error of the last rejected command; cleared on success
    pub last_error: Option<String>,
    /// Result of the last `Allocate`
    pub last_allocation: Option<Allocation>,
    /// Result of the last `CommitTransfer`
    pub last_transfer: Option<TransferPreview>,
    /// Result of the last `CheckoutCart`
    pub last_checkout: Option<CheckoutSummary>,
    /// Reservations dropped by the last table removal
    pub last_removed: Vec<Reservation>,
}

impl PlanState {
    /// Wrap a plan at revision zero
    #[must_use]
    pub fn new(plan: SeatingPlan) -> Self {
        Self {
            plan,
            ..Self::default()
        }
    }

    /// Simulate a transfer against the current plan
    ///
    /// # Errors
    ///
    /// See [`crate::transfer::preview`].
    pub fn preview_transfer(
        &self,
        request: &TransferRequest,
        now: DateTime<Utc>,
    ) -> Result<TransferPreview, SeatingError> {
        self.plan.preview_transfer(request, now)
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the plan reducer
#[derive(Clone)]
pub struct PlanEnvironment {
    /// Clock for reservation timestamps
    pub clock: Arc<dyn Clock>,
    /// Receiver of plan updates
    pub broadcaster: Arc<dyn PlanBroadcaster>,
}

impl PlanEnvironment {
    /// Creates a new `PlanEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, broadcaster: Arc<dyn PlanBroadcaster>) -> Self {
        Self { clock, broadcaster }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the seating plan
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanReducer;

impl PlanReducer {
    /// Creates a new `PlanReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Apply a command to the plan
    fn apply_command(
        state: &mut PlanState,
        action: PlanAction,
        now: DateTime<Utc>,
    ) -> Result<(), SeatingError> {
        let plan = &mut state.plan;
        match action {
            PlanAction::Allocate { request } => {
                state.last_allocation = Some(plan.allocate(&request, now)?);
            },
            PlanAction::CommitTransfer { request } => {
                state.last_transfer = Some(plan.commit_transfer(&request, now)?);
            },
            PlanAction::EditCards {
                table,
                reservation_id,
                cards,
            } => plan.edit_cards(table, &reservation_id, cards)?,
            PlanAction::EditNotes {
                table,
                reservation_id,
                notes,
            } => plan.edit_notes(table, &reservation_id, notes)?,
            PlanAction::DeleteReservation {
                table,
                reservation_id,
            } => {
                plan.delete_reservation(table, &reservation_id)?;
            },
            PlanAction::AddToCart {
                table,
                reservation_id,
            } => plan.add_to_cart(table, &reservation_id)?,
            PlanAction::RemoveFromCart {
                table,
                reservation_id,
            } => plan.remove_from_cart(table, &reservation_id)?,
            PlanAction::MarkSold {
                table,
                reservation_id,
            } => plan.mark_sold(table, &reservation_id)?,
            PlanAction::RevertSold {
                table,
                reservation_id,
            } => plan.revert_sold(table, &reservation_id)?,
            PlanAction::CheckoutCart => {
                state.last_checkout = Some(plan.checkout_cart());
            },
            PlanAction::AddNextTable => {
                plan.add_next_table()?;
            },
            PlanAction::AddTable {
                number,
                capacity,
                position,
                aisle_neighbor,
            } => plan.add_table(number, capacity, position, aisle_neighbor)?,
            PlanAction::RemoveTable { number } => {
                state.last_removed = plan.remove_table(number)?;
            },
            PlanAction::RemoveHighestTable => {
                state.last_removed = plan.remove_highest_table()?.1;
            },
            PlanAction::ReconfigureTable {
                number,
                capacity,
                position,
                aisle_neighbor,
            } => plan.reconfigure_table(number, capacity, position, aisle_neighbor)?,
            PlanAction::SetShortfallPolicy { policy } => plan.set_policy(policy),
            PlanAction::LoadSnapshot { snapshot } => {
                *plan = SeatingPlan::from_snapshot(snapshot, plan.policy(), now)?;
            },
            PlanAction::ImportReservations { buckets } => {
                plan.import_reservations(buckets, now)?;
            },
            PlanAction::SnapshotPublished { .. } | PlanAction::ValidationFailed { .. } => {},
        }
        Ok(())
    }

    /// Effect that reports a rejected command as [`PlanAction::ValidationFailed`]
    fn reject(error: &SeatingError) -> Effect<PlanAction> {
        let error = error.to_string();
        Effect::future(async move { Some(PlanAction::ValidationFailed { error }) })
    }

    /// Effect that hands the current snapshot to the broadcaster
    fn publish(state: &PlanState, reason: &str, env: &PlanEnvironment) -> Effect<PlanAction> {
        let revision = state.revision;
        let update = PlanUpdate {
            revision,
            reason: reason.to_string(),
            snapshot: state.plan.to_snapshot(),
        };
        let broadcaster = Arc::clone(&env.broadcaster);
        Effect::Future(Box::pin(async move {
            broadcaster.publish(update);
            Some(PlanAction::SnapshotPublished { revision })
        }))
    }
}

impl Reducer for PlanReducer {
    type State = PlanState;
    type Action = PlanAction;
    type Environment = PlanEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Events ==========
            PlanAction::SnapshotPublished { revision } => {
                state.published_revision = state.published_revision.max(revision);
                SmallVec::new()
            },
            PlanAction::ValidationFailed { error } => {
                state.last_error = Some(error);
                SmallVec::new()
            },

            // ========== Commands ==========
            command => {
                let reason = command.name();
                if let Err(error) = Self::apply_command(state, command, env.clock.now()) {
                    tracing::warn!(command = reason, %error, "Command rejected");
                    return smallvec![Self::reject(&error)];
                }

                state.last_error = None;
                state.revision += 1;
                tracing::debug!(command = reason, revision = state.revision, "Command applied");
                smallvec![Self::publish(state, reason, env)]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::broadcast::NoopBroadcaster;
    use crate::ledger::TableLedger;
    use crate::transfer::Selection;
    use crate::types::Table;
    use tischplan_testing::{assertions, test_clock, FixedClock, ReducerTest};

    fn create_test_env() -> PlanEnvironment {
        PlanEnvironment::new(Arc::new(FixedClock::new(test_clock().now())), Arc::new(NoopBroadcaster))
    }

    fn create_test_state() -> PlanState {
        let ledger = TableLedger::from_tables([
            Table::new(TableNumber::STANDING, 40, Position::Standing),
            Table::new(TableNumber::new(1), 10, Position::Left),
            Table::new(TableNumber::new(2), 10, Position::Right),
        ])
        .unwrap();
        PlanState::new(SeatingPlan::new(ledger, ShortfallPolicy::Reject))
    }

    #[test]
    fn test_allocate_bumps_revision_and_publishes() {
        ReducerTest::new(PlanReducer::new())
            .with_env(create_test_env())
            .given_state(create_test_state())
            .when_action(PlanAction::Allocate {
                request: AllocationRequest::new("Huber", 4),
            })
            .then_state(|state| {
                assert_eq!(state.revision, 1);
                assert!(state.last_error.is_none());
                let allocation = state.last_allocation.as_ref().unwrap();
                assert_eq!(allocation.booking_id.as_str(), "001");
                state.plan.verify_conservation().unwrap();
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_rejected_command_feeds_back_validation_failed() {
        ReducerTest::new(PlanReducer::new())
            .with_env(create_test_env())
            .given_state(create_test_state())
            .when_action(PlanAction::Allocate {
                request: AllocationRequest::new("   ", 4),
            })
            .then_state(|state| {
                assert_eq!(state.revision, 0);
                assert_eq!(state.plan.sequencer().last(), 0);
                assert!(state.plan.reservations().is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_rejection_effect_carries_the_error() {
        let reducer = PlanReducer::new();
        let env = create_test_env();
        let mut state = create_test_state();

        let mut effects = reducer.reduce(
            &mut state,
            PlanAction::Allocate {
                request: AllocationRequest::new("", 4),
            },
            &env,
        );
        let Some(Effect::Future(fut)) = effects.pop() else {
            panic!("expected a future effect");
        };
        let feedback = tokio_test::block_on(fut).unwrap();
        assert!(matches!(
            &feedback,
            PlanAction::ValidationFailed { error } if error == "Customer name must not be empty"
        ));

        let effects = reducer.reduce(&mut state, feedback, &env);
        assert!(effects.is_empty());
        assert_eq!(state.last_error.as_deref(), Some("Customer name must not be empty"));
    }

    #[test]
    fn test_success_clears_previous_error() {
        ReducerTest::new(PlanReducer::new())
            .with_env(create_test_env())
            .given_state(create_test_state())
            .when_action(PlanAction::ValidationFailed {
                error: "Table 9 not found".to_string(),
            })
            .when_action(PlanAction::AddNextTable)
            .then_state(|state| {
                assert!(state.last_error.is_none());
                assert_eq!(state.revision, 1);
                assert!(state.plan.ledger().contains(TableNumber::new(3)));
            })
            .run();
    }

    #[test]
    fn test_failing_transfer_changes_nothing() {
        let mut state = create_test_state();
        let now = test_clock().now();
        state
            .plan
            .allocate(&AllocationRequest::new("Huber", 8).preferring(TableNumber::new(1)), now)
            .unwrap();
        state
            .plan
            .allocate(&AllocationRequest::new("Maier", 7).preferring(TableNumber::new(2)), now)
            .unwrap();
        let id = state.plan.reservations().bucket(TableNumber::new(1))[0].id.clone();
        let request = TransferRequest::moving(
            TableNumber::new(1),
            TableNumber::new(2),
            vec![Selection::new(id, 8)],
        );
        assert!(!state.preview_transfer(&request, now).unwrap().is_committable());
        let before = state.plan.clone();

        ReducerTest::new(PlanReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(PlanAction::CommitTransfer { request })
            .then_state(move |state| {
                assert_eq!(state.plan, before);
                assert_eq!(state.revision, 0);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_checkout_records_summary() {
        let mut state = create_test_state();
        let now = test_clock().now();
        state
            .plan
            .allocate(&AllocationRequest::new("Huber", 3).preferring(TableNumber::new(2)), now)
            .unwrap();
        let id = state.plan.reservations().bucket(TableNumber::new(2))[0].id.clone();

        ReducerTest::new(PlanReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(PlanAction::AddToCart {
                table: TableNumber::new(2),
                reservation_id: id,
            })
            .when_action(PlanAction::CheckoutCart)
            .then_state(|state| {
                assert_eq!(
                    state.last_checkout,
                    Some(CheckoutSummary {
                        sold: 1,
                        total_cards: 3
                    })
                );
                assert_eq!(state.revision, 2);
            })
            .run();
    }

    #[test]
    fn test_snapshot_published_event_tracks_revision() {
        ReducerTest::new(PlanReducer::new())
            .with_env(create_test_env())
            .given_state(create_test_state())
            .when_action(PlanAction::SnapshotPublished { revision: 3 })
            .when_action(PlanAction::SnapshotPublished { revision: 2 })
            .then_state(|state| {
                assert_eq!(state.published_revision, 3);
                assert_eq!(state.revision, 0);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_action_classification() {
        assert!(PlanAction::CheckoutCart.is_command());
        assert!(PlanAction::SnapshotPublished { revision: 1 }.is_event());
        assert_eq!(
            PlanAction::ValidationFailed {
                error: String::new()
            }
            .event_type(),
            "ValidationFailed.v1"
        );
        assert_eq!(PlanAction::RemoveHighestTable.name(), "RemoveHighestTable");
    }
}

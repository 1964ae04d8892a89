//! Tischplan - table reservation engine for seated events
//!
//! Books customers onto the tables of a hall, keeps every table's free seats
//! consistent with the reservations held on it, and moves or swaps
//! reservations between tables with a preview before anything is committed.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!   PlanAction ───▶  │  PlanReducer (PlanState)     │ ──▶ Effect::Future
//!                    │   └─ SeatingPlan             │        │
//!                    │       ├─ TableLedger         │        ▼
//!                    │       ├─ ReservationStore    │   PlanBroadcaster
//!                    │       └─ BookingSequencer    │   (PlanUpdate)
//!                    └──────────────────────────────┘
//!                       ▲                 ▲
//!            allocation / transfer     split / snapshot
//! ```
//!
//! # Allocation
//!
//! A request for `n` cards is placed in this order:
//!
//! 1. the preferred table, as many cards as it has free (tagged "Tischwunsch")
//! 2. a single table whose free seats match the remainder exactly
//! 3. greedily, tables with most free seats first, the standing area last
//!
//! Every record of one request shares a booking id, so fragments on other
//! tables can be found again with [`split::find_split_fragments`].
//!
//! # Transfers
//!
//! ```text
//! preview(request) ──▶ TransferPreview { source_ok, target_ok, ... }
//!                            │ is_committable()
//!                            ▼
//! commit(request)  ──▶ ledger + store updated, or TransferRejected
//! ```
//!
//! A swap with equal card counts in both directions leaves free seats
//! unchanged. Sold reservations never move.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod allocation;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod ledger;
pub mod plan;
pub mod reducer;
pub mod sequencer;
pub mod snapshot;
pub mod split;
pub mod store;
pub mod transfer;
pub mod types;

pub use allocation::{Allocation, AllocationRequest, ShortfallPolicy};
pub use broadcast::{ChannelBroadcaster, NoopBroadcaster, PlanBroadcaster, PlanUpdate};
pub use config::{Config, LayoutPreset};
pub use error::SeatingError;
pub use ledger::TableLedger;
pub use plan::{CheckoutSummary, SeatingPlan};
pub use reducer::{PlanAction, PlanEnvironment, PlanReducer, PlanState};
pub use sequencer::BookingSequencer;
pub use snapshot::{PlanSnapshot, ReservationRecord, TableRow};
pub use split::SplitFragment;
pub use store::ReservationStore;
pub use transfer::{Selection, TransferMode, TransferPreview, TransferRequest};
pub use types::*;

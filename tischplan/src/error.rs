//! Error type for seating operations.

use crate::types::{ReservationId, ReservationState, TableNumber};
use thiserror::Error;

/// Everything a seating operation can reject
///
/// Every variant is raised before any mutation of the plan.
#[derive(Error, Debug)]
pub enum SeatingError {
    /// Customer name missing or blank
    #[error("Customer name must not be empty")]
    EmptyName,

    /// Card count must be a positive integer
    #[error("Card count must be greater than zero (got {0})")]
    InvalidCardCount(u32),

    /// Table does not exist
    #[error("Table {0} not found")]
    TableNotFound(TableNumber),

    /// Table number already in use
    #[error("Table {0} already exists")]
    TableExists(TableNumber),

    /// No reservation with this id on the addressed table(s)
    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationId),

    /// Sold reservations are immutable until reverted
    #[error("Reservation {0} is sold")]
    ReservationSold(ReservationId),

    /// Lifecycle transition not allowed from the current state
    #[error("Cannot {action} a reservation that is {from}")]
    InvalidTransition {
        /// State the record was in
        from: ReservationState,
        /// Attempted transition
        action: &'static str,
    },

    /// Request exceeds the free seats of the whole plan
    #[error("Insufficient capacity: requested {requested}, available {available}")]
    InsufficientCapacity {
        /// Cards requested
        requested: u32,
        /// Free seats across all tables
        available: u32,
    },

    /// Request exceeds the free seats of one table
    #[error("Insufficient free seats at table {table}: requested {requested}, available {available}")]
    InsufficientFreeSeats {
        /// Table addressed
        table: TableNumber,
        /// Seats requested
        requested: u32,
        /// Seats free
        available: u32,
    },

    /// Free seats would exceed the table's capacity
    #[error("Table {table} would have {free} free seats but only {capacity} in total")]
    FreeSeatsExceedCapacity {
        /// Table addressed
        table: TableNumber,
        /// Resulting free seats
        free: u32,
        /// Table capacity
        capacity: u32,
    },

    /// New capacity smaller than what is already booked
    #[error("Table {table} cannot shrink to {capacity} seats: {booked} already booked")]
    CapacityBelowBooked {
        /// Table addressed
        table: TableNumber,
        /// Requested capacity
        capacity: u32,
        /// Cards booked on the table
        booked: u32,
    },

    /// Transfer source and target are identical
    #[error("Source and target are both table {0}")]
    SameTable(TableNumber),

    /// Commit attempted with a preview that leaves a table overbooked
    #[error(
        "Transfer rejected: source would have {source_free_after} free seats, \
         target {target_free_after}"
    )]
    TransferRejected {
        /// Source free seats after the transfer
        source_free_after: i64,
        /// Target free seats after the transfer
        target_free_after: i64,
    },

    /// `free_seats + booked cards != capacity`
    #[error(
        "Conservation violated at table {table}: {free_seats} free + {booked} booked != {capacity}"
    )]
    ConservationViolated {
        /// Offending table
        table: TableNumber,
        /// Ledger capacity
        capacity: u32,
        /// Ledger free seats
        free_seats: u32,
        /// Cards in the table's bucket
        booked: u64,
    },

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

//! Domain types for the seating plan.
//!
//! Identifiers, table and reservation entities, and the reservation
//! lifecycle state machine.

use crate::error::SeatingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Number of a table in the hall; `0` is the standing area
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableNumber(u32);

impl TableNumber {
    /// The standing pseudo-table
    pub const STANDING: Self = Self(0);

    /// Creates a new `TableNumber`
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Get the inner value
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns true for the standing pseudo-table
    #[must_use]
    pub const fn is_standing(self) -> bool {
        self.0 == 0
    }

    /// Human-readable label: "Stehplätze" for the standing area, "Tisch N" otherwise
    #[must_use]
    pub fn label(self) -> String {
        if self.is_standing() {
            "Stehplätze".to_string()
        } else {
            format!("Tisch {}", self.0)
        }
    }
}

impl fmt::Display for TableNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TableNumber {
    fn from(number: u32) -> Self {
        Self(number)
    }
}

/// Identifier shared by every fragment of one purchase
///
/// Issued by the booking sequencer as a zero-padded decimal (`"001"`,
/// `"042"`, `"1234"`). Imported data may carry arbitrary strings.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(String);

impl BookingId {
    /// Wrap an existing booking id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Format a sequence value, padded to at least three digits
    #[must_use]
    pub fn from_sequence(value: u64) -> Self {
        Self(format!("{value:03}"))
    }

    /// Numeric value when the id is purely decimal
    #[must_use]
    pub fn sequence_value(&self) -> Option<u64> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }

    /// Get the inner string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of a reservation record
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(String);

impl ReservationId {
    /// Creates a new random `ReservationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing id (imported data)
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Where a table stands in the hall
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Standing area
    Standing,
    /// Left row
    Left,
    /// Middle row
    Middle,
    /// Right row
    Right,
}

/// Side of a table that borders an aisle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AisleNeighbor {
    /// Top
    Oben,
    /// Right
    Rechts,
    /// Bottom
    Unten,
    /// Left
    Links,
}

/// A table with its fixed capacity and current free seats
///
/// `capacity` is set when the table is created (or reconfigured) and is the
/// reference value for `free_seats + booked cards`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Unique table number
    pub number: TableNumber,
    /// Total seats
    pub capacity: u32,
    /// Seats not held by any reservation
    pub free_seats: u32,
    /// Placement in the hall
    pub position: Position,
    /// Aisle side, if any
    pub aisle_neighbor: Option<AisleNeighbor>,
}

impl Table {
    /// Creates an empty table (all seats free)
    #[must_use]
    pub const fn new(number: TableNumber, capacity: u32, position: Position) -> Self {
        Self {
            number,
            capacity,
            free_seats: capacity,
            position,
            aisle_neighbor: None,
        }
    }

    /// Set the aisle side
    #[must_use]
    pub const fn with_aisle(mut self, aisle: AisleNeighbor) -> Self {
        self.aisle_neighbor = Some(aisle);
        self
    }

    /// Seats currently held by reservations according to the ledger
    #[must_use]
    pub const fn booked(&self) -> u32 {
        self.capacity.saturating_sub(self.free_seats)
    }
}

// ============================================================================
// Reservations
// ============================================================================

/// Lifecycle state of a reservation record
///
/// ```text
/// Available --add_to_cart--> InCart --remove_from_cart--> Available
/// Available | InCart --mark_sold--> Sold --revert_sold--> Available
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReservationState {
    /// Booked, not yet checked out
    #[default]
    Available,
    /// Selected for checkout
    InCart,
    /// Paid; immutable until reverted
    Sold,
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::InCart => write!(f, "in cart"),
            Self::Sold => write!(f, "sold"),
        }
    }
}

/// One reservation record on one table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique record id
    pub id: ReservationId,
    /// Booking group
    pub booking_id: BookingId,
    /// Customer name (non-empty)
    pub name: String,
    /// Number of cards (seats), always > 0 while stored
    pub cards: u32,
    /// Free-text notes
    pub notes: String,
    /// Creation or last merge time
    pub timestamp: DateTime<Utc>,
    /// Lifecycle state
    pub state: ReservationState,
}

impl Reservation {
    /// Creates an available reservation with a fresh id
    #[must_use]
    pub fn new(
        booking_id: BookingId,
        name: impl Into<String>,
        cards: u32,
        notes: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            booking_id,
            name: name.into(),
            cards,
            notes: notes.into(),
            timestamp,
            state: ReservationState::Available,
        }
    }

    /// Returns true once sold
    #[must_use]
    pub const fn is_sold(&self) -> bool {
        matches!(self.state, ReservationState::Sold)
    }

    /// Returns true while in the cart
    #[must_use]
    pub const fn is_in_cart(&self) -> bool {
        matches!(self.state, ReservationState::InCart)
    }

    /// Reject modification of sold records
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::ReservationSold`] when the record is sold.
    pub fn ensure_editable(&self) -> Result<(), SeatingError> {
        if self.is_sold() {
            return Err(SeatingError::ReservationSold(self.id.clone()));
        }
        Ok(())
    }

    /// `Available → InCart`
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::InvalidTransition`] from any other state.
    pub fn add_to_cart(&mut self) -> Result<(), SeatingError> {
        self.transition("add_to_cart", |from| match from {
            ReservationState::Available => Some(ReservationState::InCart),
            ReservationState::InCart | ReservationState::Sold => None,
        })
    }

    /// `InCart → Available`
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::InvalidTransition`] from any other state.
    pub fn remove_from_cart(&mut self) -> Result<(), SeatingError> {
        self.transition("remove_from_cart", |from| match from {
            ReservationState::InCart => Some(ReservationState::Available),
            ReservationState::Available | ReservationState::Sold => None,
        })
    }

    /// `Available | InCart → Sold`
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::InvalidTransition`] when already sold.
    pub fn mark_sold(&mut self) -> Result<(), SeatingError> {
        self.transition("mark_sold", |from| match from {
            ReservationState::Available | ReservationState::InCart => Some(ReservationState::Sold),
            ReservationState::Sold => None,
        })
    }

    /// `Sold → Available`
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::InvalidTransition`] unless sold.
    pub fn revert_sold(&mut self) -> Result<(), SeatingError> {
        self.transition("revert_sold", |from| match from {
            ReservationState::Sold => Some(ReservationState::Available),
            ReservationState::Available | ReservationState::InCart => None,
        })
    }

    fn transition(
        &mut self,
        action: &'static str,
        next: impl FnOnce(ReservationState) -> Option<ReservationState>,
    ) -> Result<(), SeatingError> {
        let from = self.state;
        let Some(to) = next(from) else {
            return Err(SeatingError::InvalidTransition { from, action });
        };
        self.state = to;
        Ok(())
    }
}

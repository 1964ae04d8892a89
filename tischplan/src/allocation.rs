//! Allocation engine: distributes a new booking across tables.
//!
//! Order of placement:
//! 1. the preferred table, as far as it has free seats
//! 2. a table whose free seats exactly match the remainder
//! 3. greedy walk by free seats descending, standing area last

use crate::error::SeatingError;
use crate::ledger::TableLedger;
use crate::sequencer::BookingSequencer;
use crate::store::ReservationStore;
use crate::types::{BookingId, Reservation, ReservationId, TableNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What to do when a request exceeds the free seats of the whole plan
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortfallPolicy {
    /// Refuse the request before touching the plan
    #[default]
    Reject,
    /// Place what fits and report the rest as unallocated
    #[serde(rename = "drop")]
    DropRemainder,
}

/// A booking request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Customer name
    pub name: String,
    /// Cards requested
    pub cards: u32,
    /// Table the customer asked for
    pub preferred_table: Option<TableNumber>,
}

impl AllocationRequest {
    /// Request without a table preference
    #[must_use]
    pub fn new(name: impl Into<String>, cards: u32) -> Self {
        Self {
            name: name.into(),
            cards,
            preferred_table: None,
        }
    }

    /// Ask for a specific table first
    #[must_use]
    pub const fn preferring(mut self, table: TableNumber) -> Self {
        self.preferred_table = Some(table);
        self
    }
}

/// Outcome of a successful allocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Booking id shared by every record created
    pub booking_id: BookingId,
    /// Tables in the order they were filled
    pub used_tables: Vec<TableNumber>,
    /// Records created, parallel to `used_tables`
    pub reservation_ids: Vec<ReservationId>,
    /// Cards that found no seat (only under [`ShortfallPolicy::DropRemainder`])
    pub unallocated: u32,
}

/// Note attached to the record placed on the preferred table
#[must_use]
pub fn wish_note(table: TableNumber) -> String {
    if table.is_standing() {
        "Tischwunsch: Stehplatz".to_string()
    } else {
        format!("Tischwunsch: Tisch {table}")
    }
}

/// Reject malformed requests
///
/// # Errors
///
/// - [`SeatingError::EmptyName`] for a blank name
/// - [`SeatingError::InvalidCardCount`] for zero cards
/// - [`SeatingError::TableNotFound`] for an unknown preferred table
/// - [`SeatingError::InsufficientCapacity`] when the plan cannot hold the
///   request and the policy is [`ShortfallPolicy::Reject`]
pub fn validate_allocation(
    ledger: &TableLedger,
    request: &AllocationRequest,
    policy: ShortfallPolicy,
) -> Result<(), SeatingError> {
    if request.name.trim().is_empty() {
        return Err(SeatingError::EmptyName);
    }
    if request.cards == 0 {
        return Err(SeatingError::InvalidCardCount(request.cards));
    }
    if let Some(preferred) = request.preferred_table {
        if !ledger.contains(preferred) {
            return Err(SeatingError::TableNotFound(preferred));
        }
    }
    let available = ledger.total_free();
    if policy == ShortfallPolicy::Reject && available < u64::from(request.cards) {
        return Err(SeatingError::InsufficientCapacity {
            requested: request.cards,
            available: u32::try_from(available).unwrap_or(u32::MAX),
        });
    }
    Ok(())
}

/// Place a booking on the plan
///
/// Validation happens before the sequencer ticks, so a rejected request
/// leaves every component untouched. The ledger ends up sorted by number.
///
/// # Errors
///
/// See [`validate_allocation`].
pub fn allocate(
    ledger: &mut TableLedger,
    store: &mut ReservationStore,
    sequencer: &mut BookingSequencer,
    request: &AllocationRequest,
    policy: ShortfallPolicy,
    now: DateTime<Utc>,
) -> Result<Allocation, SeatingError> {
    validate_allocation(ledger, request, policy)?;

    let name = request.name.trim();
    let booking_id = sequencer.next();
    let mut placements: Vec<(TableNumber, u32, String)> = Vec::new();
    let mut remaining = request.cards;

    if let Some(preferred) = request.preferred_table {
        let free = ledger.get_free(preferred).unwrap_or(0);
        if free > 0 {
            let take = free.min(remaining);
            ledger.take(preferred, take)?;
            placements.push((preferred, take, wish_note(preferred)));
            remaining -= take;
            tracing::debug!(table = %preferred, cards = take, "Preferred table honored");
        }
    }

    if remaining > 0 {
        ledger.sort_by_free_descending_standing_last();
        for (table, take) in plan_remainder(ledger, remaining) {
            ledger.take(table, take)?;
            placements.push((table, take, String::new()));
            remaining -= take;
        }
    }
    ledger.sort_by_number();

    let mut used_tables = Vec::with_capacity(placements.len());
    let mut reservation_ids = Vec::with_capacity(placements.len());
    for (table, cards, notes) in placements {
        let record = Reservation::new(booking_id.clone(), name, cards, notes, now);
        used_tables.push(table);
        reservation_ids.push(record.id.clone());
        store.push(table, record);
    }

    if remaining > 0 {
        tracing::warn!(
            booking_id = %booking_id,
            requested = request.cards,
            unallocated = remaining,
            "Allocation shortfall dropped"
        );
    }
    tracing::info!(
        booking_id = %booking_id,
        customer = name,
        cards = request.cards - remaining,
        tables = ?used_tables,
        "Booking allocated"
    );

    Ok(Allocation {
        booking_id,
        used_tables,
        reservation_ids,
        unallocated: remaining,
    })
}

/// Exact-fit pass, then greedy walk, over the ledger's current order
fn plan_remainder(ledger: &TableLedger, remaining: u32) -> Vec<(TableNumber, u32)> {
    if let Some(exact) = ledger.tables().iter().find(|t| t.free_seats == remaining) {
        return vec![(exact.number, remaining)];
    }

    let mut rest = remaining;
    let mut placements = Vec::new();
    for table in ledger.tables() {
        if rest == 0 {
            break;
        }
        if table.free_seats == 0 {
            continue;
        }
        let take = table.free_seats.min(rest);
        placements.push((table.number, take));
        rest -= take;
    }
    placements
}

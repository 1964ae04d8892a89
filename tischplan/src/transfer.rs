//! Transfer engine: move and swap reservations between two tables.
//!
//! [`preview`] simulates the transfer on copies of both buckets and reports
//! the resulting free seats. [`commit`] re-runs the same simulation and
//! applies it only when neither table ends up overbooked.

use crate::error::SeatingError;
use crate::ledger::TableLedger;
use crate::split::{find_split_fragments_with, SplitFragment};
use crate::store::ReservationStore;
use crate::types::{BookingId, Reservation, ReservationId, ReservationState, TableNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

/// Direction of a transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Source to target only
    Move,
    /// Source to target and target to source
    Swap,
}

/// Cards to take from one reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Record on the giving table
    pub reservation_id: ReservationId,
    /// Cards to move; clamped to the record's cards
    pub amount: u32,
}

impl Selection {
    /// Creates a selection
    #[must_use]
    pub const fn new(reservation_id: ReservationId, amount: u32) -> Self {
        Self {
            reservation_id,
            amount,
        }
    }
}

/// Inputs shared by [`preview`] and [`commit`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Move or swap
    pub mode: TransferMode,
    /// Giving table
    pub source: TableNumber,
    /// Receiving table
    pub target: TableNumber,
    /// Cards leaving the source
    pub source_selections: Vec<Selection>,
    /// Cards leaving the target (swap only)
    pub target_selections: Vec<Selection>,
}

impl TransferRequest {
    /// Move request
    #[must_use]
    pub const fn moving(
        source: TableNumber,
        target: TableNumber,
        source_selections: Vec<Selection>,
    ) -> Self {
        Self {
            mode: TransferMode::Move,
            source,
            target,
            source_selections,
            target_selections: Vec::new(),
        }
    }

    /// Swap request
    #[must_use]
    pub const fn swapping(
        source: TableNumber,
        target: TableNumber,
        source_selections: Vec<Selection>,
        target_selections: Vec<Selection>,
    ) -> Self {
        Self {
            mode: TransferMode::Swap,
            source,
            target,
            source_selections,
            target_selections,
        }
    }

    fn effective_target_selections(&self) -> &[Selection] {
        match self.mode {
            TransferMode::Move => &[],
            TransferMode::Swap => &self.target_selections,
        }
    }
}

// ============================================================================
// Preview
// ============================================================================

/// Simulated result of a transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferPreview {
    /// Move or swap
    pub mode: TransferMode,
    /// Giving table
    pub source: TableNumber,
    /// Receiving table
    pub target: TableNumber,
    /// Source free seats now
    pub source_free_before: u32,
    /// Target free seats now
    pub target_free_before: u32,
    /// Source free seats after the transfer (negative means overbooked)
    pub source_free_after: i64,
    /// Target free seats after the transfer (negative means overbooked)
    pub target_free_after: i64,
    /// Cards moving source to target
    pub sum_out: u32,
    /// Cards moving target to source
    pub sum_in: u32,
    /// `source_free_after >= 0`
    pub source_ok: bool,
    /// `target_free_after >= 0`
    pub target_ok: bool,
    /// Source bucket after the transfer
    pub simulated_source: Vec<Reservation>,
    /// Target bucket after the transfer
    pub simulated_target: Vec<Reservation>,
    /// Sold records that were selected and skipped
    pub ignored_sold: Vec<ReservationId>,
}

impl TransferPreview {
    /// Both tables stay within capacity
    #[must_use]
    pub const fn is_committable(&self) -> bool {
        self.source_ok && self.target_ok
    }

    /// Split fragments of `booking_id` as they would look after the transfer
    #[must_use]
    pub fn split_fragments(
        &self,
        store: &ReservationStore,
        booking_id: &BookingId,
        current: TableNumber,
    ) -> Vec<SplitFragment> {
        find_split_fragments_with(
            store,
            &[
                (self.source, self.simulated_source.as_slice()),
                (self.target, self.simulated_target.as_slice()),
            ],
            booking_id,
            current,
        )
    }
}

/// Simulate a transfer without touching the ledger or the store
///
/// Selections of sold records are skipped. Amounts larger than a record's
/// cards are clamped. In move mode the target selections are ignored.
///
/// # Errors
///
/// - [`SeatingError::SameTable`] when source and target coincide
/// - [`SeatingError::TableNotFound`] for an unknown table
/// - [`SeatingError::ReservationNotFound`] when a selection is not on its table
pub fn preview(
    ledger: &TableLedger,
    store: &ReservationStore,
    request: &TransferRequest,
    now: DateTime<Utc>,
) -> Result<TransferPreview, SeatingError> {
    if request.source == request.target {
        return Err(SeatingError::SameTable(request.source));
    }
    let source_free_before = ledger
        .get_free(request.source)
        .ok_or(SeatingError::TableNotFound(request.source))?;
    let target_free_before = ledger
        .get_free(request.target)
        .ok_or(SeatingError::TableNotFound(request.target))?;

    let mut ignored_sold = Vec::new();
    let outgoing = usable_selections(
        store.bucket(request.source),
        &request.source_selections,
        &mut ignored_sold,
    )?;
    let incoming = usable_selections(
        store.bucket(request.target),
        request.effective_target_selections(),
        &mut ignored_sold,
    )?;

    let mut simulated_source = store.bucket(request.source).to_vec();
    let mut simulated_target = store.bucket(request.target).to_vec();

    let sum_out = shift(&mut simulated_source, &mut simulated_target, &outgoing, now);
    simulated_source.retain(|r| r.cards > 0);
    let sum_in = shift(&mut simulated_target, &mut simulated_source, &incoming, now);
    simulated_target.retain(|r| r.cards > 0);

    let source_free_after =
        i64::from(source_free_before) + i64::from(sum_out) - i64::from(sum_in);
    let target_free_after =
        i64::from(target_free_before) - i64::from(sum_out) + i64::from(sum_in);

    tracing::debug!(
        source = %request.source,
        target = %request.target,
        sum_out,
        sum_in,
        source_free_after,
        target_free_after,
        "Transfer simulated"
    );

    Ok(TransferPreview {
        mode: request.mode,
        source: request.source,
        target: request.target,
        source_free_before,
        target_free_before,
        source_free_after,
        target_free_after,
        sum_out,
        sum_in,
        source_ok: source_free_after >= 0,
        target_ok: target_free_after >= 0,
        simulated_source,
        simulated_target,
        ignored_sold,
    })
}

/// Apply a transfer to the ledger and the store
///
/// Re-simulates `request`; nothing is changed unless both tables stay
/// within capacity.
///
/// # Errors
///
/// - every error of [`preview`]
/// - [`SeatingError::TransferRejected`] when the simulation overbooks a table
pub fn commit(
    ledger: &mut TableLedger,
    store: &mut ReservationStore,
    request: &TransferRequest,
    now: DateTime<Utc>,
) -> Result<TransferPreview, SeatingError> {
    let result = preview(ledger, store, request, now)?;
    let rejected = || SeatingError::TransferRejected {
        source_free_after: result.source_free_after,
        target_free_after: result.target_free_after,
    };
    if !result.is_committable() {
        return Err(rejected());
    }

    let source_free = u32::try_from(result.source_free_after).map_err(|_| rejected())?;
    let target_free = u32::try_from(result.target_free_after).map_err(|_| rejected())?;
    for (table, free) in [(request.source, source_free), (request.target, target_free)] {
        let capacity = ledger.get(table).map_or(0, |t| t.capacity);
        if free > capacity {
            return Err(SeatingError::FreeSeatsExceedCapacity {
                table,
                free,
                capacity,
            });
        }
    }

    ledger.set_free(request.source, source_free)?;
    ledger.set_free(request.target, target_free)?;
    store.replace_bucket(request.source, result.simulated_source.clone());
    store.replace_bucket(request.target, result.simulated_target.clone());

    tracing::info!(
        mode = ?request.mode,
        source = %request.source,
        target = %request.target,
        cards_out = result.sum_out,
        cards_in = result.sum_in,
        "Transfer committed"
    );
    Ok(result)
}

// ============================================================================
// Simulation helpers
// ============================================================================

/// Resolve selections against the live bucket, dropping sold records
fn usable_selections(
    bucket: &[Reservation],
    selections: &[Selection],
    ignored_sold: &mut Vec<ReservationId>,
) -> Result<Vec<Selection>, SeatingError> {
    let mut usable = Vec::with_capacity(selections.len());
    for selection in selections {
        let Some(record) = bucket.iter().find(|r| r.id == selection.reservation_id) else {
            return Err(SeatingError::ReservationNotFound(
                selection.reservation_id.clone(),
            ));
        };
        if record.is_sold() {
            tracing::warn!(reservation_id = %record.id, "Sold reservation excluded from transfer");
            ignored_sold.push(record.id.clone());
            continue;
        }
        usable.push(selection.clone());
    }
    Ok(usable)
}

/// Subtract each selection from `from` and merge it into `into`; returns cards moved
fn shift(
    from: &mut [Reservation],
    into: &mut Vec<Reservation>,
    selections: &[Selection],
    now: DateTime<Utc>,
) -> u32 {
    let mut moved = 0;
    for selection in selections {
        let Some(record) = from.iter_mut().find(|r| r.id == selection.reservation_id) else {
            continue;
        };
        let amount = selection.amount.min(record.cards);
        if amount == 0 {
            continue;
        }
        record.cards -= amount;
        merge_into(into, record, amount, now);
        moved += amount;
    }
    moved
}

/// Add `amount` cards of `origin`'s booking to `bucket`
///
/// An unsold record with the same booking id and name absorbs the cards;
/// otherwise a new available record is appended.
fn merge_into(bucket: &mut Vec<Reservation>, origin: &Reservation, amount: u32, now: DateTime<Utc>) {
    if let Some(existing) = bucket.iter_mut().find(|r| {
        !r.is_sold() && r.booking_id == origin.booking_id && r.name == origin.name
    }) {
        existing.cards = existing.cards.saturating_add(amount);
        existing.timestamp = now;
        return;
    }
    bucket.push(Reservation {
        id: ReservationId::new(),
        booking_id: origin.booking_id.clone(),
        name: origin.name.clone(),
        cards: amount,
        notes: origin.notes.clone(),
        timestamp: now,
        state: ReservationState::Available,
    });
}

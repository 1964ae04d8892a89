//! The seating plan of one event.
//!
//! [`SeatingPlan`] owns the ledger, the reservation store and the booking
//! sequencer, and is the single entry point for every operation on them.
//! All mutating operations validate first and change nothing on error.

use crate::allocation::{self, Allocation, AllocationRequest, ShortfallPolicy};
use crate::error::SeatingError;
use crate::ledger::TableLedger;
use crate::sequencer::BookingSequencer;
use crate::snapshot::{self, PlanSnapshot, ReservationBuckets};
use crate::split::{self, SplitFragment};
use crate::store::ReservationStore;
use crate::transfer::{self, TransferPreview, TransferRequest};
use crate::types::{
    AisleNeighbor, BookingId, Position, Reservation, ReservationId, Table, TableNumber,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of checking out the cart
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSummary {
    /// Reservations marked sold
    pub sold: usize,
    /// Cards across those reservations
    pub total_cards: u64,
}

/// Tables, reservations and booking sequence of one event
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeatingPlan {
    ledger: TableLedger,
    reservations: ReservationStore,
    sequencer: BookingSequencer,
    policy: ShortfallPolicy,
}

impl SeatingPlan {
    /// Plan with the given tables and no reservations
    #[must_use]
    pub fn new(ledger: TableLedger, policy: ShortfallPolicy) -> Self {
        let mut reservations = ReservationStore::new();
        for table in ledger.tables() {
            reservations.ensure_bucket(table.number);
        }
        Self {
            ledger,
            reservations,
            sequencer: BookingSequencer::new(),
            policy,
        }
    }

    pub(crate) const fn from_parts(
        ledger: TableLedger,
        reservations: ReservationStore,
        sequencer: BookingSequencer,
        policy: ShortfallPolicy,
    ) -> Self {
        Self {
            ledger,
            reservations,
            sequencer,
            policy,
        }
    }

    /// Table capacity ledger
    #[must_use]
    pub const fn ledger(&self) -> &TableLedger {
        &self.ledger
    }

    /// Reservation store
    #[must_use]
    pub const fn reservations(&self) -> &ReservationStore {
        &self.reservations
    }

    /// Booking sequencer
    #[must_use]
    pub const fn sequencer(&self) -> &BookingSequencer {
        &self.sequencer
    }

    /// Shortfall policy applied by [`SeatingPlan::allocate`]
    #[must_use]
    pub const fn policy(&self) -> ShortfallPolicy {
        self.policy
    }

    /// Change the shortfall policy
    pub fn set_policy(&mut self, policy: ShortfallPolicy) {
        self.policy = policy;
    }

    // ========================================================================
    // Allocation and transfer
    // ========================================================================

    /// Book a request onto the plan
    ///
    /// # Errors
    ///
    /// See [`allocation::validate_allocation`].
    pub fn allocate(
        &mut self,
        request: &AllocationRequest,
        now: DateTime<Utc>,
    ) -> Result<Allocation, SeatingError> {
        allocation::allocate(
            &mut self.ledger,
            &mut self.reservations,
            &mut self.sequencer,
            request,
            self.policy,
            now,
        )
    }

    /// Simulate a move or swap
    ///
    /// # Errors
    ///
    /// See [`transfer::preview`].
    pub fn preview_transfer(
        &self,
        request: &TransferRequest,
        now: DateTime<Utc>,
    ) -> Result<TransferPreview, SeatingError> {
        transfer::preview(&self.ledger, &self.reservations, request, now)
    }

    /// Apply a move or swap
    ///
    /// # Errors
    ///
    /// See [`transfer::commit`].
    pub fn commit_transfer(
        &mut self,
        request: &TransferRequest,
        now: DateTime<Utc>,
    ) -> Result<TransferPreview, SeatingError> {
        transfer::commit(&mut self.ledger, &mut self.reservations, request, now)
    }

    /// Fragments of a booking on tables other than `exclude`
    #[must_use]
    pub fn find_split_fragments(
        &self,
        booking_id: &BookingId,
        exclude: TableNumber,
    ) -> Vec<SplitFragment> {
        split::find_split_fragments(&self.reservations, booking_id, exclude)
    }

    /// "Weitere Plätze: …" annotation for a booking seen from `current`
    #[must_use]
    pub fn split_info(&self, booking_id: &BookingId, current: TableNumber) -> Option<String> {
        split::split_info_text(&self.find_split_fragments(booking_id, current))
    }

    // ========================================================================
    // Reservation editing
    // ========================================================================

    /// Change the card count of a reservation
    ///
    /// Growing takes seats from the table's free seats; shrinking releases them.
    ///
    /// # Errors
    ///
    /// - [`SeatingError::InvalidCardCount`] for zero cards
    /// - [`SeatingError::ReservationNotFound`] if the record is not on `table`
    /// - [`SeatingError::ReservationSold`] for sold records
    /// - [`SeatingError::InsufficientFreeSeats`] if the table cannot hold the increase
    pub fn edit_cards(
        &mut self,
        table: TableNumber,
        id: &ReservationId,
        cards: u32,
    ) -> Result<(), SeatingError> {
        if cards == 0 {
            return Err(SeatingError::InvalidCardCount(cards));
        }
        let record = self
            .reservations
            .find(table, id)
            .ok_or_else(|| SeatingError::ReservationNotFound(id.clone()))?;
        record.ensure_editable()?;

        let current = record.cards;
        if cards > current {
            self.ledger.take(table, cards - current)?;
        } else if cards < current {
            self.ledger.release(table, current - cards)?;
        }
        if let Some(record) = self.reservations.get_mut(table, id) {
            record.cards = cards;
        }
        tracing::info!(table = %table, reservation_id = %id, from = current, to = cards, "Cards edited");
        Ok(())
    }

    /// Replace the notes of a reservation
    ///
    /// # Errors
    ///
    /// - [`SeatingError::ReservationNotFound`] if the record is not on `table`
    /// - [`SeatingError::ReservationSold`] for sold records
    pub fn edit_notes(
        &mut self,
        table: TableNumber,
        id: &ReservationId,
        notes: impl Into<String>,
    ) -> Result<(), SeatingError> {
        let record = self
            .reservations
            .get_mut(table, id)
            .ok_or_else(|| SeatingError::ReservationNotFound(id.clone()))?;
        record.ensure_editable()?;
        record.notes = notes.into();
        Ok(())
    }

    /// Delete a reservation in any state and release its seats
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::ReservationNotFound`] if the record is not on `table`.
    pub fn delete_reservation(
        &mut self,
        table: TableNumber,
        id: &ReservationId,
    ) -> Result<Reservation, SeatingError> {
        let cards = self
            .reservations
            .find(table, id)
            .map(|r| r.cards)
            .ok_or_else(|| SeatingError::ReservationNotFound(id.clone()))?;
        self.ledger.release(table, cards)?;
        let removed = self
            .reservations
            .remove(table, id)
            .ok_or_else(|| SeatingError::ReservationNotFound(id.clone()))?;
        tracing::info!(table = %table, reservation_id = %id, cards, "Reservation deleted");
        Ok(removed)
    }

    // ========================================================================
    // Cart
    // ========================================================================

    fn record_mut(
        &mut self,
        table: TableNumber,
        id: &ReservationId,
    ) -> Result<&mut Reservation, SeatingError> {
        self.reservations
            .get_mut(table, id)
            .ok_or_else(|| SeatingError::ReservationNotFound(id.clone()))
    }

    /// Put a reservation into the cart
    ///
    /// # Errors
    ///
    /// - [`SeatingError::ReservationNotFound`] if the record is not on `table`
    /// - [`SeatingError::InvalidTransition`] unless the record is available
    pub fn add_to_cart(&mut self, table: TableNumber, id: &ReservationId) -> Result<(), SeatingError> {
        self.record_mut(table, id)?.add_to_cart()
    }

    /// Take a reservation out of the cart
    ///
    /// # Errors
    ///
    /// - [`SeatingError::ReservationNotFound`] if the record is not on `table`
    /// - [`SeatingError::InvalidTransition`] unless the record is in the cart
    pub fn remove_from_cart(
        &mut self,
        table: TableNumber,
        id: &ReservationId,
    ) -> Result<(), SeatingError> {
        self.record_mut(table, id)?.remove_from_cart()
    }

    /// Mark a reservation sold
    ///
    /// # Errors
    ///
    /// - [`SeatingError::ReservationNotFound`] if the record is not on `table`
    /// - [`SeatingError::InvalidTransition`] if already sold
    pub fn mark_sold(&mut self, table: TableNumber, id: &ReservationId) -> Result<(), SeatingError> {
        self.record_mut(table, id)?.mark_sold()
    }

    /// Undo a sale
    ///
    /// # Errors
    ///
    /// - [`SeatingError::ReservationNotFound`] if the record is not on `table`
    /// - [`SeatingError::InvalidTransition`] unless the record is sold
    pub fn revert_sold(&mut self, table: TableNumber, id: &ReservationId) -> Result<(), SeatingError> {
        self.record_mut(table, id)?.revert_sold()
    }

    /// Reservations currently in the cart, tables ascending
    #[must_use]
    pub fn cart_entries(&self) -> Vec<(TableNumber, &Reservation)> {
        self.reservations.iter().filter(|(_, r)| r.is_in_cart()).collect()
    }

    /// Mark every reservation in the cart sold
    pub fn checkout_cart(&mut self) -> CheckoutSummary {
        let mut summary = CheckoutSummary::default();
        for (_, record) in self.reservations.iter_mut() {
            if record.is_in_cart() && record.mark_sold().is_ok() {
                summary.sold += 1;
                summary.total_cards += u64::from(record.cards);
            }
        }
        tracing::info!(sold = summary.sold, total_cards = summary.total_cards, "Cart checked out");
        summary
    }

    // ========================================================================
    // Table management
    // ========================================================================

    /// Add a table with the next free number and the most common capacity
    ///
    /// # Errors
    ///
    /// Propagates [`SeatingError::TableExists`]; not expected since the
    /// number is chosen among unused ones.
    pub fn add_next_table(&mut self) -> Result<TableNumber, SeatingError> {
        let number = self.ledger.next_free_number();
        let capacity = self.ledger.most_common_capacity();
        self.add_table(number, capacity, Position::Middle, None)?;
        Ok(number)
    }

    /// Add an empty table
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::TableExists`] if the number is taken.
    pub fn add_table(
        &mut self,
        number: TableNumber,
        capacity: u32,
        position: Position,
        aisle_neighbor: Option<AisleNeighbor>,
    ) -> Result<(), SeatingError> {
        let mut table = Table::new(number, capacity, position);
        table.aisle_neighbor = aisle_neighbor;
        self.ledger.add_table(table)?;
        self.reservations.ensure_bucket(number);
        tracing::info!(table = %number, capacity, "Table added");
        Ok(())
    }

    /// Remove a table together with its reservations
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::TableNotFound`] if the table does not exist.
    pub fn remove_table(&mut self, number: TableNumber) -> Result<Vec<Reservation>, SeatingError> {
        self.ledger.remove_table(number)?;
        let dropped = self.reservations.remove_bucket(number);
        if dropped.is_empty() {
            tracing::info!(table = %number, "Table removed");
        } else {
            tracing::warn!(table = %number, dropped = dropped.len(), "Table removed with reservations");
        }
        Ok(dropped)
    }

    /// Remove the table with the highest number
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::TableNotFound`] when the plan has no tables.
    pub fn remove_highest_table(
        &mut self,
    ) -> Result<(TableNumber, Vec<Reservation>), SeatingError> {
        let number = self
            .ledger
            .highest_number()
            .ok_or(SeatingError::TableNotFound(TableNumber::STANDING))?;
        let dropped = self.remove_table(number)?;
        Ok((number, dropped))
    }

    /// Change capacity, position and aisle of a table
    ///
    /// # Errors
    ///
    /// - [`SeatingError::TableNotFound`] if the table does not exist
    /// - [`SeatingError::CapacityBelowBooked`] if `capacity` is less than the cards booked
    pub fn reconfigure_table(
        &mut self,
        number: TableNumber,
        capacity: u32,
        position: Position,
        aisle_neighbor: Option<AisleNeighbor>,
    ) -> Result<(), SeatingError> {
        self.ledger
            .reconfigure(number, capacity, position, aisle_neighbor)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Every record of a booking group, tables ascending
    #[must_use]
    pub fn booking_group(&self, booking_id: &BookingId) -> Vec<(TableNumber, &Reservation)> {
        self.reservations.booking_group(booking_id).collect()
    }

    /// Free-text search over name, booking id and notes
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<(TableNumber, &Reservation)> {
        self.reservations.search(query)
    }

    /// Check `free_seats + booked cards == capacity` for every table
    ///
    /// Records on tables unknown to the ledger count against a capacity of zero.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::ConservationViolated`] naming the first offending table.
    pub fn verify_conservation(&self) -> Result<(), SeatingError> {
        for table in self.ledger.tables() {
            let booked = self.reservations.reserved_cards(table.number);
            if u64::from(table.free_seats) + booked != u64::from(table.capacity) {
                return Err(SeatingError::ConservationViolated {
                    table: table.number,
                    capacity: table.capacity,
                    free_seats: table.free_seats,
                    booked,
                });
            }
        }
        for number in self.reservations.table_numbers() {
            let booked = self.reservations.reserved_cards(number);
            if !self.ledger.contains(number) && booked > 0 {
                return Err(SeatingError::ConservationViolated {
                    table: number,
                    capacity: 0,
                    free_seats: 0,
                    booked,
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Capture the exchangeable state shape
    #[must_use]
    pub fn to_snapshot(&self) -> PlanSnapshot {
        PlanSnapshot::capture(self)
    }

    /// Rebuild a plan from a snapshot
    ///
    /// # Errors
    ///
    /// See [`PlanSnapshot::restore`].
    pub fn from_snapshot(
        snapshot: PlanSnapshot,
        policy: ShortfallPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, SeatingError> {
        snapshot.restore(policy, now)
    }

    /// Replace all reservations while keeping the tables
    ///
    /// Capacities stay as they are unless an imported table holds more cards
    /// than its capacity, in which case the capacity grows to match. Tables
    /// that only appear in the import are created full.
    ///
    /// # Errors
    ///
    /// Propagates ledger errors; none are expected for well-formed input.
    pub fn import_reservations(
        &mut self,
        buckets: ReservationBuckets,
        now: DateTime<Utc>,
    ) -> Result<(), SeatingError> {
        let mut sequencer = self.sequencer;
        let mut store = snapshot::normalize_buckets(buckets, &mut sequencer, now);

        let mut ledger = self.ledger.clone();
        for table in self.ledger.tables() {
            ledger.set_free(table.number, table.capacity)?;
        }

        let imported: Vec<TableNumber> = store.table_numbers().collect();
        for number in imported {
            let booked = u32::try_from(store.reserved_cards(number)).unwrap_or(u32::MAX);
            match ledger.get(number).map(|t| (t.capacity, t.position, t.aisle_neighbor)) {
                Some((capacity, position, aisle)) => {
                    if booked > capacity {
                        tracing::warn!(table = %number, capacity, booked, "Import exceeds capacity, growing table");
                        ledger.reconfigure(number, booked, position, aisle)?;
                    }
                    ledger.take(number, booked)?;
                },
                None if booked == 0 => {
                    store.remove_bucket(number);
                },
                None => {
                    let mut table = Table::new(number, booked, default_position(number));
                    table.free_seats = 0;
                    ledger.add_table(table)?;
                },
            }
        }

        for table in ledger.tables() {
            store.ensure_bucket(table.number);
        }

        tracing::info!(
            reservations = store.len(),
            tables = ledger.len(),
            "Reservations imported"
        );
        self.ledger = ledger;
        self.reservations = store;
        self.sequencer = sequencer;
        Ok(())
    }
}

/// Position given to tables that appear only in imported data
pub(crate) const fn default_position(number: TableNumber) -> Position {
    if number.is_standing() {
        Position::Standing
    } else {
        Position::Middle
    }
}

//! Persisted and exchanged state shape.
//!
//! Tables travel as `[number, freeSeats, position, aisleNeighbor]` arrays and
//! reservations as arrays keyed by the table number as a string:
//!
//! ```json
//! {
//!   "tables": [[0, 76, "standing", null], [1, 14, "left", null]],
//!   "reservationsByTable": {
//!     "1": [{"id": "…", "bookingId": "001", "name": "Huber", "cards": 4,
//!            "notes": "", "ts": "2025-01-01T00:00:00.000Z", "sold": false}]
//!   },
//!   "lastBookingSeq": 1
//! }
//! ```

use crate::allocation::ShortfallPolicy;
use crate::error::SeatingError;
use crate::ledger::TableLedger;
use crate::plan::{default_position, SeatingPlan};
use crate::sequencer::BookingSequencer;
use crate::store::ReservationStore;
use crate::types::{
    AisleNeighbor, BookingId, Position, Reservation, ReservationId, ReservationState, Table,
    TableNumber,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reservation records keyed by table number as string
pub type ReservationBuckets = BTreeMap<String, Vec<ReservationRecord>>;

/// `[number, freeSeats, position, aisleNeighbor]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow(pub u32, pub u32, pub Position, pub Option<AisleNeighbor>);

/// One reservation as it appears in exchanged JSON
///
/// Every field is optional on input; normalization fills or drops.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRecord {
    /// Record id; generated when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Booking group; assigned from the sequencer when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    /// Customer name
    #[serde(default)]
    pub name: String,
    /// Cards booked
    #[serde(default)]
    pub cards: u32,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
    /// RFC 3339 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    /// Sold flag; wins over `in_cart`
    #[serde(default)]
    pub sold: bool,
    /// In-cart flag
    #[serde(default)]
    pub in_cart: bool,
}

impl ReservationRecord {
    fn from_reservation(reservation: &Reservation) -> Self {
        Self {
            id: Some(reservation.id.as_str().to_string()),
            booking_id: Some(reservation.booking_id.as_str().to_string()),
            name: reservation.name.clone(),
            cards: reservation.cards,
            notes: reservation.notes.clone(),
            ts: Some(reservation.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            sold: reservation.is_sold(),
            in_cart: reservation.is_in_cart(),
        }
    }
}

/// Complete exchangeable state of one plan
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSnapshot {
    /// Tables in number order
    pub tables: Vec<TableRow>,
    /// Reservations per table
    pub reservations_by_table: ReservationBuckets,
    /// Last booking sequence value handed out
    #[serde(default)]
    pub last_booking_seq: u64,
}

impl PlanSnapshot {
    /// Capture a plan; every table gets a bucket, empty or not
    #[must_use]
    pub fn capture(plan: &SeatingPlan) -> Self {
        let tables = plan
            .ledger()
            .tables()
            .iter()
            .map(|t| TableRow(t.number.value(), t.free_seats, t.position, t.aisle_neighbor))
            .collect();

        let mut reservations_by_table = ReservationBuckets::new();
        for table in plan.ledger().tables() {
            reservations_by_table.insert(table.number.to_string(), Vec::new());
        }
        for (table, reservation) in plan.reservations().iter() {
            reservations_by_table
                .entry(table.to_string())
                .or_default()
                .push(ReservationRecord::from_reservation(reservation));
        }

        Self {
            tables,
            reservations_by_table,
            last_booking_seq: plan.sequencer().last(),
        }
    }

    /// Rebuild a plan
    ///
    /// Each table's capacity is its free seats plus the cards booked on it.
    /// Buckets of tables missing from `tables` create a full table.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::TableExists`] when a table number repeats.
    pub fn restore(
        self,
        policy: ShortfallPolicy,
        now: DateTime<Utc>,
    ) -> Result<SeatingPlan, SeatingError> {
        let mut sequencer = BookingSequencer::starting_at(self.last_booking_seq);
        let mut store = normalize_buckets(self.reservations_by_table, &mut sequencer, now);

        let mut ledger = TableLedger::new();
        for TableRow(number, free, position, aisle) in self.tables {
            let number = TableNumber::new(number);
            let booked = clamp_u32(store.reserved_cards(number));
            let mut table = Table::new(number, free.saturating_add(booked), position);
            table.free_seats = free;
            table.aisle_neighbor = aisle;
            ledger.add_table(table)?;
        }

        let orphaned: Vec<TableNumber> =
            store.table_numbers().filter(|n| !ledger.contains(*n)).collect();
        for number in orphaned {
            let booked = clamp_u32(store.reserved_cards(number));
            if booked == 0 {
                store.remove_bucket(number);
                continue;
            }
            tracing::warn!(table = %number, booked, "Reservations for unknown table, creating it");
            let mut table = Table::new(number, booked, default_position(number));
            table.free_seats = 0;
            ledger.add_table(table)?;
        }
        for table in ledger.tables() {
            store.ensure_bucket(table.number);
        }

        tracing::info!(
            tables = ledger.len(),
            reservations = store.len(),
            last_booking_seq = sequencer.last(),
            "Plan restored from snapshot"
        );
        Ok(SeatingPlan::from_parts(ledger, store, sequencer, policy))
    }

    /// Encode as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::Snapshot`] if encoding fails.
    pub fn to_json(&self) -> Result<String, SeatingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::Snapshot`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self, SeatingError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parse a reservation export
///
/// Accepts `{"reservationsByTable": {...}}` or the bare map. Buckets that are
/// not arrays and records that do not decode are skipped with a warning.
///
/// # Errors
///
/// Returns [`SeatingError::Snapshot`] if the input is not a JSON object.
pub fn parse_reservations_json(json: &str) -> Result<ReservationBuckets, SeatingError> {
    let value: Value = serde_json::from_str(json)?;
    let source = match value {
        Value::Object(mut map) => match map.remove("reservationsByTable") {
            Some(Value::Object(inner)) => inner,
            Some(_) | None => map,
        },
        _ => {
            return Err(SeatingError::Snapshot(serde::de::Error::custom(
                "reservations must be a JSON object",
            )));
        },
    };

    let mut buckets = ReservationBuckets::new();
    for (key, bucket) in source {
        let Value::Array(items) = bucket else {
            tracing::warn!(key = %key, "Skipping reservation bucket that is not an array");
            continue;
        };
        let records = buckets.entry(key.clone()).or_default();
        for item in items {
            match serde_json::from_value::<ReservationRecord>(item) {
                Ok(record) => records.push(record),
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "Skipping malformed reservation");
                },
            }
        }
    }
    Ok(buckets)
}

/// Turn exchanged records into a store
///
/// Non-numeric keys and records with a blank name or zero cards are
/// dropped. Missing ids and timestamps are generated. Records without a
/// booking id get fresh ones after `sequencer` is resynced from the rest.
pub(crate) fn normalize_buckets(
    buckets: ReservationBuckets,
    sequencer: &mut BookingSequencer,
    now: DateTime<Utc>,
) -> ReservationStore {
    let mut store = ReservationStore::new();
    let mut unassigned: Vec<(TableNumber, ReservationId)> = Vec::new();

    for (key, records) in buckets {
        let Ok(number) = key.trim().parse::<u32>() else {
            tracing::warn!(key = %key, "Skipping bucket with non-numeric table key");
            continue;
        };
        let table = TableNumber::new(number);
        store.ensure_bucket(table);

        for record in records {
            let name = record.name.trim();
            if name.is_empty() || record.cards == 0 {
                tracing::warn!(table = %table, cards = record.cards, "Skipping empty reservation");
                continue;
            }
            let booking_id = record
                .booking_id
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(BookingId::new);
            let timestamp = record
                .ts
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map_or(now, |ts| ts.with_timezone(&Utc));

            let mut reservation = Reservation::new(
                booking_id.clone().unwrap_or_else(|| BookingId::new("")),
                name,
                record.cards,
                record.notes,
                timestamp,
            );
            if let Some(id) = record.id.filter(|id| !id.is_empty()) {
                reservation.id = ReservationId::from_string(id);
            }
            reservation.state = if record.sold {
                ReservationState::Sold
            } else if record.in_cart {
                ReservationState::InCart
            } else {
                ReservationState::Available
            };
            if booking_id.is_none() {
                unassigned.push((table, reservation.id.clone()));
            }
            store.push(table, reservation);
        }
    }

    sequencer.resync_from(&store);
    for (table, id) in unassigned {
        let booking_id = sequencer.next();
        if let Some(reservation) = store.get_mut(table, &id) {
            tracing::debug!(table = %table, booking_id = %booking_id, "Assigned booking id");
            reservation.booking_id = booking_id;
        }
    }
    store
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

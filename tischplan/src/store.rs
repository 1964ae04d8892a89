//! Reservation store: per-table buckets of reservation records.
//!
//! Buckets are keyed in a `BTreeMap`, so every iteration visits tables in
//! ascending number order.

use crate::types::{BookingId, Reservation, ReservationId, TableNumber};
use std::collections::BTreeMap;

/// Reservation records grouped by the table that owns them
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReservationStore {
    buckets: BTreeMap<TableNumber, Vec<Reservation>>,
}

impl ReservationStore {
    /// Creates an empty store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    /// Make sure a (possibly empty) bucket exists for the table
    pub fn ensure_bucket(&mut self, table: TableNumber) {
        self.buckets.entry(table).or_default();
    }

    /// Records on a table; empty if the table has no bucket
    #[must_use]
    pub fn bucket(&self, table: TableNumber) -> &[Reservation] {
        self.buckets.get(&table).map_or(&[], Vec::as_slice)
    }

    /// Tables that have a bucket, ascending
    pub fn table_numbers(&self) -> impl Iterator<Item = TableNumber> + '_ {
        self.buckets.keys().copied()
    }

    /// Append a record to a table's bucket
    pub fn push(&mut self, table: TableNumber, reservation: Reservation) {
        self.buckets.entry(table).or_default().push(reservation);
    }

    /// Find a record on a specific table
    #[must_use]
    pub fn find(&self, table: TableNumber, id: &ReservationId) -> Option<&Reservation> {
        self.bucket(table).iter().find(|r| &r.id == id)
    }

    /// Mutable access to a record on a specific table
    pub fn get_mut(&mut self, table: TableNumber, id: &ReservationId) -> Option<&mut Reservation> {
        self.buckets
            .get_mut(&table)
            .and_then(|bucket| bucket.iter_mut().find(|r| &r.id == id))
    }

    /// Find a record anywhere, with the table that owns it
    #[must_use]
    pub fn locate(&self, id: &ReservationId) -> Option<(TableNumber, &Reservation)> {
        self.iter().find(|(_, r)| &r.id == id)
    }

    /// Remove a record from a table's bucket
    pub fn remove(&mut self, table: TableNumber, id: &ReservationId) -> Option<Reservation> {
        let bucket = self.buckets.get_mut(&table)?;
        let index = bucket.iter().position(|r| &r.id == id)?;
        Some(bucket.remove(index))
    }

    /// Replace a table's bucket, pruning records with zero cards
    pub fn replace_bucket(&mut self, table: TableNumber, mut records: Vec<Reservation>) {
        records.retain(|r| r.cards > 0);
        self.buckets.insert(table, records);
    }

    /// Drop a table's bucket, returning its records
    pub fn remove_bucket(&mut self, table: TableNumber) -> Vec<Reservation> {
        self.buckets.remove(&table).unwrap_or_default()
    }

    /// Sum of cards booked on a table
    #[must_use]
    pub fn reserved_cards(&self, table: TableNumber) -> u64 {
        self.bucket(table).iter().map(|r| u64::from(r.cards)).sum()
    }

    /// Every record with its table, tables ascending, bucket order within
    pub fn iter(&self) -> impl Iterator<Item = (TableNumber, &Reservation)> + '_ {
        self.buckets
            .iter()
            .flat_map(|(table, bucket)| bucket.iter().map(move |r| (*table, r)))
    }

    /// Mutable iteration over every record with its table
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (TableNumber, &mut Reservation)> + '_ {
        self.buckets
            .iter_mut()
            .flat_map(|(table, bucket)| bucket.iter_mut().map(move |r| (*table, r)))
    }

    /// All records of one booking group
    pub fn booking_group<'a>(
        &'a self,
        booking_id: &BookingId,
    ) -> impl Iterator<Item = (TableNumber, &'a Reservation)> + use<'a> {
        let booking_id = booking_id.clone();
        self.iter().filter(move |(_, r)| r.booking_id == booking_id)
    }

    /// Case-insensitive search over name, booking id and notes
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<(TableNumber, &Reservation)> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.iter()
            .filter(|(_, r)| {
                r.name.to_lowercase().contains(&needle)
                    || r.booking_id.as_str().to_lowercase().contains(&needle)
                    || r.notes.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Total number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Returns true when no table holds a record
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tischplan_core::environment::Clock;
    use tischplan_testing::test_clock;

    fn record(booking: &str, name: &str, cards: u32) -> Reservation {
        Reservation::new(BookingId::new(booking), name, cards, "", test_clock().now())
    }

    #[test]
    fn test_iteration_is_numeric() {
        let mut store = ReservationStore::new();
        store.push(TableNumber::new(10), record("001", "A", 1));
        store.push(TableNumber::new(2), record("002", "B", 1));
        store.push(TableNumber::STANDING, record("003", "C", 1));

        let tables: Vec<u32> = store.iter().map(|(t, _)| t.value()).collect();
        assert_eq!(tables, vec![0, 2, 10]);
    }

    #[test]
    fn test_replace_bucket_prunes_empty_records() {
        let mut store = ReservationStore::new();
        let kept = record("001", "A", 3);
        let emptied = record("001", "B", 0);
        store.replace_bucket(TableNumber::new(1), vec![kept.clone(), emptied]);

        assert_eq!(store.bucket(TableNumber::new(1)), &[kept]);
        assert_eq!(store.reserved_cards(TableNumber::new(1)), 3);
    }

    #[test]
    fn test_locate_and_remove() {
        let mut store = ReservationStore::new();
        let r = record("004", "Maier", 2);
        let id = r.id.clone();
        store.push(TableNumber::new(7), r);

        assert_eq!(store.locate(&id).map(|(t, _)| t), Some(TableNumber::new(7)));
        assert!(store.remove(TableNumber::new(6), &id).is_none());
        assert_eq!(store.remove(TableNumber::new(7), &id).map(|r| r.cards), Some(2));
        assert!(store.is_empty());
    }

    #[test]
    fn test_booking_group_outlives_the_queried_id() {
        let mut store = ReservationStore::new();
        store.push(TableNumber::new(3), record("021", "Huber", 4));
        store.push(TableNumber::new(1), record("021", "Huber", 2));
        store.push(TableNumber::new(2), record("022", "Maier", 5));

        let group: Vec<(TableNumber, &Reservation)> = {
            let booking = BookingId::new("021");
            store.booking_group(&booking).collect()
        };

        let tables: Vec<u32> = group.iter().map(|(t, _)| t.value()).collect();
        assert_eq!(tables, vec![1, 3]);
        assert_eq!(group.iter().map(|(_, r)| r.cards).sum::<u32>(), 6);
    }

    #[test]
    fn test_search_matches_name_booking_and_notes() {
        let mut store = ReservationStore::new();
        store.push(TableNumber::new(1), record("011", "Familie Huber", 4));
        let mut noted = record("012", "Gruber", 2);
        noted.notes = "Rollstuhl".to_string();
        store.push(TableNumber::new(2), noted);

        assert_eq!(store.search("huber").len(), 1);
        assert_eq!(store.search("012").len(), 1);
        assert_eq!(store.search("ROLLSTUHL").len(), 1);
        assert!(store.search("   ").is_empty());
    }
}

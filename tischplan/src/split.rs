//! Split locator: fragments of one booking on other tables.

use crate::store::ReservationStore;
use crate::types::{BookingId, Reservation, ReservationId, TableNumber};
use serde::Serialize;

/// One fragment of a booking group on another table
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplitFragment {
    /// Table holding the fragment
    pub table: TableNumber,
    /// Cards in the fragment
    pub cards: u32,
    /// Record id of the fragment
    pub reservation_id: ReservationId,
}

/// Every record of `booking_id` on tables other than `exclude`, tables ascending
#[must_use]
pub fn find_split_fragments(
    store: &ReservationStore,
    booking_id: &BookingId,
    exclude: TableNumber,
) -> Vec<SplitFragment> {
    find_split_fragments_with(store, &[], booking_id, exclude)
}

/// Like [`find_split_fragments`], with some buckets replaced by simulated ones
///
/// Used to annotate a transfer preview before anything is committed.
#[must_use]
pub fn find_split_fragments_with(
    store: &ReservationStore,
    overrides: &[(TableNumber, &[Reservation])],
    booking_id: &BookingId,
    exclude: TableNumber,
) -> Vec<SplitFragment> {
    let mut tables: Vec<TableNumber> = store
        .table_numbers()
        .chain(overrides.iter().map(|(t, _)| *t))
        .collect();
    tables.sort_unstable();
    tables.dedup();

    tables
        .into_iter()
        .filter(|table| *table != exclude)
        .flat_map(move |table| {
            let bucket = overrides
                .iter()
                .find(|(t, _)| *t == table)
                .map_or_else(|| store.bucket(table), |(_, records)| *records);
            bucket
                .iter()
                .filter(move |r| &r.booking_id == booking_id)
                .map(move |r| SplitFragment {
                    table,
                    cards: r.cards,
                    reservation_id: r.id.clone(),
                })
        })
        .collect()
}

/// "Weitere Plätze: Tisch 3 (4), Stehplätze (2)", or `None` when not split
#[must_use]
pub fn split_info_text(fragments: &[SplitFragment]) -> Option<String> {
    if fragments.is_empty() {
        return None;
    }
    let parts: Vec<String> = fragments
        .iter()
        .map(|f| format!("{} ({})", f.table.label(), f.cards))
        .collect();
    Some(format!("Weitere Plätze: {}", parts.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tischplan_core::environment::Clock;
    use tischplan_testing::test_clock;

    fn record(booking: &str, cards: u32) -> Reservation {
        Reservation::new(BookingId::new(booking), "Huber", cards, "", test_clock().now())
    }

    fn store() -> ReservationStore {
        let mut store = ReservationStore::new();
        store.push(TableNumber::new(12), record("005", 2));
        store.push(TableNumber::new(3), record("005", 4));
        store.push(TableNumber::new(3), record("006", 1));
        store.push(TableNumber::STANDING, record("005", 2));
        store
    }

    #[test]
    fn test_fragments_in_numeric_order_excluding_current() {
        let fragments = find_split_fragments(&store(), &BookingId::new("005"), TableNumber::new(12));
        let seen: Vec<(u32, u32)> = fragments.iter().map(|f| (f.table.value(), f.cards)).collect();
        assert_eq!(seen, vec![(0, 2), (3, 4)]);
    }

    #[test]
    fn test_unsplit_booking_has_no_annotation() {
        let fragments = find_split_fragments(&store(), &BookingId::new("006"), TableNumber::new(3));
        assert!(fragments.is_empty());
        assert_eq!(split_info_text(&fragments), None);
    }

    #[test]
    fn test_info_text_labels_standing_area() {
        let fragments = find_split_fragments(&store(), &BookingId::new("005"), TableNumber::new(12));
        assert_eq!(
            split_info_text(&fragments).as_deref(),
            Some("Weitere Plätze: Stehplätze (2), Tisch 3 (4)")
        );
    }

    #[test]
    fn test_overrides_replace_live_buckets() {
        let simulated = vec![record("005", 6)];
        let fragments = find_split_fragments_with(
            &store(),
            &[(TableNumber::new(3), simulated.as_slice()), (TableNumber::new(9), &[])],
            &BookingId::new("005"),
            TableNumber::new(12),
        );
        let seen: Vec<(u32, u32)> = fragments.iter().map(|f| (f.table.value(), f.cards)).collect();
        assert_eq!(seen, vec![(0, 2), (3, 6)]);
    }
}

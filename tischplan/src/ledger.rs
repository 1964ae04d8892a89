//! Table capacity ledger.
//!
//! Free seats and capacity per table, plus the two orderings the engine
//! relies on: by number, and by free seats descending with the standing
//! area always last.

use crate::error::SeatingError;
use crate::types::{AisleNeighbor, Position, Table, TableNumber};
use std::collections::HashMap;

/// Capacity used when the plan has no tables to infer one from
pub const DEFAULT_TABLE_CAPACITY: u32 = 18;

/// Ordered collection of tables, unique by number
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableLedger {
    tables: Vec<Table>,
}

impl TableLedger {
    /// Creates an empty ledger
    #[must_use]
    pub const fn new() -> Self {
        Self { tables: Vec::new() }
    }

    /// Build a ledger from tables, sorted by number
    ///
    /// # Errors
    ///
    /// - [`SeatingError::TableExists`] on duplicate numbers
    /// - [`SeatingError::FreeSeatsExceedCapacity`] if a table has more free seats than capacity
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Result<Self, SeatingError> {
        let mut ledger = Self::new();
        for table in tables {
            ledger.add_table(table)?;
        }
        Ok(ledger)
    }

    /// All tables in current order
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Number of tables
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true when there are no tables
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns true if the table exists
    #[must_use]
    pub fn contains(&self, number: TableNumber) -> bool {
        self.get(number).is_some()
    }

    /// Look up a table
    #[must_use]
    pub fn get(&self, number: TableNumber) -> Option<&Table> {
        self.tables.iter().find(|t| t.number == number)
    }

    fn get_mut(&mut self, number: TableNumber) -> Result<&mut Table, SeatingError> {
        self.tables
            .iter_mut()
            .find(|t| t.number == number)
            .ok_or(SeatingError::TableNotFound(number))
    }

    /// Free seats of a table, `None` if it does not exist
    #[must_use]
    pub fn get_free(&self, number: TableNumber) -> Option<u32> {
        self.get(number).map(|t| t.free_seats)
    }

    /// Overwrite the free seats of a table
    ///
    /// # Errors
    ///
    /// - [`SeatingError::TableNotFound`] if the table does not exist
    /// - [`SeatingError::FreeSeatsExceedCapacity`] if `value` is larger than the capacity
    pub fn set_free(&mut self, number: TableNumber, value: u32) -> Result<(), SeatingError> {
        let table = self.get_mut(number)?;
        if value > table.capacity {
            return Err(SeatingError::FreeSeatsExceedCapacity {
                table: number,
                free: value,
                capacity: table.capacity,
            });
        }
        table.free_seats = value;
        Ok(())
    }

    /// Occupy `seats` free seats
    ///
    /// # Errors
    ///
    /// - [`SeatingError::TableNotFound`] if the table does not exist
    /// - [`SeatingError::InsufficientFreeSeats`] if fewer seats are free
    pub fn take(&mut self, number: TableNumber, seats: u32) -> Result<(), SeatingError> {
        let table = self.get_mut(number)?;
        let Some(free) = table.free_seats.checked_sub(seats) else {
            return Err(SeatingError::InsufficientFreeSeats {
                table: number,
                requested: seats,
                available: table.free_seats,
            });
        };
        table.free_seats = free;
        Ok(())
    }

    /// Give `seats` back to the table
    ///
    /// # Errors
    ///
    /// - [`SeatingError::TableNotFound`] if the table does not exist
    /// - [`SeatingError::FreeSeatsExceedCapacity`] if more seats would be free than exist
    pub fn release(&mut self, number: TableNumber, seats: u32) -> Result<(), SeatingError> {
        let table = self.get_mut(number)?;
        let free = table.free_seats.saturating_add(seats);
        if free > table.capacity {
            return Err(SeatingError::FreeSeatsExceedCapacity {
                table: number,
                free,
                capacity: table.capacity,
            });
        }
        table.free_seats = free;
        Ok(())
    }

    /// Sort tables by ascending number
    pub fn sort_by_number(&mut self) {
        self.tables.sort_by_key(|t| t.number);
    }

    /// Sort by free seats descending, then move the standing area to the end
    ///
    /// Both passes are stable, so tables with equal free seats keep their
    /// relative order.
    pub fn sort_by_free_descending_standing_last(&mut self) {
        self.tables.sort_by(|a, b| b.free_seats.cmp(&a.free_seats));
        self.tables.sort_by_key(|t| t.number.is_standing());
    }

    /// Total free seats across all tables
    #[must_use]
    pub fn total_free(&self) -> u64 {
        self.tables.iter().map(|t| u64::from(t.free_seats)).sum()
    }

    /// Total capacity across all tables
    #[must_use]
    pub fn total_capacity(&self) -> u64 {
        self.tables.iter().map(|t| u64::from(t.capacity)).sum()
    }

    /// Insert a table, keeping the ledger sorted by number
    ///
    /// # Errors
    ///
    /// - [`SeatingError::TableExists`] if the number is taken
    /// - [`SeatingError::FreeSeatsExceedCapacity`] if `free_seats > capacity`
    pub fn add_table(&mut self, table: Table) -> Result<(), SeatingError> {
        if self.contains(table.number) {
            return Err(SeatingError::TableExists(table.number));
        }
        if table.free_seats > table.capacity {
            return Err(SeatingError::FreeSeatsExceedCapacity {
                table: table.number,
                free: table.free_seats,
                capacity: table.capacity,
            });
        }
        self.tables.push(table);
        self.sort_by_number();
        Ok(())
    }

    /// Remove a table
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::TableNotFound`] if the table does not exist.
    pub fn remove_table(&mut self, number: TableNumber) -> Result<Table, SeatingError> {
        let index = self
            .tables
            .iter()
            .position(|t| t.number == number)
            .ok_or(SeatingError::TableNotFound(number))?;
        Ok(self.tables.remove(index))
    }

    /// Highest table number in use
    #[must_use]
    pub fn highest_number(&self) -> Option<TableNumber> {
        self.tables.iter().map(|t| t.number).max()
    }

    /// Smallest positive number not used by any table (gaps are filled)
    #[must_use]
    pub fn next_free_number(&self) -> TableNumber {
        let mut candidate = 1;
        while self.contains(TableNumber::new(candidate)) {
            candidate += 1;
        }
        TableNumber::new(candidate)
    }

    /// Most frequent capacity in number order; first seen wins ties
    #[must_use]
    pub fn most_common_capacity(&self) -> u32 {
        let mut ordered: Vec<&Table> = self.tables.iter().collect();
        ordered.sort_by_key(|t| t.number);

        let mut counts: HashMap<u32, usize> = HashMap::new();
        let mut first_seen: Vec<u32> = Vec::new();
        for table in ordered {
            let count = counts.entry(table.capacity).or_insert(0);
            if *count == 0 {
                first_seen.push(table.capacity);
            }
            *count += 1;
        }

        let mut best = DEFAULT_TABLE_CAPACITY;
        let mut best_count = 0;
        for capacity in first_seen {
            let count = counts.get(&capacity).copied().unwrap_or(0);
            if count > best_count {
                best = capacity;
                best_count = count;
            }
        }
        best
    }

    /// Change capacity, position and aisle of a table
    ///
    /// Free seats shift by the capacity delta so booked seats stay booked.
    ///
    /// # Errors
    ///
    /// - [`SeatingError::TableNotFound`] if the table does not exist
    /// - [`SeatingError::CapacityBelowBooked`] if `capacity` is less than the booked seats
    pub fn reconfigure(
        &mut self,
        number: TableNumber,
        capacity: u32,
        position: Position,
        aisle_neighbor: Option<AisleNeighbor>,
    ) -> Result<(), SeatingError> {
        let table = self.get_mut(number)?;
        let booked = table.booked();
        if capacity < booked {
            return Err(SeatingError::CapacityBelowBooked {
                table: number,
                capacity,
                booked,
            });
        }
        table.capacity = capacity;
        table.free_seats = capacity - booked;
        table.position = position;
        table.aisle_neighbor = aisle_neighbor;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table(number: u32, capacity: u32, free: u32) -> Table {
        let mut t = Table::new(TableNumber::new(number), capacity, Position::Middle);
        t.free_seats = free;
        t
    }

    fn order(ledger: &TableLedger) -> Vec<u32> {
        ledger.tables().iter().map(|t| t.number.value()).collect()
    }

    #[test]
    fn test_standing_last_even_with_most_free_seats() {
        let mut ledger = TableLedger::from_tables([
            table(0, 76, 76),
            table(1, 18, 5),
            table(2, 24, 24),
            table(3, 18, 18),
            table(4, 18, 18),
        ])
        .unwrap();

        ledger.sort_by_free_descending_standing_last();
        assert_eq!(order(&ledger), vec![2, 3, 4, 1, 0]);

        ledger.sort_by_number();
        assert_eq!(order(&ledger), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_take_and_release_respect_bounds() {
        let mut ledger = TableLedger::from_tables([table(1, 18, 4)]).unwrap();
        let one = TableNumber::new(1);

        assert!(matches!(
            ledger.take(one, 5),
            Err(SeatingError::InsufficientFreeSeats { requested: 5, available: 4, .. })
        ));
        ledger.take(one, 4).unwrap();
        assert_eq!(ledger.get_free(one), Some(0));

        ledger.release(one, 18).unwrap();
        assert!(matches!(
            ledger.release(one, 1),
            Err(SeatingError::FreeSeatsExceedCapacity { free: 19, capacity: 18, .. })
        ));
    }

    #[test]
    fn test_set_free_unknown_table() {
        let mut ledger = TableLedger::new();
        assert!(matches!(
            ledger.set_free(TableNumber::new(9), 1),
            Err(SeatingError::TableNotFound(_))
        ));
        assert_eq!(ledger.get_free(TableNumber::new(9)), None);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let result = TableLedger::from_tables([table(1, 18, 18), table(1, 24, 24)]);
        assert!(matches!(result, Err(SeatingError::TableExists(_))));
    }

    #[test]
    fn test_next_free_number_fills_gaps() {
        let ledger =
            TableLedger::from_tables([table(0, 76, 76), table(1, 18, 18), table(3, 18, 18)])
                .unwrap();
        assert_eq!(ledger.next_free_number(), TableNumber::new(2));
        assert_eq!(TableLedger::new().next_free_number(), TableNumber::new(1));
    }

    #[test]
    fn test_most_common_capacity() {
        assert_eq!(TableLedger::new().most_common_capacity(), DEFAULT_TABLE_CAPACITY);

        let ledger = TableLedger::from_tables([
            table(0, 76, 76),
            table(1, 24, 24),
            table(2, 12, 12),
            table(3, 24, 24),
            table(4, 12, 12),
        ])
        .unwrap();
        // 24 and 12 tie; 24 was seen first
        assert_eq!(ledger.most_common_capacity(), 24);
    }

    #[test]
    fn test_reconfigure_keeps_booked_seats() {
        let mut ledger = TableLedger::from_tables([table(5, 18, 10)]).unwrap();
        let five = TableNumber::new(5);

        ledger
            .reconfigure(five, 24, Position::Left, Some(AisleNeighbor::Links))
            .unwrap();
        let t = ledger.get(five).unwrap();
        assert_eq!((t.capacity, t.free_seats, t.booked()), (24, 16, 8));
        assert_eq!(t.aisle_neighbor, Some(AisleNeighbor::Links));

        assert!(matches!(
            ledger.reconfigure(five, 7, Position::Left, None),
            Err(SeatingError::CapacityBelowBooked { capacity: 7, booked: 8, .. })
        ));
    }
}

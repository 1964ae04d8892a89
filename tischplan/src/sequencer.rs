//! Booking sequencer.

use crate::store::ReservationStore;
use crate::types::BookingId;

/// Monotonic source of booking ids for one event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BookingSequencer {
    last: u64,
}

impl BookingSequencer {
    /// Fresh sequencer; the first id issued is `"001"`
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Restore a persisted `lastBookingSeq`
    #[must_use]
    pub const fn starting_at(last: u64) -> Self {
        Self { last }
    }

    /// Last value handed out
    #[must_use]
    pub const fn last(&self) -> u64 {
        self.last
    }

    /// Increment and return the next booking id
    pub fn next(&mut self) -> BookingId {
        self.last = self.last.saturating_add(1);
        BookingId::from_sequence(self.last)
    }

    /// Raise the counter to the highest numeric booking id in `store`
    ///
    /// Never lowers the counter. Non-numeric ids are ignored.
    pub fn resync_from(&mut self, store: &ReservationStore) {
        let highest = store
            .iter()
            .filter_map(|(_, r)| r.booking_id.sequence_value())
            .max()
            .unwrap_or(0);
        if highest > self.last {
            tracing::debug!(from = self.last, to = highest, "Booking sequence resynced");
            self.last = highest;
        }
    }
}

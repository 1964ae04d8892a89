//! # Tischplan Testing
//!
//! Testing utilities for reducers built on `tischplan-core`.
//!
//! This crate provides:
//! - Deterministic clocks for the `Clock` environment trait
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Assertion helpers for returned effects
//!
//! ## Example
//!
//! ```ignore
//! use tischplan_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(PlanReducer::new())
//!     .with_env(PlanEnvironment::new(Arc::new(test_clock()), Arc::new(NoopBroadcaster)))
//!     .given_state(PlanState::new(plan))
//!     .when_action(PlanAction::AddNextTable)
//!     .then_state(|s| assert_eq!(s.revision, 1))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use tischplan_core::environment::Clock;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use tischplan_testing::mocks::FixedClock;
    /// use tischplan_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test advances it
    ///
    /// Clones share the same underlying time.
    ///
    /// ```
    /// use tischplan_testing::mocks::ManualClock;
    /// use tischplan_core::environment::Clock;
    ///
    /// let clock = ManualClock::new(tischplan_testing::test_clock().now());
    /// let before = clock.now();
    /// clock.advance_secs(90);
    /// assert_eq!((clock.now() - before).num_seconds(), 90);
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        millis: Arc<AtomicI64>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `start`
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
            }
        }

        /// Move the clock forward
        pub fn advance_secs(&self, seconds: i64) {
            self.millis
                .fetch_add(seconds.saturating_mul(1000), Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::TimeDelta::seconds(1_735_689_600))
    }
}

pub use mocks::{test_clock, FixedClock, ManualClock};
pub use reducer_test::{assertions, ReducerTest};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(test_clock().now());
        let other = clock.clone();
        clock.advance_secs(5);
        assert_eq!(other.now(), clock.now());
        assert_eq!((other.now() - test_clock().now()).num_seconds(), 5);
    }
}

//! # Soulbound Testing
//!
//! Testing utilities for the soulbound credential engine.
//!
//! This crate provides:
//! - Mock implementations of Environment traits ([`FixedClock`])
//! - A Given-When-Then builder for reducers ([`ReducerTest`])
//! - proptest strategies for log entries ([`properties`])
//!
//! ## Example
//!
//! ```
//! use soulbound_core::environment::Clock;
//! use soulbound_testing::test_clock;
//!
//! let clock = test_clock();
//! let later = clock.advanced_by_millis(250);
//! assert!(later.now() > clock.now());
//! ```

use chrono::{DateTime, Utc};
use soulbound_core::environment::Clock;


/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use soulbound_testing::mocks::FixedClock;
    /// use soulbound_core::environment::Clock;
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

        /// A clock fixed `millis` milliseconds after this one.
        #[must_use]
        pub fn advanced_by_millis(&self, millis: i64) -> Self {
            Self::new(self.time + chrono::Duration::milliseconds(millis))
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use soulbound_core::event::SerializedEvent;

    /// Arbitrary log entries with short type names and small payloads.
    pub fn arb_serialized_event() -> impl Strategy<Value = SerializedEvent> {
        (
            "[A-Z][a-z]{0,8}\\.v1",
            proptest::collection::vec(any::<u8>(), 0..32),
        )
            .prop_map(|(event_type, data)| SerializedEvent::new(event_type, data, None))
    }

    /// A non-empty batch of entries plus a split index inside it (inclusive of both ends).
    pub fn arb_split_batch(
        max_len: usize,
    ) -> impl Strategy<Value = (Vec<SerializedEvent>, usize)> {
        proptest::collection::vec(arb_serialized_event(), 1..=max_len.max(1)).prop_flat_map(
            |batch| {
                let len = batch.len();
                (Just(batch), 0..=len)
            },
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::ReducerTest;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn advanced_clock_moves_forward() {
        let clock = test_clock();
        let later = clock.advanced_by_millis(1_500);
        assert_eq!(
            (later.now() - clock.now()).num_milliseconds(),
            1_500
        );
    }
}

//! # Bus Booking Testing
//!
//! Testing utilities for the bus booking session.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`FixedClock`]: deterministic time
//! - [`MockBookingApi`]: in-memory booking API with a call log and reply gates
//! - proptest strategies for identifiers
//!
//! ## Example
//!
//! ```ignore
//! use bus_booking_testing::{test_clock, MockBookingApi};
//!
//! #[tokio::test]
//! async fn test_booking_flow() {
//!     let api = MockBookingApi::new().with_bus("BUS001", 40, &["S01", "S02"]);
//!     let session = BookingSession::with_clock(Arc::new(api.clone()), Arc::new(test_clock()));
//!
//!     session.select_bus("BUS001").await.unwrap();
//!     session.select_seat("S01").await.unwrap();
//!     session.submit_booking("John Doe").await.unwrap();
//!
//!     assert_eq!(api.tickets().len(), 1);
//! }
//! ```

use bus_booking_core::effect::Effect;
use bus_booking_core::environment::Clock;
use chrono::{DateTime, Utc};

mod booking_mocks;

pub use booking_mocks::{ApiCall, MockBookingApi, SeatMapGate};
pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use bus_booking_testing::mocks::FixedClock;
    /// use bus_booking_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
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

/// Test helpers and utilities
pub mod helpers {
    use super::Effect;

    /// Install a `tracing` subscriber that writes through the test harness
    ///
    /// Honors `RUST_LOG`; safe to call from every test.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }

    /// Run effects the way the store would and collect the actions they produce
    ///
    /// Effects run one after another, `Parallel` children in order. Lets
    /// reducer tests check what an effect feeds back without a store.
    pub async fn resolve_effects<A, I>(effects: I) -> Vec<A>
    where
        I: IntoIterator<Item = Effect<A>>,
    {
        let mut pending: Vec<Effect<A>> = effects.into_iter().collect();
        pending.reverse();

        let mut actions = Vec::new();
        while let Some(effect) = pending.pop() {
            match effect {
                Effect::None => {},
                Effect::Parallel(children) => pending.extend(children.into_iter().rev()),
                Effect::Future(fut) => {
                    if let Some(action) = fut.await {
                        actions.push(action);
                    }
                },
            }
        }
        actions
    }
}

/// Property-based testing utilities
///
/// proptest strategies for identifiers in their wire format.
pub mod properties {
    use proptest::prelude::*;

    /// Any valid bus id, `BUS000` to `BUS999`
    pub fn bus_id() -> impl Strategy<Value = String> {
        (0u16..=999).prop_map(|n| format!("BUS{n:03}"))
    }

    /// Any valid seat id, `S01` to `S40`
    pub fn seat_id() -> impl Strategy<Value = String> {
        (1u8..=40).prop_map(|n| format!("S{n:02}"))
    }

    /// Passenger names that pass validation (at least two characters once trimmed)
    pub fn passenger_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z .'-]{0,30}[A-Za-z]"
    }
}

// Re-export commonly used items
pub use helpers::{init_test_tracing, resolve_effects};
pub use mocks::{test_clock, FixedClock};

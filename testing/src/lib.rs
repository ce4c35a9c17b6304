//! # Ticketbook Testing
//!
//! Testing utilities and helpers for the Ticketbook engine.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `MockClock`)
//! - Recording observers that capture outcomes and notices
//! - A Given-When-Then harness for operations
//!
//! ## Example
//!
//! ```ignore
//! use ticketbook_testing::{MockClock, RecordingSink, OperationTest};
//!
//! OperationTest::new(BookEvent { event_number, tickets: 1 })
//!     .with_env(test_environment())
//!     .given_state(state_with_event())
//!     .then_output(|booking| assert_eq!(booking.tickets, 1))
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, PoisonError, RwLock};
use ticketbook_core::effect::Notice;
use ticketbook_core::environment::{Clock, Notifier, ResultSink};
use ticketbook_core::outcome::Context;

/// Given-When-Then harness for operations
pub mod operation_test;

pub use operation_test::{assertions, OperationTest};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Duration, PoisonError, RwLock, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketbook_testing::mocks::FixedClock;
    /// use ticketbook_core::environment::Clock;
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

    /// Clock that tests can move forward (or set) between operations.
    ///
    /// # Example
    ///
    /// ```
    /// use ticketbook_testing::mocks::{test_clock, MockClock};
    /// use ticketbook_core::environment::Clock;
    /// use chrono::Duration;
    ///
    /// let clock = MockClock::new(test_clock().now());
    /// let before = clock.now();
    /// clock.advance(Duration::hours(3));
    /// assert_eq!(clock.now() - before, Duration::hours(3));
    /// ```
    #[derive(Debug)]
    pub struct MockClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl MockClock {
        /// Create a mock clock starting at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

/// Recording observers.
pub mod recording {
    use super::{Context, Mutex, Notice, Notifier, PoisonError, ResultSink};

    /// Whether a recorded outcome was a success or a failure
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum OutcomeKind {
        /// Success report
        Success,
        /// Failure report
        Failure,
    }

    /// One captured report
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedOutcome {
        /// Success or failure
        pub kind: OutcomeKind,
        /// Operation name
        pub operation: &'static str,
        /// Outcome tag
        pub outcome: &'static str,
        /// Reported context
        pub context: Context,
    }

    /// Result sink that keeps every report in order.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        records: Mutex<Vec<RecordedOutcome>>,
    }

    impl RecordingSink {
        /// Create an empty sink
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        fn push(&self, record: RecordedOutcome) {
            self.records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(record);
        }

        /// All captured reports in order
        #[must_use]
        pub fn records(&self) -> Vec<RecordedOutcome> {
            self.records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Outcome tags in order
        #[must_use]
        pub fn outcomes(&self) -> Vec<&'static str> {
            self.records().into_iter().map(|r| r.outcome).collect()
        }

        /// Failure reports only
        #[must_use]
        pub fn failures(&self) -> Vec<RecordedOutcome> {
            self.records()
                .into_iter()
                .filter(|r| r.kind == OutcomeKind::Failure)
                .collect()
        }

        /// Most recent report
        #[must_use]
        pub fn last(&self) -> Option<RecordedOutcome> {
            self.records().pop()
        }

        /// Forget everything captured so far
        pub fn clear(&self) {
            self.records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }

    impl ResultSink for RecordingSink {
        fn report_success(&self, operation: &'static str, outcome: &'static str, context: &Context) {
            self.push(RecordedOutcome {
                kind: OutcomeKind::Success,
                operation,
                outcome,
                context: context.clone(),
            });
        }

        fn report_failure(&self, operation: &'static str, outcome: &'static str, context: &Context) {
            self.push(RecordedOutcome {
                kind: OutcomeKind::Failure,
                operation,
                outcome,
                context: context.clone(),
            });
        }
    }

    /// Notifier that keeps every notice in order.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        notices: Mutex<Vec<Notice>>,
    }

    impl RecordingNotifier {
        /// Create an empty notifier
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All captured notices in order
        #[must_use]
        pub fn notices(&self) -> Vec<Notice> {
            self.notices
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: &Notice) {
            self.notices
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(notice.clone());
        }
    }
}

/// Install a compact `tracing` subscriber for test output.
///
/// Safe to call from many tests; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .try_init();
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, MockClock};
pub use recording::{OutcomeKind, RecordedOutcome, RecordingNotifier, RecordingSink};

//! Ergonomic testing utilities for operations
//!
//! This module provides a fluent API for testing operations with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // OperationTest is the natural name

use crate::recording::{RecordingNotifier, RecordingSink};
use ticketbook_core::operation::{dispatch, Operation};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for result assertion functions
type ResultAssertion<T, E> = Box<dyn FnOnce(&Result<T, E>)>;

/// Type alias for sink assertion functions
type SinkAssertion = Box<dyn FnOnce(&RecordingSink, &RecordingNotifier)>;

/// Fluent API for testing operations with Given-When-Then syntax
///
/// The operation is dispatched through the real executor with recording
/// observers, so outcome tags and notices can be asserted alongside state.
///
/// # Example
///
/// ```ignore
/// use ticketbook_testing::OperationTest;
///
/// OperationTest::new(CancelBooking { booking_number })
///     .with_env(test_environment())
///     .given_state(state_with_booking())
///     .then_error(|error| assert_eq!(error.code(), "CANCEL_BOOKING_BOOKING_NOT_ACTIVE"))
///     .then_state(|state| assert_eq!(state.bookings.len(), 1))
///     .run();
/// ```
pub struct OperationTest<O: Operation> {
    operation: O,
    environment: Option<O::Environment>,
    initial_state: Option<O::State>,
    result_assertions: Vec<ResultAssertion<O::Output, O::Error>>,
    state_assertions: Vec<StateAssertion<O::State>>,
    sink_assertions: Vec<SinkAssertion>,
}

impl<O> OperationTest<O>
where
    O: Operation,
    O::Output: std::fmt::Debug + 'static,
    O::Error: std::fmt::Debug + 'static,
    O::State: 'static,
{
    /// Create a new operation test (When)
    #[must_use]
    pub const fn new(operation: O) -> Self {
        Self {
            operation,
            environment: None,
            initial_state: None,
            result_assertions: Vec::new(),
            state_assertions: Vec::new(),
            sink_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: O::Environment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: O::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Assert on the successful output (Then)
    ///
    /// The assertion panics if the operation was rejected.
    #[must_use]
    #[allow(clippy::panic)] // Test assertion
    pub fn then_output<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&O::Output) + 'static,
    {
        self.result_assertions.push(Box::new(move |result| match result {
            Ok(output) => assertion(output),
            Err(error) => panic!("Expected success, but operation was rejected: {error:?}"),
        }));
        self
    }

    /// Assert on the rejection (Then)
    ///
    /// The assertion panics if the operation succeeded.
    #[must_use]
    #[allow(clippy::panic)] // Test assertion
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&O::Error) + 'static,
    {
        self.result_assertions.push(Box::new(move |result| match result {
            Ok(output) => panic!("Expected rejection, but operation succeeded: {output:?}"),
            Err(error) => assertion(error),
        }));
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&O::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Assert the ordered list of reported outcome tags (Then)
    #[must_use]
    pub fn then_outcomes(mut self, expected: &'static [&'static str]) -> Self {
        self.sink_assertions.push(Box::new(move |sink, _| {
            assertions::assert_outcomes(sink, expected);
        }));
        self
    }

    /// Add an assertion about the captured notices (Then)
    #[must_use]
    pub fn then_notices<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[ticketbook_core::effect::Notice]) + 'static,
    {
        self.sink_assertions.push(Box::new(move |_, notifier| {
            assertion(&notifier.notices());
        }));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let sink = RecordingSink::new();
        let notifier = RecordingNotifier::new();

        let result = dispatch(self.operation, &mut state, &env, &sink, &notifier);

        for assertion in self.result_assertions {
            assertion(&result);
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.sink_assertions {
            assertion(&sink, &notifier);
        }
    }
}

/// Helper assertions for recorded outcomes
pub mod assertions {
    use crate::recording::{OutcomeKind, RecordingSink};

    /// Assert the ordered outcome tags
    ///
    /// # Panics
    ///
    /// Panics if the recorded tags differ from `expected`.
    pub fn assert_outcomes(sink: &RecordingSink, expected: &[&str]) {
        let actual = sink.outcomes();
        assert_eq!(
            actual, expected,
            "Expected outcomes {expected:?}, but found {actual:?}"
        );
    }

    /// Assert that the last report is a failure with the given code
    ///
    /// # Panics
    ///
    /// Panics if nothing was reported or the last report differs.
    pub fn assert_last_failure(sink: &RecordingSink, code: &str) {
        let last = sink.last();
        assert!(
            matches!(&last, Some(r) if r.kind == OutcomeKind::Failure && r.outcome == code),
            "Expected last outcome to be failure {code}, but found {last:?}"
        );
    }

    /// Assert that no report of any kind was produced
    ///
    /// # Panics
    ///
    /// Panics if the sink captured anything.
    pub fn assert_nothing_reported(sink: &RecordingSink) {
        let records = sink.records();
        assert!(
            records.is_empty(),
            "Expected no outcomes, but found {}: {:?}",
            records.len(),
            records
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use ticketbook_core::effect::{Effect, Notice};
    use ticketbook_core::operation::Applied;
    use ticketbook_core::outcome::{Context, Rejection, Report};

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Debug)]
    struct Negative;

    impl fmt::Display for Negative {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "would go negative")
        }
    }

    impl std::error::Error for Negative {}

    impl Rejection for Negative {
        fn code(&self) -> &'static str {
            "DECREMENT_NEGATIVE"
        }

        fn context(&self) -> Context {
            Context::new()
        }
    }

    struct Decrement;

    impl Operation for Decrement {
        type State = TestState;
        type Environment = ();
        type Output = i32;
        type Error = Negative;

        const NAME: &'static str = "Decrement";

        fn execute(self, state: &mut TestState, _env: &()) -> Result<Applied<i32>, Negative> {
            if state.count == 0 {
                return Err(Negative);
            }
            state.count -= 1;
            Ok(Applied::new(state.count, Report::new("DECREMENT_SUCCESS", Context::new()))
                .with_effects([Effect::Notify(Notice::new("watcher", "decremented"))]))
        }
    }

    #[test]
    fn test_operation_success() {
        OperationTest::new(Decrement)
            .with_env(())
            .given_state(TestState { count: 5 })
            .then_output(|count| assert_eq!(*count, 4))
            .then_state(|state| assert_eq!(state.count, 4))
            .then_outcomes(&["DECREMENT_SUCCESS"])
            .then_notices(|notices| assert_eq!(notices.len(), 1))
            .run();
    }

    #[test]
    fn test_operation_rejection() {
        OperationTest::new(Decrement)
            .with_env(())
            .given_state(TestState { count: 0 })
            .then_error(|error| assert_eq!(error.code(), "DECREMENT_NEGATIVE"))
            .then_state(|state| assert_eq!(state.count, 0))
            .then_outcomes(&["DECREMENT_NEGATIVE"])
            .then_notices(|notices| assert!(notices.is_empty()))
            .run();
    }
}

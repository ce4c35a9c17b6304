//! # Ticketbook Core
//!
//! The operation contract shared by every state-changing request in the
//! Ticketbook engine.
//!
//! ## Core Concepts
//!
//! - **State**: the single aggregate an operation reads and mutates
//! - **Operation**: a pure input struct that validates against the state and,
//!   only when every precondition holds, applies itself
//! - **Report**: the outcome tag plus named context values describing a result
//! - **Effect**: follow-up work the executor performs after a successful apply
//!   (extra reports, outbound notification triggers)
//! - **Environment**: injected dependencies (clock, collaborators)
//!
//! ## Architecture Principles
//!
//! - Validate first, then apply; a rejected operation leaves state untouched
//! - One terminal outcome per invocation, success or a single named failure
//! - Side effects are described, not performed, by the operation itself
//! - Dependency injection via Environment
//!
//! ## Example
//!
//! ```ignore
//! use ticketbook_core::operation::{Applied, Operation};
//! use ticketbook_core::outcome::{Context, Report};
//!
//! struct Increment { by: u32 }
//!
//! impl Operation for Increment {
//!     type State = Counter;
//!     type Environment = ();
//!     type Output = u32;
//!     type Error = CounterError;
//!
//!     const NAME: &'static str = "Increment";
//!
//!     fn execute(self, state: &mut Counter, _env: &()) -> Result<Applied<u32>, CounterError> {
//!         let next = state.value.checked_add(self.by).ok_or(CounterError::Overflow)?;
//!         state.value = next;
//!         Ok(Applied::new(next, Report::new("INCREMENT_SUCCESS", Context::new().with("value", next))))
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Outcome reporting: report tags, context maps, and the rejection contract
pub mod outcome;

/// Operation module - the validate-then-apply contract and its executor
///
/// Operations are plain input structs. Executing one consumes it, checks every
/// precondition against the current state (short-circuiting on the first
/// failure), and on success mutates exactly the entities it owns.
pub mod operation {
    use super::effect::Effect;
    use super::environment::{Notifier, ResultSink};
    use super::outcome::{Rejection, Report};
    use smallvec::SmallVec;

    /// Successful result of an operation.
    ///
    /// Carries the typed output returned to the caller, the success report
    /// sent to the result sink, and any follow-up effects.
    #[derive(Debug)]
    pub struct Applied<T> {
        /// Typed success payload
        pub output: T,
        /// Terminal success report
        pub report: Report,
        /// Follow-up effects, executed before the terminal report is emitted
        pub effects: SmallVec<[Effect; 4]>,
    }

    impl<T> Applied<T> {
        /// Creates a success with no follow-up effects
        #[must_use]
        pub fn new(output: T, report: Report) -> Self {
            Self {
                output,
                report,
                effects: SmallVec::new(),
            }
        }

        /// Attaches follow-up effects
        #[must_use]
        pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
            self.effects.extend(effects);
            self
        }
    }

    /// The Operation trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The aggregate this operation validates against and mutates
    /// - `Environment`: The injected dependencies this operation needs
    /// - `Output`: The typed success payload
    /// - `Error`: The typed failure, one variant per named outcome
    pub trait Operation {
        /// The aggregate this operation works on
        type State;

        /// The environment type with injected dependencies
        type Environment;

        /// Typed success payload
        type Output;

        /// Typed failure
        type Error: Rejection;

        /// Operation name used in reports, logs and metrics
        const NAME: &'static str;

        /// Validate against `state` and, if every check passes, apply.
        ///
        /// Implementations must not mutate `state` before the last check has
        /// passed.
        ///
        /// # Errors
        ///
        /// Returns the first failed precondition.
        fn execute(
            self,
            state: &mut Self::State,
            env: &Self::Environment,
        ) -> Result<Applied<Self::Output>, Self::Error>;
    }

    /// Executes one operation to completion and reports its outcome.
    ///
    /// This is the stateless executor: callers own the state and decide how
    /// exclusive access is guaranteed (see the runtime `Store`).
    ///
    /// On success every effect is carried out in order, then the terminal
    /// success report is emitted. On failure exactly one failure report is
    /// emitted.
    ///
    /// # Errors
    ///
    /// Returns the operation's rejection unchanged.
    pub fn dispatch<O: Operation>(
        operation: O,
        state: &mut O::State,
        env: &O::Environment,
        sink: &dyn ResultSink,
        notifier: &dyn Notifier,
    ) -> Result<O::Output, O::Error> {
        match operation.execute(state, env) {
            Ok(applied) => {
                for effect in applied.effects {
                    match effect {
                        Effect::None => {}
                        Effect::Report(report) => {
                            sink.report_success(O::NAME, report.tag, &report.context);
                        }
                        Effect::Notify(notice) => notifier.notify(&notice),
                    }
                }
                sink.report_success(O::NAME, applied.report.tag, &applied.report.context);
                Ok(applied.output)
            }
            Err(error) => {
                sink.report_failure(O::NAME, error.code(), &error.context());
                Err(error)
            }
        }
    }
}

/// Effect module - follow-up work described by a successful operation
///
/// Effects are values, not execution. The executor performs them after the
/// operation has fully applied, so a rejected operation never produces one.
pub mod effect {
    use super::outcome::Report;
    use serde::{Deserialize, Serialize};

    /// Trigger for an outbound message to a user.
    ///
    /// Delivery (e-mail, SMS) belongs to the `Notifier` implementation.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Notice {
        /// Who should be told, usually an account e-mail
        pub recipient: String,
        /// Additional contact detail, e.g. a phone number
        pub contact: Option<String>,
        /// Message body
        pub message: String,
    }

    impl Notice {
        /// Creates a notice
        #[must_use]
        pub fn new(recipient: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                recipient: recipient.into(),
                contact: None,
                message: message.into(),
            }
        }

        /// Adds a secondary contact detail
        #[must_use]
        pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
            self.contact = Some(contact.into());
            self
        }
    }

    /// Effect type - describes follow-up work for the executor
    #[derive(Clone, Debug, PartialEq)]
    pub enum Effect {
        /// No-op effect
        None,

        /// An intermediate success report (e.g. one per refunded booking)
        Report(Report),

        /// Ask the notifier to contact a user
        Notify(Notice),
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter or handed to the executor.
pub mod environment {
    use super::outcome::Context;
    use super::effect::Notice;
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Receives the terminal outcome of every dispatched operation.
    ///
    /// Fire-and-forget: a sink can never fail the operation it observes.
    pub trait ResultSink: Send + Sync {
        /// Record a success outcome
        fn report_success(&self, operation: &'static str, outcome: &'static str, context: &Context);

        /// Record a failure outcome
        fn report_failure(&self, operation: &'static str, outcome: &'static str, context: &Context);
    }

    /// Delivers notification triggers to users.
    pub trait Notifier: Send + Sync {
        /// Deliver one notice
        fn notify(&self, notice: &Notice);
    }

    /// Sink that drops every report
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NullSink;

    impl ResultSink for NullSink {
        fn report_success(&self, _operation: &'static str, _outcome: &'static str, _context: &Context) {}

        fn report_failure(&self, _operation: &'static str, _outcome: &'static str, _context: &Context) {}
    }

    impl Notifier for NullSink {
        fn notify(&self, _notice: &Notice) {}
    }
}

//! # Ticketbook Runtime
//!
//! Runtime implementation for the Ticketbook engine.
//!
//! ## Core Components
//!
//! - **Store**: owns the aggregate and is its only writer. Each operation runs
//!   validation-through-apply inside one critical section, so "read remaining
//!   tickets, then decrement" can never interleave with another operation.
//! - **Tracing observers**: a `ResultSink` and `Notifier` that emit structured
//!   `tracing` events
//! - **Metrics**: per-operation counters and latency histograms
//!
//! ## Example
//!
//! ```ignore
//! use ticketbook_runtime::Store;
//!
//! let store = Store::new(initial_state, environment);
//!
//! // Dispatch an operation
//! let booking = store.send(BookEvent { event_number, tickets: 2 }).await?;
//!
//! // Read state
//! let remaining = store.state(|s| s.remaining_tickets(event_number)).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use ticketbook_core::environment::{Notifier, ResultSink};
use ticketbook_core::operation::{dispatch, Operation};
use ticketbook_core::outcome::Rejection;
use tokio::sync::Mutex;

/// Prometheus metrics for observability
pub mod metrics;

/// `tracing`-backed result sink and notifier
pub mod observe;

pub use observe::{TracingNotifier, TracingSink};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur when sending an operation to the Store
    #[derive(Error, Debug)]
    pub enum StoreError<E>
    where
        E: std::error::Error + 'static,
    {
        /// Store is shutting down and not accepting new operations
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// The operation ran and was rejected
        #[error(transparent)]
        Rejected(E),
    }

    impl<E> StoreError<E>
    where
        E: std::error::Error + 'static,
    {
        /// The rejection, if the operation ran
        #[must_use]
        pub const fn rejection(&self) -> Option<&E> {
            match self {
                Self::Rejected(error) => Some(error),
                Self::ShutdownInProgress => None,
            }
        }

        /// Consumes the error, returning the rejection if the operation ran
        #[must_use]
        pub fn into_rejection(self) -> Option<E> {
            match self {
                Self::Rejected(error) => Some(error),
                Self::ShutdownInProgress => None,
            }
        }
    }
}

pub use error::StoreError;

/// The Store - single-writer coordinator for one aggregate
pub mod store {
    use super::{
        dispatch, metrics, Arc, AtomicBool, Mutex, Notifier, Operation, Ordering, Rejection,
        ResultSink, StoreError, TracingNotifier, TracingSink,
    };
    use std::time::Instant;

    /// The Store - runtime coordinator for an aggregate
    ///
    /// The Store manages:
    /// 1. State (behind a `Mutex`; one operation holds it from validation to apply)
    /// 2. Environment (injected dependencies)
    /// 3. Observers (result sink, notifier)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `E`: Environment type
    pub struct Store<S, E> {
        state: Arc<Mutex<S>>,
        environment: E,
        sink: Arc<dyn ResultSink>,
        notifier: Arc<dyn Notifier>,
        shutdown: Arc<AtomicBool>,
    }

    impl<S, E> Store<S, E> {
        /// Create a new store that reports through `tracing`
        #[must_use]
        pub fn new(initial_state: S, environment: E) -> Self {
            Self::with_observers(
                initial_state,
                environment,
                Arc::new(TracingSink),
                Arc::new(TracingNotifier),
            )
        }

        /// Create a new store with explicit observers
        ///
        /// # Arguments
        ///
        /// - `initial_state`: The starting state for the store
        /// - `environment`: Injected dependencies
        /// - `sink`: Receives every terminal outcome
        /// - `notifier`: Receives notification triggers
        #[must_use]
        pub fn with_observers(
            initial_state: S,
            environment: E,
            sink: Arc<dyn ResultSink>,
            notifier: Arc<dyn Notifier>,
        ) -> Self {
            Self {
                state: Arc::new(Mutex::new(initial_state)),
                environment,
                sink,
                notifier,
                shutdown: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Injected dependencies
        #[must_use]
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Send an operation to the store
        ///
        /// Waits for exclusive access, then validates and applies the operation
        /// while holding it. Exactly one outcome is reported per call.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownInProgress`]: store no longer accepts work
        /// - [`StoreError::Rejected`]: the operation's first failed precondition
        #[tracing::instrument(skip_all, name = "store_send", fields(operation = O::NAME))]
        pub async fn send<O>(&self, operation: O) -> Result<O::Output, StoreError<O::Error>>
        where
            O: Operation<State = S, Environment = E>,
            O::Error: 'static,
        {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::warn!("Rejecting operation, store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            let mut state = self.state.lock().await;
            let started = Instant::now();
            let result = dispatch(
                operation,
                &mut *state,
                &self.environment,
                self.sink.as_ref(),
                self.notifier.as_ref(),
            );
            drop(state);

            match &result {
                Ok(_) => metrics::record_operation(O::NAME, "success", started.elapsed()),
                Err(error) => {
                    if error.is_fatal() {
                        tracing::error!(code = error.code(), %error, "Operation failed fatally");
                        metrics::record_fatal(O::NAME);
                    }
                    metrics::record_operation(O::NAME, error.code(), started.elapsed());
                }
            }

            result.map_err(StoreError::Rejected)
        }

        /// Read current state via a closure
        ///
        /// Holds the same lock as `send`, so the closure always observes a
        /// state between two complete operations.
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.lock().await;
            f(&state)
        }

        /// Stop accepting new operations
        pub fn shutdown(&self) {
            tracing::info!("Store shutdown requested");
            self.shutdown.store(true, Ordering::SeqCst);
        }

        /// Returns true once `shutdown` has been called
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::SeqCst)
        }
    }

    impl<S, E: Clone> Clone for Store<S, E> {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                environment: self.environment.clone(),
                sink: Arc::clone(&self.sink),
                notifier: Arc::clone(&self.notifier),
                shutdown: Arc::clone(&self.shutdown),
            }
        }
    }
}

pub use store::Store;

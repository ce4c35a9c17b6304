//! Prometheus metrics for dispatched operations.
//!
//! The Store records, per call:
//! - `ticketing_operations_total{operation, outcome}` where `outcome` is
//!   `success` or the failure code
//! - `ticketing_operation_duration_seconds{operation}`
//! - `ticketing_fatal_failures_total{operation}` for rejections flagged fatal
//!
//! Without an installed recorder every call is a no-op.
//!
//! # Example
//!
//! ```rust,no_run
//! use ticketbook_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut metrics = MetricsServer::new();
//! metrics.start()?;
//!
//! // ... dispatch operations ...
//!
//! if let Some(text) = metrics.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Operations dispatched, by name and outcome
pub const OPERATIONS_TOTAL: &str = "ticketing_operations_total";

/// Validate-and-apply latency, by operation name
pub const OPERATION_DURATION: &str = "ticketing_operation_duration_seconds";

/// Rejections that signal a fault rather than a validation outcome
pub const FATAL_FAILURES_TOTAL: &str = "ticketing_fatal_failures_total";

/// Latency bucket bounds in seconds
const LATENCY_BUCKETS: &[f64] = &[0.000_05, 0.000_25, 0.001, 0.005, 0.025, 0.1, 0.5, 2.5];

/// Errors from installing the recorder.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Bucket configuration was refused
    #[error("Invalid histogram buckets: {0}")]
    Buckets(String),
    /// Another recorder could not be replaced
    #[error("Failed to install Prometheus recorder: {0}")]
    Install(String),
}

/// Owner of the installed Prometheus recorder.
#[derive(Default)]
pub struct MetricsServer {
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a server with no recorder installed
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Install the global Prometheus recorder.
    ///
    /// A recorder installed earlier in the process (another test, another
    /// server) is left in place; this server then renders nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the builder rejects the buckets or the
    /// recorder cannot be installed for any other reason.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        describe();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(OPERATION_DURATION.to_string()), LATENCY_BUCKETS)
            .map_err(|e| MetricsError::Buckets(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                tracing::info!("Prometheus recorder installed");
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) if e.to_string().contains("already initialized") => {
                tracing::warn!("A metrics recorder is already installed, keeping it");
                Ok(())
            }
            Err(e) => Err(MetricsError::Install(e.to_string())),
        }
    }

    /// Whether this server owns the installed recorder
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Current metrics in the Prometheus text format, if this server owns
    /// the recorder
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn describe() {
    describe_counter!(OPERATIONS_TOTAL, "Operations dispatched by the Store, by operation and outcome");
    describe_histogram!(
        OPERATION_DURATION,
        Unit::Seconds,
        "Time one operation held the state lock"
    );
    describe_counter!(FATAL_FAILURES_TOTAL, "Rejections caused by I/O or corrupt input");
}

/// Record one dispatched operation.
///
/// `outcome` is `success` or the failure code.
pub fn record_operation(operation: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!(OPERATIONS_TOTAL, "operation" => operation, "outcome" => outcome).increment(1);
    histogram!(OPERATION_DURATION, "operation" => operation).record(elapsed.as_secs_f64());
}

/// Record a rejection that was flagged fatal
pub fn record_fatal(operation: &'static str) {
    counter!(FATAL_FAILURES_TOTAL, "operation" => operation).increment(1);
}

//! Observers that turn outcomes and notices into structured `tracing` events.

use ticketbook_core::effect::Notice;
use ticketbook_core::environment::{Notifier, ResultSink};
use ticketbook_core::outcome::Context;

/// Result sink that logs successes at `info` and failures at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn report_success(&self, operation: &'static str, outcome: &'static str, context: &Context) {
        tracing::info!(operation, outcome, %context, "Operation succeeded");
    }

    fn report_failure(&self, operation: &'static str, outcome: &'static str, context: &Context) {
        tracing::warn!(operation, outcome, %context, "Operation failed");
    }
}

/// Notifier that logs each notice instead of delivering it.
///
/// Stands in for e-mail/SMS delivery, which lives outside the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::info!(
            recipient = %notice.recipient,
            contact = notice.contact.as_deref().unwrap_or("-"),
            message = %notice.message,
            "Notification triggered"
        );
    }
}

//! Submission outcome reporting

use std::time::Duration;

use crate::metrics::TicketMetrics;
use crate::ticket::SubmitError;

/// Receives the outcome of every ticket submission.
///
/// The output stage reports through this instead of a process-wide logger,
/// so embedders and tests can capture outcomes directly.
pub trait SubmissionObserver: Send + Sync {
    fn ticket_created(&self, tag: &str, subject: &str, elapsed: Duration);

    fn ticket_failed(&self, tag: &str, error: &SubmitError, elapsed: Duration);
}

/// Default observer: `tracing` events plus Prometheus metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SubmissionObserver for TracingObserver {
    fn ticket_created(&self, tag: &str, subject: &str, elapsed: Duration) {
        TicketMetrics::record_created(elapsed);

        tracing::debug!(
            tag = %tag,
            subject = %subject,
            elapsed_ms = elapsed.as_millis() as u64,
            "Ticket created"
        );
    }

    fn ticket_failed(&self, tag: &str, error: &SubmitError, elapsed: Duration) {
        TicketMetrics::record_failed(error.kind(), elapsed);

        tracing::error!(
            url = %error.url,
            tag = %tag,
            subject = %error.subject,
            description = %error.description,
            error_kind = error.kind(),
            status = ?error.status(),
            response_body = ?error.response_body(),
            error_message = %error.cause,
            elapsed_ms = elapsed.as_millis() as u64,
            "Failed to create ticket"
        );
    }
}

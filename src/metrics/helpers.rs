//! Metric recording helpers

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    BATCHES_RECEIVED_TOTAL, RECORDS_RECEIVED_TOTAL, TICKETS_CREATED_TOTAL, TICKET_FAILURES_TOTAL,
    TICKET_SUBMIT_DURATION,
};

/// Encode all registered metrics in Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording ticket metrics
pub struct TicketMetrics;

impl TicketMetrics {
    pub fn record_created(elapsed: Duration) {
        TICKETS_CREATED_TOTAL.inc();
        TICKET_SUBMIT_DURATION.observe(elapsed.as_secs_f64());
    }

    pub fn record_failed(kind: &str, elapsed: Duration) {
        TICKET_FAILURES_TOTAL.with_label_values(&[kind]).inc();
        TICKET_SUBMIT_DURATION.observe(elapsed.as_secs_f64());
    }
}

/// Helper struct for recording inbound batch metrics
pub struct BatchMetrics;

impl BatchMetrics {
    pub fn record_received(records: usize) {
        BATCHES_RECEIVED_TOTAL.inc();
        RECORDS_RECEIVED_TOTAL.inc_by(records as u64);
    }
}

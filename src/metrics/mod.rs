//! Prometheus metrics for the ticket sink.
//!
//! This module provides:
//! - Ticket metrics (created, failed by kind, submission latency)
//! - Inbound batch metrics (batches and records received)

mod helpers;

pub use helpers::{encode_metrics, BatchMetrics, TicketMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "redmine_sink";

lazy_static! {
    // ============================================================================
    // Ticket Metrics
    // ============================================================================

    /// Tickets the tracker answered with 201
    pub static ref TICKETS_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_tickets_created_total", METRIC_PREFIX),
        "Total tickets created in the tracker"
    ).unwrap();

    /// Failed submissions by failure kind
    pub static ref TICKET_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_ticket_failures_total", METRIC_PREFIX),
        "Total ticket submissions that did not create a ticket",
        &["kind"]
    ).unwrap();

    /// Time from render to tracker response
    pub static ref TICKET_SUBMIT_DURATION: Histogram = register_histogram!(
        format!("{}_ticket_submit_duration_seconds", METRIC_PREFIX),
        "Ticket submission latency in seconds",
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // ============================================================================
    // Batch Metrics
    // ============================================================================

    /// Batches received from the pipeline
    pub static ref BATCHES_RECEIVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_batches_received_total", METRIC_PREFIX),
        "Total record batches received"
    ).unwrap();

    /// Records received from the pipeline
    pub static ref RECORDS_RECEIVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_records_received_total", METRIC_PREFIX),
        "Total records received"
    ).unwrap();
}

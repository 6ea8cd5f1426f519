//! API layer - HTTP endpoint handlers.

mod health;
mod ingest;
mod metrics;
mod routes;

pub use health::{health, stats, HealthResponse, StatsResponse, TrackerHealthResponse};
pub use ingest::{write_batch, BatchRequest, BatchResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;

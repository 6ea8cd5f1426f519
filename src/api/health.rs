//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::output::OutputStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub tracker: TrackerHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct TrackerHealthResponse {
    pub issues_url: String,
    pub tls: bool,
    pub tls_verify: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub tickets: OutputStatsSnapshot,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let redmine = &state.settings.redmine;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        tracker: TrackerHealthResponse {
            issues_url: state.output.submitter().issues_url().to_string(),
            tls: redmine.use_tls(),
            tls_verify: redmine.tls_verify,
        },
    })
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        tickets: state.output.stats().snapshot(),
    })
}

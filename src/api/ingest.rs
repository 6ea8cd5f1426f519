//! Batch ingest from the log pipeline

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::BatchMetrics;
use crate::output::{FailedEntry, LogEntry};
use crate::server::AppState;

/// A flushed buffer chunk
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub created: usize,
    pub failed: Vec<FailedEntry>,
}

/// POST /api/v1/batches - one ticket per entry, in order
#[tracing::instrument(
    name = "http.write_batch",
    skip(state, request),
    fields(entries = request.entries.len())
)]
pub async fn write_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>> {
    BatchMetrics::record_received(request.entries.len());

    let report = state.output.write(&request.entries).await?;

    Ok(Json(BatchResponse {
        created: report.created,
        failed: report.failed,
    }))
}

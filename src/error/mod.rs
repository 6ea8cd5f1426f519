use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::output::OutputError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Ticket submission failed: {0}")]
    Submission(#[from] OutputError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<usize>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, body) = match &self {
            AppError::Submission(OutputError::Submission {
                index,
                created,
                source,
            }) => (
                // Upstream treats 5xx as "redeliver the batch"
                StatusCode::BAD_GATEWAY,
                "TICKET_SUBMISSION_FAILED",
                ErrorBody {
                    code: "TICKET_SUBMISSION_FAILED".to_string(),
                    // Rendered subject and description stay in the server log
                    message: source.cause.to_string(),
                    failed_index: Some(*index),
                    created: Some(*created),
                },
            ),
        };

        tracing::warn!(
            code = %code,
            status = %status.as_u16(),
            message = %self,
            "API error"
        );

        (status, Json(ErrorResponse { error: body })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

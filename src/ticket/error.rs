//! Ticket submission errors

use thiserror::Error;

use super::payload::CoercionError;

/// A ticket that was not created, with the context needed to log it
#[derive(Debug, Error)]
#[error("failed to create ticket to {url}: {cause}")]
pub struct SubmitError {
    /// Target `issues.json` URL
    pub url: String,
    /// Rendered subject
    pub subject: String,
    /// Rendered description
    pub description: String,
    #[source]
    pub cause: SubmitFailure,
}

impl SubmitError {
    pub fn kind(&self) -> &'static str {
        self.cause.kind()
    }

    /// HTTP status, only for application rejections
    pub fn status(&self) -> Option<u16> {
        match &self.cause {
            SubmitFailure::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn response_body(&self) -> Option<&str> {
        match &self.cause {
            SubmitFailure::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Why a ticket was not created
#[derive(Debug, Error)]
pub enum SubmitFailure {
    /// The tracker never answered
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The tracker answered with anything but 201
    #[error("Error: {status}, {body}")]
    Rejected { status: u16, body: String },

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("failed to serialize ticket payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SubmitFailure {
    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitFailure::Transport(_) => "transport",
            SubmitFailure::Rejected { .. } => "rejected",
            SubmitFailure::Coercion(_) => "coercion",
            SubmitFailure::Serialization(_) => "serialization",
        }
    }
}

/// Network level failure talking to the tracker
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("http request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API key is not a valid header value")]
    InvalidApiKey,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err)
        } else if err.is_connect() {
            TransportError::Connect(err)
        } else {
            TransportError::Request(err)
        }
    }
}

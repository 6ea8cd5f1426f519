//! Ticket creation against a Redmine compatible issue tracker.
//!
//! This module provides:
//! - The issue payload and per-record resolution of priority, category and
//!   custom fields
//! - [`TicketSubmitter`], which posts one issue per call and accepts only
//!   `201 Created`
//! - The [`TicketTransport`] seam with the `reqwest` implementation

mod error;
mod payload;
mod submitter;
mod transport;

pub use error::{SubmitError, SubmitFailure, TransportError};
pub use payload::{
    resolve_custom_fields, resolve_numeric_field, CoercionError, CoercionMode, Issue, Record,
    TicketPayload,
};
pub use submitter::TicketSubmitter;
pub use transport::{
    ReqwestTransport, TicketTransport, TrackerResponse, TransportOptions, API_KEY_HEADER,
};

#[cfg(test)]
pub(crate) use transport::testing;

//! Pipeline-facing output stage.
//!
//! For each delivered record the stage builds a binding context (routing
//! tag plus record fields), renders subject and description, and submits
//! one ticket. Failures are reported to a [`SubmissionObserver`] and then
//! returned, so the caller decides whether the batch is redelivered.

mod observer;
mod writer;

pub use observer::{SubmissionObserver, TracingObserver};
pub use writer::{
    FailedEntry, FailurePolicy, LogEntry, OutputError, OutputStats, OutputStatsSnapshot,
    RedmineOutput, WriteReport,
};

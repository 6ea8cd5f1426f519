//! Per-record render and submit over a delivered batch

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::{RedmineConfig, Settings, SettingsError};
use crate::template::{BindingContext, TemplateExpander};
use crate::ticket::{Record, SubmitError, TicketSubmitter};

use super::observer::{SubmissionObserver, TracingObserver};

/// One record handed over by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Routing key of the record
    pub tag: String,

    /// Event time as the pipeline sent it (RFC 3339 string, epoch number or
    /// anything else). Never decoded here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Value>,

    #[serde(default)]
    pub record: Record,
}

impl LogEntry {
    pub fn new(tag: impl Into<String>, record: Record) -> Self {
        Self {
            tag: tag.into(),
            time: None,
            record,
        }
    }
}

/// What happens to the rest of a batch after a failed record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure and hand the error to the caller
    #[default]
    Abort,
    /// Keep going and list the failures in the report
    Continue,
}

/// A record that did not become a ticket
#[derive(Debug, Clone, Serialize)]
pub struct FailedEntry {
    /// Position in the batch
    pub index: usize,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl FailedEntry {
    fn new(index: usize, error: &SubmitError) -> Self {
        Self {
            index,
            kind: error.kind(),
            status: error.status(),
            message: error.cause.to_string(),
        }
    }
}

/// Outcome of a batch write
#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteReport {
    pub created: usize,
    pub failed: Vec<FailedEntry>,
}

/// A batch aborted by a failed record
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("record {index} failed after {created} tickets were created: {source}")]
    Submission {
        index: usize,
        created: usize,
        #[source]
        source: SubmitError,
    },
}

/// Counters for the output stage
#[derive(Debug, Default)]
pub struct OutputStats {
    pub batches: AtomicU64,
    pub created: AtomicU64,
    pub failed: AtomicU64,
}

impl OutputStats {
    pub fn snapshot(&self) -> OutputStatsSnapshot {
        OutputStatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of output statistics
#[derive(Debug, Clone, Serialize)]
pub struct OutputStatsSnapshot {
    pub batches: u64,
    pub created: u64,
    pub failed: u64,
}

/// Turns tagged log records into tickets, one request per record.
///
/// Records of a batch are submitted strictly in order. Batches may be
/// written concurrently; only the parsed templates and configuration are
/// shared between them.
pub struct RedmineOutput {
    tag_key: String,
    subject: TemplateExpander,
    description: TemplateExpander,
    submitter: TicketSubmitter,
    on_failure: FailurePolicy,
    observer: Arc<dyn SubmissionObserver>,
    stats: OutputStats,
}

impl RedmineOutput {
    /// Build the output with the `reqwest` transport
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let submitter = TicketSubmitter::new(&settings.redmine)?;
        Ok(Self::new(
            &settings.redmine,
            settings.output.on_failure,
            submitter,
        ))
    }

    pub fn new(config: &RedmineConfig, on_failure: FailurePolicy, submitter: TicketSubmitter) -> Self {
        Self {
            tag_key: config.tag_key.clone(),
            subject: TemplateExpander::new(config.subject.as_str()),
            description: TemplateExpander::new(config.description.as_str()),
            submitter,
            on_failure,
            observer: Arc::new(TracingObserver),
            stats: OutputStats::default(),
        }
    }

    /// Replace the default tracing observer
    pub fn with_observer(mut self, observer: Arc<dyn SubmissionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn submitter(&self) -> &TicketSubmitter {
        &self.submitter
    }

    pub fn stats(&self) -> &OutputStats {
        &self.stats
    }

    /// Binding context for one record: the tag under `tag_key`, then the
    /// record's own fields, which win on a name clash.
    pub fn make_record(&self, tag: &str, record: &Record) -> BindingContext {
        let mut dest = BindingContext::new();
        dest.insert(self.tag_key.clone(), Value::String(tag.to_string()));
        for (key, value) in record {
            dest.insert(key.clone(), value.clone());
        }
        dest
    }

    /// Rendered subject and description for one record
    pub fn render(&self, tag: &str, record: &Record) -> (String, String) {
        let context = self.make_record(tag, record);
        (self.subject.bind(&context), self.description.bind(&context))
    }

    /// Create the ticket for one record.
    ///
    /// Failures are reported to the observer before being returned.
    pub async fn write_entry(&self, entry: &LogEntry) -> Result<String, SubmitError> {
        let (subject, description) = self.render(&entry.tag, &entry.record);
        let started = Instant::now();

        let result = self
            .submitter
            .submit_ticket(subject.clone(), description, &entry.record)
            .await;

        match &result {
            Ok(_) => {
                self.stats.created.fetch_add(1, Ordering::Relaxed);
                self.observer
                    .ticket_created(&entry.tag, &subject, started.elapsed());
            }
            Err(error) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                self.observer
                    .ticket_failed(&entry.tag, error, started.elapsed());
            }
        }

        result
    }

    /// Create one ticket per entry, in order.
    ///
    /// With [`FailurePolicy::Abort`] the first failure ends the batch and
    /// later entries are not attempted.
    #[tracing::instrument(
        name = "output.write",
        skip(self, entries),
        fields(entries = entries.len())
    )]
    pub async fn write(&self, entries: &[LogEntry]) -> Result<WriteReport, OutputError> {
        self.stats.batches.fetch_add(1, Ordering::Relaxed);
        let mut report = WriteReport::default();

        for (index, entry) in entries.iter().enumerate() {
            match self.write_entry(entry).await {
                Ok(_) => report.created += 1,
                Err(error) => match self.on_failure {
                    FailurePolicy::Abort => {
                        return Err(OutputError::Submission {
                            index,
                            created: report.created,
                            source: error,
                        })
                    }
                    FailurePolicy::Continue => report.failed.push(FailedEntry::new(index, &error)),
                },
            }
        }

        tracing::debug!(
            created = report.created,
            failed = report.failed.len(),
            "Batch written"
        );

        Ok(report)
    }
}

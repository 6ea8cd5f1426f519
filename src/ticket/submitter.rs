//! One ticket per record against the tracker's issue API

use std::sync::Arc;

use reqwest::Url;

use crate::config::{RedmineConfig, SettingsError};

use super::error::{SubmitError, SubmitFailure};
use super::payload::{
    resolve_custom_fields, resolve_numeric_field, CoercionMode, Issue, Record, TicketPayload,
};
use super::transport::{ReqwestTransport, TicketTransport};

/// The only status that counts as a created ticket
const CREATED: u16 = 201;

/// Static issue fields and their per-record override keys
#[derive(Debug, Clone)]
struct IssueDefaults {
    project_id: String,
    tracker_id: Option<i64>,
    priority_id: Option<i64>,
    priority_id_key: Option<String>,
    category_id: Option<i64>,
    category_id_key: Option<String>,
    custom_fields: Vec<serde_json::Value>,
    custom_fields_key: Option<String>,
    coercion: CoercionMode,
}

/// Builds issue payloads and posts them to `<url>/issues.json`.
///
/// Holds only immutable configuration, so one instance can serve any number
/// of concurrent batches.
pub struct TicketSubmitter {
    issues_url: Url,
    api_key: String,
    defaults: IssueDefaults,
    transport: Arc<dyn TicketTransport>,
}

impl TicketSubmitter {
    /// Create a submitter with the `reqwest` transport
    pub fn new(config: &RedmineConfig) -> Result<Self, SettingsError> {
        let transport = ReqwestTransport::new(&config.transport_options())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a submitter on top of any transport
    pub fn with_transport(
        config: &RedmineConfig,
        transport: Arc<dyn TicketTransport>,
    ) -> Result<Self, SettingsError> {
        let issues_url = config.issues_url()?;
        let api_key = config.require_api_key()?.to_string();
        let project_id = config.require_project_id()?.to_string();

        Ok(Self {
            issues_url,
            api_key,
            defaults: IssueDefaults {
                project_id,
                tracker_id: config.tracker_id,
                priority_id: config.priority_id,
                priority_id_key: config.priority_id_key.clone(),
                category_id: config.category_id,
                category_id_key: config.category_id_key.clone(),
                custom_fields: config.custom_fields.clone(),
                custom_fields_key: config.custom_fields_key.clone(),
                coercion: config.coercion,
            },
            transport,
        })
    }

    pub fn issues_url(&self) -> &Url {
        &self.issues_url
    }

    /// Assemble the issue for one record.
    ///
    /// Fails only when an override value in the record cannot be coerced.
    pub fn build_payload(
        &self,
        subject: &str,
        description: &str,
        record: &Record,
    ) -> Result<TicketPayload, SubmitFailure> {
        let d = &self.defaults;

        let priority_id = resolve_numeric_field(
            d.priority_id,
            d.priority_id_key.as_deref(),
            record,
            d.coercion,
        )?;
        let category_id = resolve_numeric_field(
            d.category_id,
            d.category_id_key.as_deref(),
            record,
            d.coercion,
        )?;
        let custom_fields =
            resolve_custom_fields(&d.custom_fields, d.custom_fields_key.as_deref(), record)?;

        Ok(TicketPayload {
            issue: Issue {
                project_id: d.project_id.clone(),
                tracker_id: d.tracker_id,
                priority_id,
                category_id,
                custom_fields,
                subject: subject.to_string(),
                description: description.to_string(),
            },
        })
    }

    /// Post one payload. Returns the tracker's response body on 201.
    pub async fn submit(&self, payload: &TicketPayload) -> Result<String, SubmitFailure> {
        let body = serde_json::to_vec(payload)?;

        let response = self
            .transport
            .post_issue(&self.issues_url, &self.api_key, body)
            .await?;

        if response.status != CREATED {
            return Err(SubmitFailure::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        Ok(response.body)
    }

    /// Build and post the ticket for one rendered record.
    ///
    /// Any failure comes back with the URL, subject and description attached.
    #[tracing::instrument(
        name = "redmine.submit_ticket",
        skip_all,
        fields(url = %self.issues_url)
    )]
    pub async fn submit_ticket(
        &self,
        subject: String,
        description: String,
        record: &Record,
    ) -> Result<String, SubmitError> {
        let result = match self.build_payload(&subject, &description, record) {
            Ok(payload) => self.submit(&payload).await,
            Err(failure) => Err(failure),
        };

        result.map_err(|cause| SubmitError {
            url: self.issues_url.to_string(),
            subject,
            description,
            cause,
        })
    }
}

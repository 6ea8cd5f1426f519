//! HTTP transport to the tracker

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;

use super::error::TransportError;

/// Header carrying the tracker API key
pub const API_KEY_HEADER: &str = "X-Redmine-API-Key";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Raw tracker answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one serialized issue to the tracker and returns whatever it answered.
///
/// Status interpretation is left to the caller; an `Err` means no HTTP
/// response was received at all.
#[async_trait]
pub trait TicketTransport: Send + Sync {
    async fn post_issue(
        &self,
        url: &Url,
        api_key: &str,
        body: Vec<u8>,
    ) -> Result<TrackerResponse, TransportError>;
}

/// Options for [`ReqwestTransport`]
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub timeout: Duration,
    /// The tracker base URL is `https`
    pub use_tls: bool,
    /// Verify the tracker's TLS certificate
    pub tls_verify: bool,
    /// Log request and response at debug level
    pub debug_http: bool,
}

impl TransportOptions {
    /// Certificates go unchecked on a TLS connection
    pub fn skips_certificate_checks(&self) -> bool {
        self.use_tls && !self.tls_verify
    }
}

/// `reqwest` backed transport
pub struct ReqwestTransport {
    client: reqwest::Client,
    debug_http: bool,
}

impl ReqwestTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, reqwest::Error> {
        if options.skips_certificate_checks() {
            tracing::warn!(
                "TLS certificate verification for the tracker is disabled; \
                 the connection can be intercepted"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.skips_certificate_checks())
            .build()?;

        Ok(Self {
            client,
            debug_http: options.debug_http,
        })
    }

    fn headers(api_key: &str) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        let mut key = HeaderValue::from_str(api_key).map_err(|_| TransportError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        Ok(headers)
    }
}

#[async_trait]
impl TicketTransport for ReqwestTransport {
    async fn post_issue(
        &self,
        url: &Url,
        api_key: &str,
        body: Vec<u8>,
    ) -> Result<TrackerResponse, TransportError> {
        if self.debug_http {
            tracing::debug!(
                target: "redmine::http",
                method = "POST",
                url = %url,
                content_type = JSON_CONTENT_TYPE,
                api_key = "[redacted]",
                body = %String::from_utf8_lossy(&body),
                "Sending request"
            );
        }

        let response = self
            .client
            .post(url.clone())
            .headers(Self::headers(api_key)?)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if self.debug_http {
            tracing::debug!(
                target: "redmine::http",
                status,
                body = %body,
                "Received response"
            );
        }

        Ok(TrackerResponse { status, body })
    }
}

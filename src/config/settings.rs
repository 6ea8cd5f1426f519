use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::output::FailurePolicy;
use crate::ticket::{CoercionMode, TransportOptions};

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("'{0}' must be specified.")]
    MissingOption(&'static str),

    #[error("invalid tracker url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redmine: RedmineConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted batch body in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

/// Tracker connection and issue field options
#[derive(Debug, Clone, Deserialize)]
pub struct RedmineConfig {
    /// Base URL, `issues.json` is appended
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Field name the routing tag is bound under in templates
    #[serde(default = "default_tag_key")]
    pub tag_key: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub tracker_id: Option<i64>,
    #[serde(default)]
    pub priority_id: Option<i64>,
    #[serde(default)]
    pub priority_id_key: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub category_id_key: Option<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    /// Either a list or a JSON array string
    #[serde(default, deserialize_with = "deserialize_custom_fields")]
    pub custom_fields: Vec<Value>,
    #[serde(default)]
    pub custom_fields_key: Option<String>,
    #[serde(default)]
    pub debug_http: bool,
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub coercion: CoercionMode,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_body_limit() -> usize {
    8 * 1024 * 1024 // 8 MiB
}

fn default_tag_key() -> String {
    "tag".to_string()
}

fn default_subject() -> String {
    "Fluent::RedmineOutput plugin".to_string()
}

fn default_tls_verify() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "redmine-ticket-sink".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

fn deserialize_custom_fields<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CustomFields {
        Json(String),
        List(Vec<Value>),
    }

    match CustomFields::deserialize(deserializer)? {
        CustomFields::List(fields) => Ok(fields),
        CustomFields::Json(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        CustomFields::Json(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(fields)) => Ok(fields),
            Ok(_) => Err(serde::de::Error::custom(
                "custom_fields must be a JSON array",
            )),
            Err(e) => Err(serde::de::Error::custom(format!(
                "custom_fields is not valid JSON: {e}"
            ))),
        },
    }
}

impl Settings {
    /// Load settings from defaults, `config/` files and `SINK_*` variables.
    ///
    /// Nested keys use a double underscore, e.g. `SINK_REDMINE__API_KEY`.
    pub fn new() -> Result<Self, SettingsError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("SINK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_config(builder.build()?)
    }

    /// Deserialize and validate an already assembled configuration
    pub fn from_config(config: Config) -> Result<Self, SettingsError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that cannot produce a working sink
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.redmine.issues_url()?;
        self.redmine.require_api_key()?;
        self.redmine.require_project_id()?;
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl RedmineConfig {
    /// `<url>/issues.json`
    pub fn issues_url(&self) -> Result<Url, SettingsError> {
        let base = non_empty(&self.url).ok_or(SettingsError::MissingOption("url"))?;
        let raw = format!("{}/issues.json", base.trim_end_matches('/'));

        let url = Url::parse(&raw).map_err(|e| SettingsError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SettingsError::InvalidUrl {
                url: base.to_string(),
                reason: format!("unsupported scheme `{other}`"),
            }),
        }
    }

    pub fn require_api_key(&self) -> Result<&str, SettingsError> {
        non_empty(&self.api_key).ok_or(SettingsError::MissingOption("api_key"))
    }

    pub fn require_project_id(&self) -> Result<&str, SettingsError> {
        non_empty(&self.project_id).ok_or(SettingsError::MissingOption("project_id"))
    }

    /// True when the base URL is `https`
    pub fn use_tls(&self) -> bool {
        non_empty(&self.url)
            .map(|url| url.starts_with("https:"))
            .unwrap_or(false)
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            timeout: Duration::from_secs(self.request_timeout_seconds),
            use_tls: self.use_tls(),
            tls_verify: self.tls_verify,
            debug_http: self.debug_http,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit: default_body_limit(),
        }
    }
}

impl Default for RedmineConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            tag_key: default_tag_key(),
            project_id: None,
            tracker_id: None,
            priority_id: None,
            priority_id_key: None,
            category_id: None,
            category_id_key: None,
            subject: default_subject(),
            description: String::new(),
            custom_fields: Vec::new(),
            custom_fields_key: None,
            debug_http: false,
            tls_verify: default_tls_verify(),
            request_timeout_seconds: default_request_timeout(),
            coercion: CoercionMode::default(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

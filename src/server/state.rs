use std::sync::Arc;
use std::time::Instant;

use crate::config::{Settings, SettingsError};
use crate::output::RedmineOutput;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub output: Arc<RedmineOutput>,
    pub started_at: Instant,
}

impl AppState {
    /// Build state with the `reqwest` backed output stage
    pub fn new(settings: Settings) -> Result<Self, SettingsError> {
        let output = RedmineOutput::from_settings(&settings)?;
        Ok(Self::with_output(settings, output))
    }

    pub fn with_output(settings: Settings, output: RedmineOutput) -> Self {
        Self {
            settings: Arc::new(settings),
            output: Arc::new(output),
            started_at: Instant::now(),
        }
    }
}

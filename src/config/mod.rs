mod settings;

pub use settings::{
    OtelConfig, OutputConfig, RedmineConfig, ServerConfig, Settings, SettingsError,
};

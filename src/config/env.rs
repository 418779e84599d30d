use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::domain::DisplayMode;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub page: PageConfig,
    pub classifier: ClassifierConfig,
    pub pipeline: PipelineConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub seed: PreferenceSeed,
}

#[derive(Debug, Clone)]
pub struct PageConfig {
    /// Address the snapshot was taken from; picks the platform.
    pub url: String,
    pub html_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub scroll_dir: Option<PathBuf>,
    pub scroll_interval: Duration,
    pub exit_when_idle: bool,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_in_flight: usize,
    pub heartbeat_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

/// Settings written into the preference store at startup. `None` leaves the
/// stored value alone.
#[derive(Debug, Clone, Default)]
pub struct PreferenceSeed {
    pub api_key: Option<String>,
    pub enabled: Option<bool>,
    pub muted_words: Vec<String>,
    pub display_mode: Option<DisplayMode>,
    pub custom_prompt: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

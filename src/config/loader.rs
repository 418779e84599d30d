use std::{env, path::PathBuf, str::FromStr, time::Duration};

use super::env::{
    AppConfig, ClassifierConfig, ConfigError, DirectoryConfig, LoggingConfig, PageConfig,
    PipelineConfig, PreferenceSeed,
};
use crate::{
    ai::inference::{DEFAULT_API_URL, DEFAULT_MODEL},
    domain::DisplayMode,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let page = PageConfig {
            url: required("FEED_PAGE_URL")?,
            html_path: PathBuf::from(required("FEED_PAGE_PATH")?),
            output_path: optional("FEED_OUTPUT_PATH").map(PathBuf::from),
            scroll_dir: optional("FEED_SCROLL_DIR").map(PathBuf::from),
            scroll_interval: Duration::from_millis(parse_or("FEED_SCROLL_INTERVAL_MS", 1_500)?),
            exit_when_idle: parse_bool_or("FEED_EXIT_WHEN_IDLE", true)?,
        };

        let classifier = ClassifierConfig {
            api_url: env::var("CLASSIFIER_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            model: env::var("CLASSIFIER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            request_timeout: Duration::from_millis(parse_or("CLASSIFIER_TIMEOUT_MS", 30_000)?),
        };

        let pipeline = PipelineConfig {
            max_in_flight: parse_or("MAX_IN_FLIGHT_CLASSIFICATIONS", 4usize)?.max(1),
            heartbeat_interval: Duration::from_secs(parse_or("HEARTBEAT_INTERVAL_SECS", 10)?.max(1)),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "preferences.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let seed = PreferenceSeed {
            api_key: optional("GUARD_API_KEY"),
            enabled: optional("GUARD_ENABLED")
                .map(|value| parse_bool("GUARD_ENABLED", &value))
                .transpose()?,
            muted_words: optional("GUARD_MUTED_WORDS")
                .map(|value| {
                    value
                        .split(',')
                        .map(|part| part.trim().to_string())
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
            display_mode: optional("GUARD_DISPLAY_MODE")
                .map(|value| {
                    DisplayMode::from_str(&value).map_err(|_| ConfigError::Invalid {
                        key: "GUARD_DISPLAY_MODE",
                        value,
                    })
                })
                .transpose()?,
            custom_prompt: optional("GUARD_CUSTOM_PROMPT"),
        };

        Ok(Self {
            page,
            classifier,
            pipeline,
            directories,
            logging,
            seed,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_bool_or(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    optional(key).map_or(Ok(default), |value| parse_bool(key, &value))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_booleans_loosely() {
        assert!(parse_bool("X", " Yes ").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        let err = parse_bool("FEED_EXIT_WHEN_IDLE", "maybe").unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"invalid value for FEED_EXIT_WHEN_IDLE: "maybe""#
        );
    }
}

//! Application configuration management.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppResult;
use crate::media;
use crate::server::StreamOptions;
use crate::state::{StateStore, DEFAULT_APP_NAME};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the per-user config directory holding the state file.
    pub app_name: String,
    /// Explicit state file location, overriding the platform config dir.
    pub state_file: Option<PathBuf>,
    /// Directory used when the state names none.
    pub music_dir: Option<PathBuf>,
    /// Stream server worker threads.
    pub stream_workers: usize,
    /// Time allowed for in-flight streams to finish on shutdown.
    pub shutdown_timeout: Duration,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json or pretty).
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable colored output.
    Pretty,
    /// JSON structured logging.
    Json,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns an error if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_name = var("LITESOUND_APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        let state_file = var("LITESOUND_STATE_FILE").map(PathBuf::from);
        let music_dir = var("LITESOUND_MUSIC_DIR")
            .map(PathBuf::from)
            .or_else(media::default_music_dir);

        let stream_workers = parse_var("LITESOUND_STREAM_WORKERS", var("LITESOUND_STREAM_WORKERS"), 2)?;
        let shutdown_secs: u64 =
            parse_var("LITESOUND_SHUTDOWN_TIMEOUT", var("LITESOUND_SHUTDOWN_TIMEOUT"), 5)?;

        let log_level = var("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match var("LOG_FORMAT")
            .unwrap_or_else(|| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            app_name,
            state_file,
            music_dir,
            stream_workers,
            shutdown_timeout: Duration::from_secs(shutdown_secs),
            log_level,
            log_format,
        })
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_workers == 0 {
            return Err(ConfigError::Invalid(
                "LITESOUND_STREAM_WORKERS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        if let Some(dir) = &self.music_dir {
            if !dir.is_dir() {
                tracing::warn!(
                    music_dir = %dir.display(),
                    "Default music directory does not exist yet"
                );
            }
        }

        Ok(())
    }

    /// Open the state store this configuration points at.
    pub fn open_store(&self) -> AppResult<Arc<StateStore>> {
        let store = match &self.state_file {
            Some(path) => StateStore::new(path),
            None => StateStore::for_app(&self.app_name)?,
        };
        Ok(Arc::new(store.with_default_music_dir(self.music_dir.clone())))
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            workers: self.stream_workers,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key.to_string(), raw)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(String, String),
}

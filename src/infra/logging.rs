//! Usage: Process-wide tracing subscriber (env filter, optional daily rolling file, `log` bridge).

use crate::infra::settings::ClientSettings;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILE_PREFIX: &str = "vimeo-networking.log";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to create log directory at {path:?}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid log filter {filter:?}: {message}")]
    InvalidFilter { filter: String, message: String },
    #[error("tracing subscriber already initialized")]
    SubscriberAlreadySet,
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Used when `RUST_LOG` is unset or unparsable, e.g. `"info"` or `"vimeo_networking=debug"`.
    pub default_filter: String,
    /// Daily rolling files go here; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    pub file_prefix: Option<String>,
}

impl LogOptions {
    pub fn from_filter(filter: impl Into<String>) -> Self {
        Self {
            default_filter: filter.into(),
            ..Self::default()
        }
    }

    /// Seeds the default filter from `ClientSettings::log_filter`.
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::from_filter(settings.log_filter.trim())
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// Keep the returned guard alive for the life of the process when logging to a file; dropping it
/// flushes and stops the background writer.
pub fn init(options: &LogOptions) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), &options.default_filter)?;

    let guard = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::DirectoryCreation {
                path: dir.clone(),
                source,
            })?;
            let prefix = options
                .file_prefix
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_LOG_FILE_PREFIX);
            let appender = tracing_appender::rolling::daily(dir, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|_| LoggingError::SubscriberAlreadySet)?;
            Some(guard)
        }
        None => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|_| LoggingError::SubscriberAlreadySet)?;
            None
        }
    };

    // Another `log` logger may already be installed by the host application.
    if let Err(err) = tracing_log::LogTracer::init() {
        tracing::debug!("log bridge not installed: {}", err);
    }

    Ok(guard)
}

/// `RUST_LOG` wins when it parses; otherwise the configured default (or `info`).
fn build_filter(env_value: Option<&str>, default_filter: &str) -> Result<EnvFilter, LoggingError> {
    if let Some(raw) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        match EnvFilter::try_new(raw) {
            Ok(filter) => return Ok(filter),
            Err(err) => eprintln!("ignoring invalid RUST_LOG {raw:?}: {err}"),
        }
    }

    let fallback = match default_filter.trim() {
        "" => "info",
        other => other,
    };
    EnvFilter::try_new(fallback).map_err(|err| LoggingError::InvalidFilter {
        filter: fallback.to_string(),
        message: err.to_string(),
    })
}

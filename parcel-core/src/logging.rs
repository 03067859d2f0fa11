//! Logging configuration module
//!
//! Console output goes to stderr so command output on stdout stays clean.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,              // log level (trace, debug, info, warn, error)
    pub file_path: Option<PathBuf>, // log directory
    pub rotation: LogRotation,      // log rotation policy
    pub json_format: bool,          // JSON on the console as well as in files
}

/// Log rotation policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

const LOG_FILE_NAME: &str = "parcel.log";

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file_path: None,
            rotation: LogRotation::Daily,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Level for a repeated `-v` count, starting from `base`
    pub fn level_for_verbosity(base: &str, verbosity: u8) -> String {
        const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

        let start = LEVELS
            .iter()
            .position(|l| l.eq_ignore_ascii_case(base))
            .unwrap_or(1);
        let index = (start + verbosity as usize).min(LEVELS.len() - 1);

        LEVELS[index].to_string()
    }

    /// Rolling appender in the configured log directory, if any
    ///
    /// Files are named `parcel.log` plus a date suffix unless rotation is
    /// off. The directory is created when missing.
    pub fn file_appender(&self) -> Result<Option<RollingFileAppender>, InitError> {
        let Some(dir) = &self.file_path else {
            return Ok(None);
        };

        RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(LOG_FILE_NAME)
            .build(dir)
            .map(Some)
    }

    /// Initialize logging; keep the returned guard alive until exit so file
    /// logs are flushed
    pub fn init(&self) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
        // RUST_LOG wins over the configured level
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let console_layer = if self.json_format {
            fmt::layer()
                .with_target(true)
                .with_writer(io::stderr)
                .json()
                .boxed()
        } else {
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_ansi(true)
                .with_writer(io::stderr)
                .boxed()
        };

        let mut guard = None;
        let file_layer = match self.file_appender()? {
            Some(file_appender) => {
                let (writer, file_guard) = non_blocking(file_appender);
                guard = Some(file_guard);

                Some(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_ansi(false)
                        .json()
                        .with_writer(writer),
                )
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        tracing::debug!(
            "Logging initialized - level: {}, file: {:?}",
            self.level,
            self.file_path
        );

        Ok(guard)
    }
}

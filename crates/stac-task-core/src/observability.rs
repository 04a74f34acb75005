//! Structured logging and execution summaries.
//!
//! ## Log Format Options
//!
//! - `json` - one JSON object per event, for log aggregation
//! - `pretty` - multi-line, colored output for development
//! - `compact` - colored single-line output for terminals
//!
//! `RUST_LOG` overrides the level given to [`init_logging`].

use std::time::Duration;

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::domain::ids::ExecutionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}

impl LogFormat {
    /// Unknown names fall back to `Compact`.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Unknown levels fall back to `INFO`.
pub fn parse_level(s: &str) -> Level {
    match s.to_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" | "WARNING" => Level::WARN,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Install the global subscriber. Fails if one is already installed.
///
/// Logs go to stderr so a payload printed on stdout stays parseable.
pub fn init_logging(level: Level, format: LogFormat) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => subscriber
            .with(fmt::layer().pretty().with_ansi(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => subscriber
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(true)
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
}

/// What one execution did, logged when it finishes.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub task: String,
    pub version: String,
    pub items_in: usize,
    pub items_out: usize,
    pub elapsed_ms: u64,
}

impl ExecutionSummary {
    pub fn new(
        execution_id: ExecutionId,
        task: &str,
        version: &str,
        items_in: usize,
        items_out: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            task: task.to_string(),
            version: version.to_string(),
            items_in,
            items_out,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

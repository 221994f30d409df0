//! Bastion Logging
//!
//! One place to install the global `tracing` subscriber. The filter comes
//! from `RUST_LOG` when set, otherwise from the caller's default
//! directive:
//!
//! ```no_run
//! bastion_logging::init("bastion=info");
//! tracing::info!("Starting fleet");
//! ```

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for Bastion binaries.
pub const DEFAULT_FILTER: &str = "bastion=info";

/// Output style of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line records with targets
    #[default]
    Full,
    /// Multi-line, human-oriented
    Pretty,
    /// Terse single-line records
    Compact,
}

/// Unknown log format name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log format '{0}' (expected full, pretty or compact)")]
pub struct ParseLogFormatError(String);

impl FromStr for LogFormat {
    type Err = ParseLogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(LogFormat::Full),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(ParseLogFormatError(other.to_string())),
        }
    }
}

/// Errors from installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber is already installed
    #[error("failed to install tracing subscriber: {0}")]
    AlreadyInstalled(#[from] TryInitError),
}

fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into())
}

/// Install the global subscriber, failing if one already exists.
pub fn try_init_with(default_filter: &str, format: LogFormat) -> Result<(), LoggingError> {
    let registry = tracing_subscriber::registry().with(filter(default_filter));
    match format {
        LogFormat::Full => registry.with(fmt::layer()).try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
    }
    Ok(())
}

/// Install the global subscriber with the default format.
pub fn try_init(default_filter: &str) -> Result<(), LoggingError> {
    try_init_with(default_filter, LogFormat::default())
}

/// Install the global subscriber, ignoring an already-installed one.
pub fn init(default_filter: &str) {
    if let Err(e) = try_init(default_filter) {
        tracing::debug!("Logging already initialised: {}", e);
    }
}

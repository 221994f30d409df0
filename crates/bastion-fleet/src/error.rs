//! Error types for the fleet manager.

use std::path::PathBuf;

use bastion_faults::FaultTableError;
use bastion_monitor::DetectorConfigError;
use bastion_node::NodeError;
use thiserror::Error;

/// Result type for fleet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Invalid or unreadable configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Fleet must have at least one node
    #[error("num_nodes must be greater than 0")]
    NoNodes,

    /// A threshold outside (0, 1]
    #[error("{name} must be in (0, 1], got {value}")]
    Threshold { name: &'static str, value: f64 },

    /// A non-positive or non-finite interval
    #[error("{name} must be a positive number of seconds, got {value}")]
    Interval { name: &'static str, value: f64 },

    /// A count that must be at least some minimum
    #[error("{name} must be at least {min}, got {value}")]
    TooSmall {
        name: &'static str,
        min: u64,
        value: u64,
    },

    /// Bad fault probability table
    #[error("invalid fault table: {0}")]
    Faults(#[from] FaultTableError),

    /// Bad detector settings
    #[error("invalid detector config: {0}")]
    Detector(#[from] DetectorConfigError),

    /// Config file could not be read
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this schema
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable holds an unparseable value
    #[error("invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },
}

/// Errors that can occur in fleet operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid node reference
    #[error("Invalid node reference: {0}")]
    Node(#[from] NodeError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

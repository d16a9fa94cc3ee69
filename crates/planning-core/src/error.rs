//! Error types for the planning core
//!
//! The aggregation passes themselves never fail: malformed rows degrade to
//! zero, empty selections produce empty rollups, and non-numeric edits count
//! as zero. Errors only surface at the boundaries:
//! - Decoding rows, updates, and edits from JSON
//! - Decoding configuration from TOML
//! - Reading input files
//! - Validating configuration values

use std::path::PathBuf;

/// Main planning error type
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    /// JSON payload could not be decoded
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration could not be decoded
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error while reading an input file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration value out of range
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Month key is not `YYYY-MM`
    #[error("invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    /// Unknown hierarchy level name
    #[error("unknown hierarchy level: {0}")]
    UnknownLevel(String),
}

impl PlanningError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if error stems from configuration
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Toml(_) | Self::InvalidConfig(_) | Self::InvalidMonth(_)
        )
    }
}

/// Result alias for boundary operations
pub type Result<T> = std::result::Result<T, PlanningError>;

//! Error types for settings loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading or validating a `memocc.toml` document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No settings document exists at the expected location.
    #[error("settings file not found: {}", path.display())]
    NotFound {
        /// The location that was probed.
        path: PathBuf,
    },

    /// An I/O error occurred while reading the settings file.
    #[error("failed to read settings from {}: {source}", path.display())]
    Io {
        /// The settings file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings: {0}")]
    ParseError(String),

    /// A required field is missing from the settings.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A settings value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

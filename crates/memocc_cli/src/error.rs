//! Fatal errors of one wrapped invocation.

use memocc_config::ConfigError;
use memocc_driver::{CompilerError, LocateError};

/// Exit code for configuration and compiler-location failures.
pub const EXIT_CONFIG: i32 = 2;

/// Exit code when the compiler outlived its timeout.
pub const EXIT_TIMEOUT: i32 = 124;

/// Exit code when the compiler could not be started.
pub const EXIT_SPAWN: i32 = 127;

/// Errors that stop the wrapper before it can produce outputs.
///
/// Everything else (dependency listing, keys, the store, the index) degrades
/// to a direct compile and never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum WrapError {
    /// The settings document is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The real compiler could not be located.
    #[error("{0}")]
    Locate(#[from] LocateError),

    /// The compiler could not be run to completion.
    #[error("{0}")]
    Compiler(#[from] CompilerError),
}

impl WrapError {
    /// Returns the process exit code this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Locate(_) => EXIT_CONFIG,
            Self::Compiler(CompilerError::Timeout { .. }) => EXIT_TIMEOUT,
            Self::Compiler(CompilerError::Spawn { .. }) => EXIT_SPAWN,
            Self::Compiler(CompilerError::Wait { .. }) => 1,
        }
    }
}

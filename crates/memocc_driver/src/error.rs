//! Error types for locating and running the wrapped compiler.

use std::path::PathBuf;
use std::time::Duration;

/// The real compiler could not be found on the search path.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// No directory on the search path holds the tool.
    #[error("'{tool}' was not found on the search path")]
    NotFound {
        /// The tool name searched for.
        tool: String,
    },

    /// Every match on the search path is this wrapper itself.
    #[error("the only '{tool}' on the search path is this wrapper")]
    OnlySelf {
        /// The tool name searched for.
        tool: String,
    },

    /// The search-path environment variable is unset.
    #[error("the PATH environment variable is not set")]
    NoSearchPath,
}

/// The compiler subprocess could not be run to completion.
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    /// The process could not be started.
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        /// The program that failed to start.
        program: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Waiting on or reading from the process failed.
    #[error("failed while waiting for {}: {source}", program.display())]
    Wait {
        /// The running program.
        program: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The process outlived the configured timeout and was killed.
    #[error("{} timed out after {}s", program.display(), after.as_secs_f64())]
    Timeout {
        /// The program that was killed.
        program: PathBuf,
        /// The timeout that elapsed.
        after: Duration,
    },
}

/// Dependency listing failed; no cache key can be formed.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    /// The listing subprocess could not be run.
    #[error("dependency listing failed to run: {0}")]
    Compiler(#[from] CompilerError),

    /// The listing subprocess exited unsuccessfully.
    #[error("dependency listing exited with code {code}: {stderr}")]
    ExitStatus {
        /// The exit code.
        code: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The listing output was not valid UTF-8.
    #[error("dependency listing is not valid UTF-8")]
    NotUtf8,

    /// A line of the listing does not have the `output: inputs` form.
    #[error("unparseable dependency line {line_no}: '{line}'")]
    Unparseable {
        /// One-based line number.
        line_no: usize,
        /// The offending line.
        line: String,
    },

    /// The listing named no outputs at all.
    #[error("dependency listing is empty")]
    Empty,
}

//! Settings types deserialized from `memocc.toml`.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The wrapper settings parsed from `memocc.toml`.
///
/// Only `cache_dir` is required. Everything else describes how the wrapped
/// compiler spells its flags and has defaults matching `glslc`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root directory holding cached artifacts and index documents.
    ///
    /// After loading, a relative path has already been resolved against the
    /// directory containing the settings file.
    #[serde(default)]
    pub cache_dir: PathBuf,

    /// Explicit path to the real compiler. Skips the search-path scan.
    #[serde(default)]
    pub compiler: Option<PathBuf>,

    /// Flag that switches the compiler into dependency-listing mode.
    #[serde(default = "default_dependency_flag")]
    pub dependency_flag: String,

    /// Flags requesting compile-only or assemble-only output.
    ///
    /// When none of these appear in an invocation the compiler links, and the
    /// dependency map collapses to a single output.
    #[serde(default = "default_compile_only_flags")]
    pub compile_only_flags: Vec<String>,

    /// Name of the linked artifact when no `-o` is given in link mode.
    #[serde(default = "default_output")]
    pub default_output: String,

    /// Flags that make the compiler write something the dependency listing does
    /// not name (stdout, or a depfile). Invocations carrying them bypass the cache.
    ///
    /// An argument matches if it equals a flag or starts with it, so joined
    /// forms such as `-MFshader.d` are caught.
    #[serde(default = "default_bypass_flags")]
    pub bypass_flags: Vec<String>,

    /// Upper bound on one compiler subprocess, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Creates settings with the given cache root and every other field defaulted.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            compiler: None,
            dependency_flag: default_dependency_flag(),
            compile_only_flags: default_compile_only_flags(),
            default_output: default_output(),
            bypass_flags: default_bypass_flags(),
            timeout_secs: None,
        }
    }

    /// Returns the configured compiler timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_dependency_flag() -> String {
    "-M".to_string()
}

fn default_compile_only_flags() -> Vec<String> {
    vec!["-c".to_string(), "-S".to_string()]
}

fn default_output() -> String {
    "a.spv".to_string()
}

fn default_bypass_flags() -> Vec<String> {
    ["-E", "-M", "-MM", "-MD", "-MF", "-MT"]
        .iter()
        .map(|flag| flag.to_string())
        .collect()
}

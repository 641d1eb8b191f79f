//! Settings file discovery, loading, and validation.

use crate::error::ConfigError;
use crate::types::Settings;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// File name of the settings document.
pub const SETTINGS_FILE: &str = "memocc.toml";

/// Environment variable that points at a settings document.
pub const SETTINGS_ENV: &str = "MEMOCC_CONFIG";

/// Determines which settings file to load.
///
/// An explicit path wins, then `$MEMOCC_CONFIG`, then `memocc.toml` next to
/// the running executable.
pub fn discover_settings(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let exe = std::env::current_exe().map_err(|e| ConfigError::Io {
        path: PathBuf::from("<current executable>"),
        source: e,
    })?;
    Ok(settings_path(std::env::var_os(SETTINGS_ENV), &exe))
}

fn settings_path(env_value: Option<OsString>, exe: &Path) -> PathBuf {
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => exe
            .parent()
            .map(|dir| dir.join(SETTINGS_FILE))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE)),
    }
}

/// Loads and validates a settings document from disk.
///
/// A relative `cache_dir` is resolved against the directory holding the file.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    load_settings_from_str(&content, base_dir)
}

/// Parses and validates a settings document from a string.
///
/// `base_dir` anchors a relative `cache_dir`.
pub fn load_settings_from_str(content: &str, base_dir: &Path) -> Result<Settings, ConfigError> {
    let mut settings: Settings =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_settings(&settings)?;
    if settings.cache_dir.is_relative() {
        settings.cache_dir = base_dir.join(&settings.cache_dir);
    }
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.cache_dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("cache_dir".to_string()));
    }
    if settings.dependency_flag.is_empty() {
        return Err(ConfigError::ValidationError(
            "dependency_flag must not be empty".to_string(),
        ));
    }
    if settings.default_output.is_empty() {
        return Err(ConfigError::ValidationError(
            "default_output must not be empty".to_string(),
        ));
    }
    if settings.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

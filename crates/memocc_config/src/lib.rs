//! Loading and validation of `memocc.toml` settings files.
//!
//! The settings document names the cache root and carries the few knobs that
//! describe how the wrapped compiler is driven. There is no fallback location
//! for the cache, so a missing or incomplete document is always fatal.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{discover_settings, load_settings, load_settings_from_str, SETTINGS_ENV, SETTINGS_FILE};
pub use types::Settings;

//! `memocc index`: dump the current project's cache index.

use memocc_cache::Cache;
use memocc_config::{discover_settings, load_settings};

use crate::GlobalArgs;

/// Prints the index document as pretty JSON, or its path when `path_only` is set.
pub fn run(path_only: bool, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = load_settings(&discover_settings(global.config.as_deref())?)?;
    let project_dir = std::env::current_dir()?;
    let cache = Cache::open(&settings.cache_dir, &project_dir);

    if path_only {
        println!("{}", cache.index_file().path().display());
        return Ok(0);
    }
    let index = cache.load_index()?;
    println!("{}", index.to_json_pretty()?);
    Ok(0)
}

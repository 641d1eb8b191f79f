//! `memocc exec` and masquerade mode: one wrapped compile.

use std::ffi::OsString;
use std::path::PathBuf;

use memocc_cli::{resolve_compiler, Outcome, WrapError, Wrapper};
use memocc_config::{discover_settings, load_settings, ConfigError};
use memocc_driver::{Invocation, ProcessCompiler};
use tracing::debug;

use crate::GlobalArgs;

/// Runs `tool` with `args` through the cache and returns the exit code.
///
/// Fatal errors are reported on stderr and mapped to their exit codes.
pub fn run(tool: &str, args: Vec<OsString>, global: &GlobalArgs) -> i32 {
    match wrap(tool, args, global) {
        Ok(outcome) => {
            debug!(?outcome, "done");
            outcome.exit_code()
        }
        Err(err) => {
            eprintln!("memocc: {err}");
            err.exit_code()
        }
    }
}

fn wrap(tool: &str, args: Vec<OsString>, global: &GlobalArgs) -> Result<Outcome, WrapError> {
    let settings_path = discover_settings(global.config.as_deref())?;
    let settings = load_settings(&settings_path)?;
    debug!(
        settings = %settings_path.display(),
        cache_dir = %settings.cache_dir.display(),
        "loaded settings"
    );

    let program = resolve_compiler(tool, &settings)?;
    debug!(compiler = %program.display(), "resolved compiler");

    let project_dir = std::env::current_dir().map_err(|e| ConfigError::Io {
        path: PathBuf::from("."),
        source: e,
    })?;
    let compiler = ProcessCompiler::new(settings.timeout());
    let wrapper = Wrapper::new(compiler, settings, &project_dir);
    wrapper.execute(&Invocation::new(program, args))
}

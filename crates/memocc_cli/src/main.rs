//! memocc: a memoizing wrapper for single-file compilers.
//!
//! Installed under a compiler's name (for example a `glslc` symlink early on
//! `PATH`), the binary wraps that compiler and passes every argument through.
//! Invoked as `memocc`, it offers `memocc exec` for explicit wrapped runs,
//! `memocc locate` to show which compiler would be wrapped, and `memocc index`
//! to dump the current project's cache index.

#![warn(missing_docs)]

mod exec;
mod index;
mod locate;
mod logging;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

/// Binary name that selects the admin CLI instead of masquerade mode.
const ADMIN_NAME: &str = "memocc";

/// memocc: cache compiler outputs keyed by arguments and input content.
#[derive(Parser, Debug)]
#[command(name = "memocc", version, about = "Memoizing compiler wrapper")]
pub struct Cli {
    /// Suppress all log output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) log output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `memocc.toml` settings file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a compiler through the cache.
    Exec {
        /// Compiler name, looked up on `PATH` unless settings name one.
        tool: String,

        /// Arguments passed to the compiler unchanged.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// List every match for a tool on `PATH` and mark the one that would run.
    Locate {
        /// Compiler name.
        tool: String,
    },
    /// Print the cache index of the current directory.
    Index {
        /// Print the index document's location instead of its contents.
        #[arg(long)]
        path: bool,
    },
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Optional path to a settings file.
    pub config: Option<PathBuf>,
}

fn main() {
    let mut argv = std::env::args_os();
    let argv0 = argv.next().unwrap_or_default();

    if let Some(tool) = masquerade_tool(&argv0) {
        logging::init(false, false);
        let global = GlobalArgs { config: None };
        process::exit(exec::run(&tool, argv.collect(), &global));
    }

    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);
    let global = GlobalArgs { config: cli.config };

    let result = match cli.command {
        Command::Exec { tool, args } => Ok(exec::run(&tool, args, &global)),
        Command::Locate { tool } => locate::run(&tool),
        Command::Index { path } => index::run(path, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("memocc: error: {e}");
            process::exit(1);
        }
    }
}

/// Returns the tool to wrap when the binary runs under a name other than `memocc`.
fn masquerade_tool(argv0: &OsStr) -> Option<String> {
    let stem = Path::new(argv0).file_stem()?.to_str()?;
    if stem.is_empty() || stem == ADMIN_NAME {
        return None;
    }
    Some(stem.to_string())
}

//! Driving the wrapped compiler.
//!
//! This crate finds the real compiler on the search path, runs it as an opaque
//! subprocess (optionally under a timeout), and asks it which input files each
//! of its outputs depends on.

#![warn(missing_docs)]

pub mod compiler;
pub mod deps;
pub mod error;
pub mod invocation;
pub mod locate;

pub use compiler::{CapturedOutput, Compiler, ProcessCompiler};
pub use deps::{parse_listing, resolve_dependencies, DependencyEntry, DependencyMap};
pub use error::{CompilerError, DependencyError, LocateError};
pub use invocation::Invocation;
pub use locate::{find_all, locate_compiler, select_compiler};

//! Memoizing wrapper for single-file compilers such as `glslc`.
//!
//! The wrapper asks the compiler which files an invocation reads, keys the
//! invocation by its argument list and the bytes of those files, and restores
//! previously produced outputs instead of compiling again when both keys match.

#![warn(missing_docs)]

pub mod error;
pub mod wrapper;

pub use error::{WrapError, EXIT_CONFIG, EXIT_SPAWN, EXIT_TIMEOUT};
pub use wrapper::{resolve_compiler, Outcome, Wrapper};

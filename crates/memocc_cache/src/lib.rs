//! Content-addressed compile cache.
//!
//! This crate derives cache keys from an invocation's argument list and the
//! bytes of its input files, stores compiler outputs under the SHA-256 digest
//! of their content, and keeps a per-project index mapping
//! `(command key, content key)` to the outputs that invocation produced.

#![warn(missing_docs)]

pub mod cache;
pub mod digest;
pub mod error;
pub mod index;
pub mod keys;
pub mod store;

pub use cache::Cache;
pub use digest::ContentDigest;
pub use error::CacheError;
pub use index::{CacheIndex, IndexFile, OutputMap};
pub use keys::{artifact_digest, command_key, content_key, CommandKey};
pub use store::ContentStore;

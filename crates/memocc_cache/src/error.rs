//! Error types for cache operations.

use std::path::PathBuf;

use crate::digest::ContentDigest;

/// Errors that can occur during cache operations.
///
/// None of these abort a build. The orchestrator turns every one of them into
/// a cache miss or a skipped cache update and falls back to running the
/// compiler directly.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The index document could not be parsed as valid JSON.
    #[error("failed to parse cache index {}: {reason}", path.display())]
    IndexParse {
        /// The index document path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A serialization error occurred while writing the index.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The index references an artifact the store does not hold.
    #[error("artifact {digest} is missing from the content store")]
    ArtifactMissing {
        /// Digest of the absent artifact.
        digest: ContentDigest,
    },

    /// A stored artifact's bytes no longer hash to its name.
    #[error("artifact {digest} is corrupt: content hashes to {actual}")]
    ArtifactCorrupt {
        /// Digest the artifact is stored under.
        digest: ContentDigest,
        /// Digest of the bytes actually found.
        actual: ContentDigest,
    },

    /// A string is not a valid hex-encoded digest.
    #[error("invalid digest '{value}': {reason}")]
    InvalidDigest {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The index lock could not be acquired.
    #[error("failed to lock cache index {}: {source}", path.display())]
    Lock {
        /// The lock file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl CacheError {
    /// Returns `true` if the error means a referenced artifact cannot be restored.
    pub fn is_unusable_artifact(&self) -> bool {
        matches!(
            self,
            Self::ArtifactMissing { .. } | Self::ArtifactCorrupt { .. }
        )
    }
}

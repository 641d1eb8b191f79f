//! SHA-256 content digests used for both cache keys and artifact names.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// Length of a digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// A 256-bit SHA-256 digest, rendered as 64 lowercase hex characters.
///
/// The same digest type names artifacts in the content store and forms the
/// content half of every index key, so a store lookup and an index lookup are
/// always key-compatible.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Digests an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Digests everything a reader yields, without buffering it all in memory.
    pub fn from_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        std::io::copy(reader, &mut hasher)?;
        Ok(Self::from_hasher(hasher))
    }

    /// Streams a file's bytes through the hash.
    pub fn of_file(path: &Path) -> Result<Self, CacheError> {
        let mut file = std::fs::File::open(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(&mut file).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub(crate) fn from_hasher(hasher: Sha256) -> Self {
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

impl FromStr for ContentDigest {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| CacheError::InvalidDigest {
            value: s.to_string(),
            reason,
        };
        if s.len() != DIGEST_LEN * 2 {
            return Err(invalid(format!(
                "expected {} hex characters, got {}",
                DIGEST_LEN * 2,
                s.len()
            )));
        }
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(invalid("digest must be lowercase".to_string()));
        }
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| invalid(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.to_string()
    }
}

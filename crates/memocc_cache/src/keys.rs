//! Cache key derivation.
//!
//! An invocation is identified by two keys. The command key is the literal
//! argument list joined with single spaces: no normalization, so reordered or
//! respelled flags land in a different bucket. The content key is one SHA-256
//! digest over the bytes of every input file, streamed in dependency-map order.
//! File metadata never participates.

use std::ffi::OsStr;
use std::fmt;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::digest::ContentDigest;
use crate::error::CacheError;

/// The identity of an invocation's argument list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandKey(String);

impl CommandKey {
    /// Returns the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Joins the full, ordered argument list (program included) with single spaces.
///
/// Arguments that are not valid UTF-8 are rendered lossily.
pub fn command_key<I, S>(argv: I) -> CommandKey
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let parts: Vec<String> = argv
        .into_iter()
        .map(|arg| arg.as_ref().to_string_lossy().into_owned())
        .collect();
    CommandKey(parts.join(" "))
}

/// Digests the concatenated bytes of every input file, in the order given.
///
/// No length or separator is mixed in between files, so moving bytes across a
/// file boundary (`"ab" + "c"` versus `"a" + "bc"`) yields the same key. A
/// single-input key is the plain digest of that file.
pub fn content_key<I, P>(inputs: I) -> Result<ContentDigest, CacheError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    for input in inputs {
        let path = input.as_ref();
        let io_err = |e: std::io::Error| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        let mut file = std::fs::File::open(path).map_err(io_err)?;
        loop {
            let n = file.read(&mut buf).map_err(io_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }
    Ok(ContentDigest::from_hasher(hasher))
}

/// Digests one file for addressing it in the content store.
pub fn artifact_digest(path: &Path) -> Result<ContentDigest, CacheError> {
    ContentDigest::of_file(path)
}

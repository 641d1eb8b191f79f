//! Content-addressed artifact storage.
//!
//! Every compiler output is stored once at `<cache_dir>/<digest>`, where the
//! digest is the SHA-256 of its bytes. Writes go through a temp file under
//! `<cache_dir>/tmp/` and are renamed into place, so an interrupted write never
//! leaves a file under a digest name that its content does not hash to.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::digest::ContentDigest;
use crate::error::CacheError;

/// Subdirectory for in-flight writes.
const TMP_SUBDIR: &str = "tmp";

/// Content-addressed store for compiled artifacts.
#[derive(Debug, Clone)]
pub struct ContentStore {
    /// Root cache directory.
    root: PathBuf,
}

impl ContentStore {
    /// Creates a store rooted at the given cache directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Returns the file path an artifact with the given digest lives at.
    pub fn artifact_path(&self, digest: &ContentDigest) -> PathBuf {
        self.root.join(digest.to_string())
    }

    /// Returns `true` if an artifact is stored under the digest.
    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.artifact_path(digest).is_file()
    }

    /// Copies a file's current bytes into the store and returns their digest.
    ///
    /// The bytes are hashed while they are copied, so the name always matches
    /// what was written even if the source changes concurrently. Storing content
    /// that is already present leaves the existing artifact untouched, unless
    /// that artifact no longer matches its name, in which case it is replaced.
    pub fn put(&self, source: &Path) -> Result<ContentDigest, CacheError> {
        let tmp_dir = self.root.join(TMP_SUBDIR);
        std::fs::create_dir_all(&tmp_dir).map_err(|e| CacheError::Io {
            path: tmp_dir.clone(),
            source: e,
        })?;

        let source_err = |e: std::io::Error| CacheError::Io {
            path: source.to_path_buf(),
            source: e,
        };
        let tmp_err = |e: std::io::Error| CacheError::Io {
            path: tmp_dir.clone(),
            source: e,
        };

        let mut input = std::fs::File::open(source).map_err(source_err)?;
        let mut tmp = NamedTempFile::new_in(&tmp_dir).map_err(tmp_err)?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = input.read(&mut buf).map_err(source_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            tmp.write_all(&buf[..n]).map_err(tmp_err)?;
        }
        let digest = ContentDigest::from_hasher(hasher);

        let target = self.artifact_path(&digest);
        if ContentDigest::of_file(&target).ok() == Some(digest) {
            debug!(%digest, "artifact already stored");
            return Ok(digest);
        }

        tmp.as_file().sync_all().map_err(tmp_err)?;
        tmp.persist(&target).map_err(|e| CacheError::Io {
            path: target.clone(),
            source: e.error,
        })?;
        debug!(%digest, source = %source.display(), "stored artifact");
        Ok(digest)
    }

    /// Reads an artifact's bytes, verifying they still hash to its name.
    pub fn get(&self, digest: &ContentDigest) -> Result<Vec<u8>, CacheError> {
        let path = self.artifact_path(digest);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::ArtifactMissing { digest: *digest });
            }
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };

        let actual = ContentDigest::from_bytes(&bytes);
        if actual != *digest {
            return Err(CacheError::ArtifactCorrupt {
                digest: *digest,
                actual,
            });
        }
        Ok(bytes)
    }
}

/// Replaces `target` with `bytes` in one rename.
///
/// Missing parent directories are created. A reader never sees a partially
/// written target.
pub(crate) fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let io_err = |e: std::io::Error| CacheError::Io {
        path: target.to_path_buf(),
        source: e,
    };

    std::fs::create_dir_all(parent).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(target).map_err(|e| io_err(e.error))?;
    Ok(())
}

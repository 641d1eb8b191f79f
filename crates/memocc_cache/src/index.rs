//! Per-project cache index.
//!
//! The index is one JSON document per project directory with the shape
//! `{ command_key: { content_key: { output_path: output_digest } } }`. It lives
//! at `<cache_dir>/index/<digest of the absolute project path>.json`, so
//! projects that share a directory basename never share an index.
//!
//! Updates take an exclusive lock on a sibling `.lock` file, re-read the
//! document under the lock, merge the new entry, and replace the document with
//! a single rename. Concurrent writers serialize instead of losing updates, and
//! an interrupted writer leaves the previous document intact.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::digest::ContentDigest;
use crate::error::CacheError;
use crate::keys::CommandKey;

/// Subdirectory holding index documents and their lock files.
const INDEX_SUBDIR: &str = "index";

/// Output path → digest of the bytes that invocation wrote there.
pub type OutputMap = BTreeMap<String, ContentDigest>;

/// In-memory form of one index document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheIndex {
    entries: BTreeMap<String, BTreeMap<ContentDigest, OutputMap>>,
}

impl CacheIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the outputs recorded for a command and content key pair.
    pub fn lookup(&self, command: &CommandKey, content: &ContentDigest) -> Option<&OutputMap> {
        self.entries.get(command.as_str())?.get(content)
    }

    /// Inserts or overwrites the entry for a command and content key pair.
    pub fn insert(&mut self, command: &CommandKey, content: ContentDigest, outputs: OutputMap) {
        self.entries
            .entry(command.as_str().to_string())
            .or_default()
            .insert(content, outputs);
    }

    /// Returns the number of recorded (command, content) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, CacheError> {
        serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })
    }
}

/// Location of one project's index document inside the cache root.
#[derive(Debug, Clone)]
pub struct IndexFile {
    path: PathBuf,
    lock_path: PathBuf,
}

impl IndexFile {
    /// Returns the index location for a project directory.
    ///
    /// `project_dir` should be absolute; its full path, not its basename,
    /// selects the document.
    pub fn for_project(cache_dir: &Path, project_dir: &Path) -> Self {
        let name = ContentDigest::from_bytes(project_dir.to_string_lossy().as_bytes()).to_string();
        let dir = cache_dir.join(INDEX_SUBDIR);
        Self {
            path: dir.join(format!("{name}.json")),
            lock_path: dir.join(format!("{name}.lock")),
        }
    }

    /// Returns the path of the index document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document, or returns an empty index if none exists yet.
    pub fn load(&self) -> Result<CacheIndex, CacheError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no index yet, starting empty");
                return Ok(CacheIndex::new());
            }
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&content).map_err(|e| CacheError::IndexParse {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Records an entry and persists the whole document atomically.
    ///
    /// Returns the document as written. An unreadable existing document is
    /// replaced rather than merged.
    pub fn record(
        &self,
        command: &CommandKey,
        content: ContentDigest,
        outputs: OutputMap,
    ) -> Result<CacheIndex, CacheError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| CacheError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let lock_err = |e: std::io::Error| CacheError::Lock {
            path: self.lock_path.clone(),
            source: e,
        };
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(lock_err)?;
        FileExt::lock_exclusive(&lock).map_err(lock_err)?;

        let mut index = match self.load() {
            Ok(index) => index,
            Err(err @ CacheError::IndexParse { .. }) => {
                warn!(error = %err, "discarding unreadable cache index");
                CacheIndex::new()
            }
            Err(err) => return Err(err),
        };
        index.insert(command, content, outputs);
        self.write(dir, &index)?;
        debug!(path = %self.path.display(), entries = index.len(), "index updated");

        // Closing the handle releases the lock.
        drop(lock);
        Ok(index)
    }

    fn write(&self, dir: &Path, index: &CacheIndex) -> Result<(), CacheError> {
        let json = index.to_json_pretty()?;
        let io_err = |e: std::io::Error| CacheError::Io {
            path: self.path.clone(),
            source: e,
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

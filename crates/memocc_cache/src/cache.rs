//! High-level cache facade.
//!
//! `Cache` ties the content store and one project's index document together
//! into the three operations the wrapper needs: look up a pair of keys,
//! restore the outputs of a hit, and populate the cache after a successful
//! compile.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::digest::ContentDigest;
use crate::error::CacheError;
use crate::index::{CacheIndex, IndexFile, OutputMap};
use crate::keys::CommandKey;
use crate::store::{write_atomic, ContentStore};

/// Cache handle for one project directory.
#[derive(Debug, Clone)]
pub struct Cache {
    /// Root directory for all cache files.
    cache_dir: PathBuf,

    /// Directory that relative input and output paths are resolved against.
    project_dir: PathBuf,

    /// Content-addressed artifact store shared by every project.
    store: ContentStore,

    /// This project's index document.
    index: IndexFile,
}

impl Cache {
    /// Opens the cache rooted at `cache_dir` for the given project directory.
    ///
    /// Nothing is touched on disk until something is stored or recorded.
    pub fn open(cache_dir: &Path, project_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            project_dir: project_dir.to_path_buf(),
            store: ContentStore::new(cache_dir),
            index: IndexFile::for_project(cache_dir, project_dir),
        }
    }

    /// Returns the cache root.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolves a path named by the compiler against the project directory.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.project_dir.join(path)
    }

    /// Returns the content store.
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Returns the project's index file.
    pub fn index_file(&self) -> &IndexFile {
        &self.index
    }

    /// Reads the project's index document.
    pub fn load_index(&self) -> Result<CacheIndex, CacheError> {
        self.index.load()
    }

    /// Looks up the outputs recorded for a pair of keys.
    ///
    /// An unreadable index is reported and treated as a miss.
    pub fn lookup(&self, command: &CommandKey, content: &ContentDigest) -> Option<OutputMap> {
        match self.index.load() {
            Ok(index) => index.lookup(command, content).cloned(),
            Err(err) => {
                warn!(error = %err, "cache index unreadable, treating as miss");
                None
            }
        }
    }

    /// Writes every output of a hit back to its target path.
    ///
    /// All artifacts are read and verified before any target is written, so
    /// a missing or corrupt artifact leaves the working tree untouched.
    pub fn restore(&self, outputs: &OutputMap) -> Result<(), CacheError> {
        let staged = outputs
            .iter()
            .map(|(path, digest)| self.store.get(digest).map(|bytes| (path, bytes)))
            .collect::<Result<Vec<_>, CacheError>>()?;

        for (path, bytes) in staged {
            write_atomic(&self.resolve(path), &bytes)?;
            debug!(output = %path, "restored from cache");
        }
        Ok(())
    }

    /// Copies freshly compiled outputs into the store.
    ///
    /// Returns the output → digest map to record, keyed by the paths as given.
    pub fn store_outputs<P: AsRef<Path>>(&self, outputs: &[P]) -> Result<OutputMap, CacheError> {
        let mut map = OutputMap::new();
        for output in outputs {
            let path = output.as_ref();
            let digest = self.store.put(&self.resolve(path))?;
            map.insert(path.to_string_lossy().into_owned(), digest);
        }
        Ok(map)
    }

    /// Records an entry in the project's index.
    pub fn record(
        &self,
        command: &CommandKey,
        content: ContentDigest,
        outputs: OutputMap,
    ) -> Result<(), CacheError> {
        self.index.record(command, content, outputs).map(|_| ())
    }
}

//! FileStore: filesystem-based content-addressed object storage.
//!
//! Objects are written once under a two-level sharded layout and never
//! mutated or deleted:
//!
//! ```text
//! {root}/objects/
//! ├── ab/
//! │   └── cdef0123...  # content file (remainder of hash)
//! └── 12/
//!     └── 3456789...
//! ```
//!
//! Writes are idempotent: storing bytes that already exist is a no-op, so
//! concurrent stores of the same content need no coordination.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::StashConfig;
use crate::hash::ContentHash;

/// Trait for content storage backends.
///
/// This allows for alternative implementations (e.g., in-memory for testing,
/// remote storage, caching layers).
pub trait ContentStore: Send + Sync {
    /// Store data, returning its content hash.
    ///
    /// If the data already exists, returns the hash without writing.
    fn store(&self, data: &[u8]) -> Result<ContentHash>;

    /// Retrieve data by its content hash.
    ///
    /// Returns `Ok(None)` if the hash doesn't exist. Lookup is purely by
    /// identifier - the revision history and working tree play no part, so
    /// content stays retrievable after its path is rebound.
    fn retrieve(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>>;

    /// Check if content exists without retrieving it.
    fn exists(&self, hash: &ContentHash) -> bool;

    /// Get the filesystem path for content (if available).
    fn path(&self, hash: &ContentHash) -> Option<PathBuf>;
}

/// Filesystem-based content store.
#[derive(Debug, Clone)]
pub struct FileStore {
    config: StashConfig,
}

impl FileStore {
    /// Create a new FileStore with the given configuration.
    ///
    /// Creates the objects directory if it doesn't exist.
    pub fn new(config: StashConfig) -> Result<Self> {
        fs::create_dir_all(config.objects_dir())
            .context("failed to create objects directory")?;

        Ok(Self { config })
    }

    /// Create a FileStore at a specific storage root.
    pub fn at_root(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(StashConfig::with_root(path))
    }

    /// Get the configuration.
    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    /// Get the path where an object would be stored.
    fn object_path(&self, hash: &ContentHash) -> PathBuf {
        self.config
            .objects_dir()
            .join(hash.prefix())
            .join(hash.remainder())
    }
}

impl ContentStore for FileStore {
    fn store(&self, data: &[u8]) -> Result<ContentHash> {
        let hash = ContentHash::from_data(data);
        let obj_path = self.object_path(&hash);

        if let Some(parent) = obj_path.parent() {
            fs::create_dir_all(parent).context("failed to create object prefix directory")?;
        }

        // Skip if exists - content-addressed = idempotent
        if !obj_path.exists() {
            fs::write(&obj_path, data).context("failed to write object file")?;
        }

        Ok(hash)
    }

    fn retrieve(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(hash);

        if path.exists() {
            let data = fs::read(&path).context("failed to read object file")?;
            Ok(Some(data))
        } else {
            Ok(None)
        }
    }

    fn exists(&self, hash: &ContentHash) -> bool {
        self.object_path(hash).exists()
    }

    fn path(&self, hash: &ContentHash) -> Option<PathBuf> {
        let path = self.object_path(hash);
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }
}

//! Repository: the explicitly constructed aggregate of store + history.
//!
//! One handle owns the whole storage root and is shared (via `Arc`) across
//! request handlers. Writers go through [`Repository::upload`], which
//! orchestrates sanitize → store → commit; reads go through
//! [`Repository::resolve`], which needs no locking because objects are
//! immutable once written.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::config::StashConfig;
use crate::hash::ContentHash;
use crate::history::{Author, HistoryWriter, RevisionId};
use crate::path::{sanitize, LogicalPath, PathError};
use crate::store::{ContentStore, FileStore};

/// Errors from the upload path, split by fault.
///
/// Path errors are client faults and occur before anything is written;
/// storage errors mean repository I/O failed and the request should be
/// retried by the client.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Receipt for a successful upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub content_hash: ContentHash,
    pub logical_path: LogicalPath,
    pub revision: RevisionId,
}

/// A content-addressed, version-chained repository rooted at one directory.
#[derive(Debug)]
pub struct Repository {
    config: StashConfig,
    store: FileStore,
    history: HistoryWriter,
    author: Author,
}

impl Repository {
    /// Open a repository, creating the on-disk layout if absent.
    ///
    /// The layout persists across restarts; opening an existing root picks
    /// up its objects and history unchanged.
    pub fn open(config: StashConfig) -> Result<Self> {
        fs::create_dir_all(config.root()).with_context(|| {
            format!("failed to create storage root: {}", config.root().display())
        })?;

        let store = FileStore::new(config.clone())?;
        let history = HistoryWriter::new(config.clone())?;

        Ok(Self {
            config,
            store,
            history,
            author: Author::default(),
        })
    }

    /// Open a repository at a specific storage root.
    pub fn at_root(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(StashConfig::with_root(path))
    }

    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryWriter {
        &self.history
    }

    /// Store bytes under a logical path and record a revision.
    ///
    /// Sanitization runs first, so rejected paths never touch the store.
    /// A store or commit failure surfaces as [`UploadError::Storage`] and
    /// leaves history at its prior head.
    pub fn upload(
        &self,
        raw_subpath: &str,
        raw_filename: &str,
        bytes: &[u8],
    ) -> Result<Upload, UploadError> {
        let logical_path = sanitize(self.config.root(), raw_subpath, raw_filename)?;
        let content_hash = self.store.store(bytes)?;
        let revision = self.history.commit(&logical_path, &content_hash, &self.author)?;

        tracing::debug!(
            path = %logical_path,
            hash = %content_hash,
            revision = %revision,
            "stored upload"
        );

        Ok(Upload {
            content_hash,
            logical_path,
            revision,
        })
    }

    /// Fetch stored bytes by content hash. `Ok(None)` for unknown hashes.
    pub fn resolve(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>> {
        self.store.retrieve(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upload_and_resolve_roundtrip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let repo = Repository::at_root(temp_dir.path())?;

        let upload = repo.upload("docs/", "readme.txt", b"Hello World")?;
        assert_eq!(upload.logical_path.as_str(), "docs/readme.txt");

        let bytes = repo.resolve(&upload.content_hash)?.expect("should exist");
        assert_eq!(bytes, b"Hello World");

        Ok(())
    }

    #[test]
    fn test_upload_records_revision() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let repo = Repository::at_root(temp_dir.path())?;

        let upload = repo.upload("", "note.txt", b"note")?;

        assert_eq!(repo.history().head()?, Some(upload.revision.clone()));
        let tree = repo.history().tree_at_head()?;
        assert_eq!(tree.get("note.txt"), Some(&upload.content_hash));

        Ok(())
    }

    #[test]
    fn test_upload_rejects_deep_path_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::at_root(temp_dir.path()).unwrap();

        let result = repo.upload("a/b/c/d/e/f.txt", "", b"too deep");
        assert!(matches!(result, Err(UploadError::Path(PathError::TooDeep))));

        // Nothing was stored and no revision was made
        assert!(!repo.store().exists(&ContentHash::from_data(b"too deep")));
        assert!(repo.history().head().unwrap().is_none());
    }

    #[test]
    fn test_upload_rejects_traversal_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::at_root(temp_dir.path()).unwrap();

        let result = repo.upload("../../etc/passwd", "", b"sneaky");
        assert!(matches!(
            result,
            Err(UploadError::Path(PathError::AccessDenied))
        ));
        assert!(repo.history().head().unwrap().is_none());
    }

    #[test]
    fn test_anonymous_filename_fallback() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let repo = Repository::at_root(temp_dir.path())?;

        let upload = repo.upload("", "", b"nameless")?;
        assert_eq!(upload.logical_path.as_str(), "anonymous.txt");

        Ok(())
    }

    #[test]
    fn test_same_bytes_under_two_paths_share_object() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let repo = Repository::at_root(temp_dir.path())?;

        let first = repo.upload("", "a.txt", b"shared bytes")?;
        let second = repo.upload("", "b.txt", b"shared bytes")?;

        assert_eq!(first.content_hash, second.content_hash);

        let tree = repo.history().tree_at_head()?;
        assert_eq!(tree.get("a.txt"), Some(&first.content_hash));
        assert_eq!(tree.get("b.txt"), Some(&first.content_hash));

        Ok(())
    }

    #[test]
    fn test_overwritten_content_stays_resolvable() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let repo = Repository::at_root(temp_dir.path())?;

        let old = repo.upload("", "page.txt", b"version one")?;
        let new = repo.upload("", "page.txt", b"version two")?;
        assert_ne!(old.content_hash, new.content_hash);

        // The tree now points at the new content...
        let tree = repo.history().tree_at_head()?;
        assert_eq!(tree.get("page.txt"), Some(&new.content_hash));

        // ...but the old object is still addressable by its own hash
        let bytes = repo.resolve(&old.content_hash)?.expect("old content kept");
        assert_eq!(bytes, b"version one");

        Ok(())
    }

    #[test]
    fn test_repository_persists_across_reopen() -> Result<()> {
        let temp_dir = TempDir::new()?;

        let upload = {
            let repo = Repository::at_root(temp_dir.path())?;
            repo.upload("keep/", "it.txt", b"still here")?
        };

        let reopened = Repository::at_root(temp_dir.path())?;
        let bytes = reopened
            .resolve(&upload.content_hash)?
            .expect("content survives restart");
        assert_eq!(bytes, b"still here");
        assert_eq!(reopened.history().head()?, Some(upload.revision));

        Ok(())
    }
}

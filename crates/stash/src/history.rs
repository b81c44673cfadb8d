//! Revision history: an append-only chain of path→content associations.
//!
//! Every successful upload records a `Revision`: a full snapshot of the
//! logical-path→hash tree, a pointer to the parent revision, and author
//! metadata. Revisions are immutable JSON records keyed by a digest of
//! their own body, stored with the same two-level sharding as objects:
//!
//! ```text
//! {root}/revisions/
//! ├── 12/
//! │   └── 3456789....json
//! └── HEAD (at {root}/HEAD) - id of the current revision
//! ```
//!
//! The entire commit sequence (read head, load parent tree, rebind path,
//! write revision, advance head) runs under a per-repository mutex so two
//! concurrent uploads cannot both chain to the same parent and lose one
//! of the updates. The head advance itself is a write-then-rename, so a
//! failed commit leaves the previous head in place.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StashConfig;
use crate::hash::{ContentHash, HashError};
use crate::path::LogicalPath;

/// Author metadata recorded on every revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Default for Author {
    /// The service identity used when no author is supplied.
    fn default() -> Self {
        Self::new("packrat", "packrat@localhost")
    }
}

/// Identifier of a revision - 40 hex chars of BLAKE3 over the revision body.
///
/// Same shape as [`ContentHash`] but a distinct type: one names content,
/// the other names a point in history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    fn from_body(canonical: &[u8]) -> Self {
        let hash_bytes = blake3::hash(canonical);
        Self(hex::encode(&hash_bytes.as_bytes()[..20]))
    }

    /// Get the first 2 characters (used for directory sharding).
    pub fn prefix(&self) -> &str {
        &self.0[0..2]
    }

    /// Get the remainder after the prefix (used as filename).
    pub fn remainder(&self) -> &str {
        &self.0[2..]
    }

    /// Get the full id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RevisionId {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 {
            return Err(HashError::InvalidLength(s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex);
        }
        Ok(Self(s.to_lowercase()))
    }
}

/// An immutable snapshot of path→content associations plus lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Parent revision, `None` only for the first revision.
    pub parent: Option<RevisionId>,

    /// Full tree state: logical path → content hash. BTreeMap keeps the
    /// serialization canonical so the revision id is deterministic.
    pub tree: BTreeMap<String, ContentHash>,

    pub author: Author,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl Revision {
    /// Compute this revision's identifier from its canonical JSON body.
    pub fn id(&self) -> Result<RevisionId> {
        let canonical = serde_json::to_vec(self).context("failed to serialize revision")?;
        Ok(RevisionId::from_body(&canonical))
    }
}

/// Records revisions and advances the head reference.
#[derive(Debug)]
pub struct HistoryWriter {
    config: StashConfig,
    // Guards the whole read-head/build-tree/write/advance sequence.
    commit_lock: Mutex<()>,
}

impl HistoryWriter {
    /// Create a writer, creating the revisions directory if absent.
    pub fn new(config: StashConfig) -> Result<Self> {
        fs::create_dir_all(config.revisions_dir())
            .context("failed to create revisions directory")?;

        Ok(Self {
            config,
            commit_lock: Mutex::new(()),
        })
    }

    fn revision_path(&self, id: &RevisionId) -> PathBuf {
        self.config
            .revisions_dir()
            .join(id.prefix())
            .join(format!("{}.json", id.remainder()))
    }

    /// Read the current head revision id. `Ok(None)` for an empty repository.
    pub fn head(&self) -> Result<Option<RevisionId>> {
        let head_path = self.config.head_path();
        if !head_path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&head_path).context("failed to read head reference")?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let id = trimmed
            .parse::<RevisionId>()
            .context("corrupt head reference")?;
        Ok(Some(id))
    }

    /// Load a revision record by id. `Ok(None)` if it doesn't exist.
    pub fn revision(&self, id: &RevisionId) -> Result<Option<Revision>> {
        let path = self.revision_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).context("failed to read revision file")?;
        let revision: Revision =
            serde_json::from_str(&json).context("failed to parse revision file")?;
        Ok(Some(revision))
    }

    /// The tree at the current head, or an empty tree for an empty repository.
    pub fn tree_at_head(&self) -> Result<BTreeMap<String, ContentHash>> {
        match self.head()? {
            Some(id) => {
                let revision = self
                    .revision(&id)?
                    .ok_or_else(|| anyhow!("head revision {id} is missing"))?;
                Ok(revision.tree)
            }
            None => Ok(BTreeMap::new()),
        }
    }

    /// Record a new revision rebinding `path` to `content` and advance head.
    ///
    /// The new tree is the parent's tree with just this one path rebound.
    /// The revision file is written before the head reference moves; if
    /// anything fails in between, head still points at the prior revision.
    pub fn commit(
        &self,
        path: &LogicalPath,
        content: &ContentHash,
        author: &Author,
    ) -> Result<RevisionId> {
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| anyhow!("commit lock poisoned"))?;

        let parent = self.head()?;
        let mut tree = match &parent {
            Some(id) => {
                self.revision(id)?
                    .ok_or_else(|| anyhow!("head revision {id} is missing"))?
                    .tree
            }
            None => BTreeMap::new(),
        };
        tree.insert(path.as_str().to_string(), content.clone());

        let revision = Revision {
            parent,
            tree,
            author: author.clone(),
            timestamp: Utc::now(),
            message: format!("Added file {path}"),
        };

        let id = revision.id()?;
        let revision_file = self.revision_path(&id);
        if let Some(parent_dir) = revision_file.parent() {
            fs::create_dir_all(parent_dir)
                .context("failed to create revision prefix directory")?;
        }
        if !revision_file.exists() {
            let json = serde_json::to_string(&revision).context("failed to serialize revision")?;
            fs::write(&revision_file, json).context("failed to write revision file")?;
        }

        self.advance_head(&id)?;
        Ok(id)
    }

    /// Atomically repoint head at `id` via write-then-rename.
    fn advance_head(&self, id: &RevisionId) -> Result<()> {
        // Single writer under the commit lock, so one temp name suffices.
        let tmp_path = self.config.root().join("HEAD.tmp");
        fs::write(&tmp_path, format!("{id}\n")).context("failed to write head temp file")?;
        fs::rename(&tmp_path, self.config.head_path())
            .context("failed to advance head reference")?;
        Ok(())
    }
}

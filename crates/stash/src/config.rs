//! Storage configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `PACKRAT_STORAGE_ROOT`: Base path for storage
//!
//! Default path: `~/.packrat/storage`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration for the stash storage layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StashConfig {
    /// Storage root. Objects live in `{root}/objects/`, revisions in
    /// `{root}/revisions/`, and the head reference in `{root}/HEAD`.
    pub root: PathBuf,
}

/// Get the default storage root (~/.packrat/storage).
fn default_storage_root() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".packrat").join("storage"))
        .unwrap_or_else(|| PathBuf::from(".packrat/storage"))
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

impl StashConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let root = env::var("PACKRAT_STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_storage_root());

        Ok(Self { root })
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[stash]` section:
    /// ```toml
    /// [stash]
    /// root = "/srv/packrat/storage"
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let table: toml::Table = contents
            .parse()
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

        if let Some(stash_section) = table.get("stash") {
            let config: StashConfig = stash_section
                .clone()
                .try_into()
                .context("failed to parse [stash] section")?;
            Ok(config)
        } else {
            // No [stash] section, fall back to env
            Self::from_env()
        }
    }

    /// Create a config with a specific storage root.
    pub fn with_root(path: impl Into<PathBuf>) -> Self {
        Self { root: path.into() }
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the objects directory path.
    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    /// Get the revisions directory path.
    pub fn revisions_dir(&self) -> PathBuf {
        self.root.join("revisions")
    }

    /// Get the path of the head reference file.
    pub fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }
}

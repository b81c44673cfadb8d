//! Content-addressed, version-chained blob storage for Packrat.
//!
//! A `Repository` owns two on-disk structures under a single storage root:
//! content-addressed objects (write-once, keyed by a BLAKE3 digest of their
//! bytes) and an append-only chain of revisions mapping logical paths to
//! object hashes, with a `HEAD` reference pointing at the latest revision.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stash::{Repository, StashConfig};
//!
//! // From environment (reads PACKRAT_STORAGE_ROOT)
//! let config = StashConfig::from_env().unwrap();
//! let repo = Repository::open(config).unwrap();
//!
//! // Or at a specific path
//! let repo = Repository::at_root("/srv/packrat/storage").unwrap();
//!
//! // Store content under a logical path
//! let upload = repo.upload("notes/", "hello.txt", b"Hello, World!").unwrap();
//! println!("stored as {}", upload.content_hash);
//!
//! // Retrieve it by hash - path state is irrelevant for reads
//! if let Some(bytes) = repo.resolve(&upload.content_hash).unwrap() {
//!     println!("got {} bytes", bytes.len());
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `PACKRAT_STORAGE_ROOT`: Base path for storage (default: `~/.packrat/storage`)
//!
//! # Layout
//!
//! ```text
//! {root}/
//! ├── objects/
//! │   └── ab/cdef0123...   # content, keyed by hash
//! ├── revisions/
//! │   └── 12/345678....json  # revision records, keyed by revision id
//! └── HEAD                 # current revision id
//! ```
//!
//! Objects and revisions are immutable once written; only `HEAD` moves, and
//! commits are serialized per repository so concurrent uploads cannot race
//! each other into divergent history.

pub mod config;
pub mod hash;
pub mod history;
pub mod path;
pub mod repo;
pub mod store;

// Re-exports for convenience
pub use config::StashConfig;
pub use hash::{ContentHash, HashError};
pub use history::{Author, HistoryWriter, Revision, RevisionId};
pub use path::{sanitize, LogicalPath, PathError, MAX_DEPTH};
pub use repo::{Repository, Upload, UploadError};
pub use store::{ContentStore, FileStore};

//! Packrat: a small HTTP service over the stash content-addressed store.
//!
//! Uploads arrive as multipart POSTs under `/files/...`, get committed into
//! the stash repository, and come back out by content hash:
//!
//! - `POST /files/<subpath>` with multipart field `file` → `{"url": ...}`
//! - `GET /files/<40-hex hash>/<filename>` → the stored bytes
//!
//! The heavy lifting (path safety, content addressing, revision history)
//! lives in the `stash` crate; this crate is routing, multipart plumbing,
//! and content-type negotiation.

pub mod config;
pub mod serve;
pub mod web;

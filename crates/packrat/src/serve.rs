//! Retrieval: resolve a content hash and work out how to serve it.
//!
//! Content type comes from the requested filename's extension, not from
//! anything stored alongside the object - the same bytes can be served
//! under different names with different types. Text-ish content renders
//! inline; everything else downloads as an attachment named after the
//! file's base name (directory components stripped, so path separators
//! never reach the Content-Disposition header).

use anyhow::Result;
use stash::{ContentHash, Repository};

/// A resolved object plus the headers it should be served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub disposition: String,
}

/// Guess a content type from a filename's extension.
///
/// Unknown extensions fall back to `text/plain`.
pub fn content_type_for(filename: &str) -> String {
    match mime_guess::from_path(filename).first() {
        Some(mime) => mime.essence_str().to_string(),
        None => "text/plain".to_string(),
    }
}

/// Text-like, script-like, and JSON content renders inline in a browser.
pub fn is_inline(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || content_type.contains("script")
        || content_type == "application/json"
}

/// Build the Content-Disposition value for a content type and filename.
pub fn disposition_for(content_type: &str, filename: &str) -> String {
    if is_inline(content_type) {
        "inline".to_string()
    } else {
        let base = filename.rsplit('/').next().unwrap_or(filename);
        format!("attachment; filename=\"{base}\"")
    }
}

/// Resolve `hash` and pair the bytes with serving headers derived from
/// `filename`. `Ok(None)` if no such object exists.
pub fn retrieve(repo: &Repository, hash: &ContentHash, filename: &str) -> Result<Option<Served>> {
    let Some(bytes) = repo.resolve(hash)? else {
        return Ok(None);
    };

    let base_type = content_type_for(filename);
    let disposition = disposition_for(&base_type, filename);
    let content_type = if base_type.starts_with("text/") {
        format!("{base_type}; charset=utf-8")
    } else {
        base_type
    };

    Ok(Some(Served {
        bytes,
        content_type,
        disposition,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_known_extensions() {
        assert_eq!(content_type_for("a.txt"), "text/plain");
        assert_eq!(content_type_for("a.json"), "application/json");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("dir/nested/a.html"), "text/html");
    }

    #[test]
    fn test_content_type_unknown_extension_defaults_to_text() {
        assert_eq!(content_type_for("mystery.xyzzy"), "text/plain");
        assert_eq!(content_type_for("no_extension"), "text/plain");
    }

    #[test]
    fn test_inline_types() {
        assert!(is_inline("text/plain"));
        assert!(is_inline("text/html"));
        assert!(is_inline("application/json"));
        assert!(is_inline("application/javascript"));
        assert!(!is_inline("image/png"));
        assert!(!is_inline("application/octet-stream"));
    }

    #[test]
    fn test_attachment_strips_directories() {
        let disposition = disposition_for("image/png", "deep/path/to/pic.png");
        assert_eq!(disposition, "attachment; filename=\"pic.png\"");
    }

    #[test]
    fn test_retrieve_roundtrip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let repo = Repository::at_root(temp_dir.path())?;

        let upload = repo.upload("", "hello.txt", b"Hello World")?;
        let served = retrieve(&repo, &upload.content_hash, "hello.txt")?.expect("should exist");

        assert_eq!(served.bytes, b"Hello World");
        assert_eq!(served.content_type, "text/plain; charset=utf-8");
        assert_eq!(served.disposition, "inline");

        Ok(())
    }

    #[test]
    fn test_retrieve_binary_is_attachment() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let repo = Repository::at_root(temp_dir.path())?;

        let upload = repo.upload("", "blob.bin", &[0u8, 1, 2, 3])?;
        let served = retrieve(&repo, &upload.content_hash, "blob.bin")?.expect("should exist");

        assert_eq!(served.content_type, "application/octet-stream");
        assert_eq!(served.disposition, "attachment; filename=\"blob.bin\"");

        Ok(())
    }

    #[test]
    fn test_retrieve_unknown_hash_is_none() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let repo = Repository::at_root(temp_dir.path())?;

        let missing: ContentHash = "0000000000000000000000000000000000000000".parse()?;
        assert!(retrieve(&repo, &missing, "x.txt")?.is_none());

        Ok(())
    }
}

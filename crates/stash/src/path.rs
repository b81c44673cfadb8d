//! Logical path validation and normalization.
//!
//! Clients name uploads with a URL subpath plus an optional multipart
//! filename. Both are untrusted: the sanitizer turns them into a single
//! normalized, forward-slash relative path that is guaranteed to stay under
//! the storage root and within the depth limit, or rejects the request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Maximum number of non-empty path segments in a logical path.
pub const MAX_DEPTH: usize = 5;

/// Fallback filename when the client supplies none (or the `-` sentinel).
pub const ANONYMOUS_FILENAME: &str = "anonymous.txt";

/// Errors produced by path sanitization. Both are client faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Subpath too deep. Maximum of 5 levels allowed.")]
    TooDeep,

    #[error("Access denied")]
    AccessDenied,
}

/// A validated, normalized relative path under the storage root.
///
/// Always non-empty, contains no `.` or `..` segments, no leading or
/// trailing separator, and at most [`MAX_DEPTH`] segments. Only
/// [`sanitize`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalPath(String);

impl LogicalPath {
    /// The path as a forward-slash delimited string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of path segments.
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }

    /// The final segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LogicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate and normalize a client-supplied subpath and filename.
///
/// Rules:
/// - an empty or `"-"` filename becomes [`ANONYMOUS_FILENAME`];
/// - an empty subpath means the logical path is the filename alone;
/// - a subpath ending in `/` is joined with the filename;
/// - any other subpath *is* the full logical path and the filename is
///   ignored (an explicitly provided path wins over the filename field);
/// - more than [`MAX_DEPTH`] non-empty segments is rejected with
///   [`PathError::TooDeep`], checked before the traversal check;
/// - a path whose normalization escapes `root` is rejected with
///   [`PathError::AccessDenied`].
///
/// Purely lexical; the destination need not exist and nothing is touched
/// on disk.
pub fn sanitize(root: &Path, raw_subpath: &str, raw_filename: &str) -> Result<LogicalPath, PathError> {
    let filename = if raw_filename.is_empty() || raw_filename == "-" {
        ANONYMOUS_FILENAME
    } else {
        raw_filename
    };

    let joined = if raw_subpath.is_empty() {
        filename.to_string()
    } else if raw_subpath.ends_with('/') {
        format!("{raw_subpath}{filename}")
    } else {
        raw_subpath.to_string()
    };

    // Depth is counted on the raw segments, so `..` counts a level too.
    if joined.split('/').filter(|s| !s.is_empty()).count() > MAX_DEPTH {
        return Err(PathError::TooDeep);
    }

    // Lexical normalization: `..` pops a segment, popping past the top of
    // the path escapes the root.
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::AccessDenied);
                }
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Err(PathError::AccessDenied);
    }

    let normalized = segments.join("/");

    // The absolute destination must remain a descendant of the root.
    if !root.join(&normalized).starts_with(root) {
        return Err(PathError::AccessDenied);
    }

    Ok(LogicalPath(normalized))
}

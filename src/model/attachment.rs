//! Attachment records.
//!
//! Only the path and the size are kept. File contents are read at message
//! build time, never during indexing.

use std::path::{Component, Path, PathBuf};

/// A candidate file attachment discovered in a library root.
///
/// Two attachments are equal when both the path and the size are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Normalized filesystem path of the file.
    pub path: PathBuf,

    /// Size in bytes at the time the library was built.
    pub size: u64,
}

impl Attachment {
    /// Create an attachment, normalizing the path.
    pub fn new(path: impl AsRef<Path>, size: u64) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            size,
        }
    }

    /// Final path component (`report.pdf` for `/data/q1/report.pdf`).
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Extension without the leading dot. Dotfiles such as `.env` have none.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    /// The path as a string, with invalid UTF-8 replaced.
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Drop redundant separators and interior `.` components.
///
/// `..` is kept as-is: resolving it needs the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = path.components().peekable();
    let mut normalized = PathBuf::new();

    // A lone leading "./" adds nothing once followed by a real component
    if matches!(components.peek(), Some(Component::CurDir)) {
        components.next();
        if components.peek().is_none() {
            return PathBuf::from(".");
        }
    }

    for component in components {
        normalized.push(component.as_os_str());
    }
    normalized
}

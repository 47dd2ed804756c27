//! Recursive directory scanning for library roots.

use std::path::{Path, PathBuf};

use tracing::{trace, warn};
use walkdir::WalkDir;

/// A regular file found under a library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path of the file, rooted at the scanned directory.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Walk `root` and yield every regular file below it.
///
/// Entries within a directory are visited in file-name order, so the output
/// is stable for a fixed filesystem state. Directories are descended into
/// but not yielded; symlinks are neither followed nor yielded. A `root` that
/// is itself a regular file yields just that file.
///
/// The walk is lazy. Calling `scan` again starts a fresh walk. Entries that
/// cannot be read are logged and skipped.
pub fn scan(root: impl AsRef<Path>) -> impl Iterator<Item = ScannedFile> {
    WalkDir::new(root.as_ref())
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(
                    path = %e.path().map(|p| p.display().to_string()).unwrap_or_default(),
                    error = %e,
                    "Skipping unreadable entry"
                );
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| match entry.metadata() {
            Ok(meta) => {
                trace!(path = %entry.path().display(), size = meta.len(), "Scanned file");
                Some(ScannedFile {
                    size: meta.len(),
                    path: entry.into_path(),
                })
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Could not stat file, skipping");
                None
            }
        })
}

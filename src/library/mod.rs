//! Attachment library: an in-memory, queryable index of candidate files.
//!
//! A library is built once by scanning one or more root directories, then
//! narrowed with chained queries. Every query returns a new library and
//! leaves the receiver untouched:
//!
//! ```no_run
//! use mailsmoke::library::AttachmentLibrary;
//!
//! let library = AttachmentLibrary::build(&["/srv/attachments"]);
//! let picked = library
//!     .by_extension("pdf")
//!     .by_size_range(1_000, 5_000_000)
//!     .sample(3, 42)?;
//! # Ok::<(), mailsmoke::error::SmokeError>(())
//! ```

pub mod scanner;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::error::{Result, SmokeError};
use crate::model::attachment::Attachment;

/// An ordered, immutable collection of attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentLibrary {
    index: Vec<Attachment>,
}

impl AttachmentLibrary {
    /// Build a library by scanning each root in order.
    ///
    /// Roots that do not exist are logged and skipped.
    pub fn build<P: AsRef<Path>>(roots: &[P]) -> Self {
        Self::build_with_progress(roots, None)
    }

    /// Build a library, reporting `(files_seen, bytes_seen)` after each file.
    pub fn build_with_progress<P: AsRef<Path>>(
        roots: &[P],
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Self {
        let mut index = Vec::new();
        let mut total_bytes: u64 = 0;
        let mut scanned_roots = 0usize;

        for root in roots {
            let root = root.as_ref();
            if !root.exists() {
                warn!(
                    error = %SmokeError::MissingRoot(root.to_path_buf()),
                    "Skipping library root"
                );
                continue;
            }

            let before = index.len();
            for file in scanner::scan(root) {
                total_bytes = total_bytes.saturating_add(file.size);
                index.push(Attachment::new(&file.path, file.size));
                if let Some(cb) = progress {
                    cb(index.len() as u64, total_bytes);
                }
            }
            scanned_roots += 1;
            debug!(
                root = %root.display(),
                files = index.len() - before,
                "Indexed library root"
            );
        }

        info!(
            roots = scanned_roots,
            files = index.len(),
            bytes = total_bytes,
            "Built attachment library"
        );
        Self { index }
    }

    /// Wrap an existing sequence of attachments, keeping its order.
    pub fn wrap(attachments: Vec<Attachment>) -> Self {
        Self { index: attachments }
    }

    /// Keep, in order, every attachment for which `predicate` holds.
    pub fn filter(&self, predicate: impl Fn(&Attachment) -> bool) -> Self {
        Self::wrap(
            self.index
                .iter()
                .filter(|item| predicate(item))
                .cloned()
                .collect(),
        )
    }

    /// Attachments whose file name is exactly `name`.
    pub fn by_exact_name(&self, name: &str) -> Self {
        self.filter(|item| item.path.file_name() == Some(OsStr::new(name)))
    }

    /// Attachments whose full path contains `term`.
    pub fn by_contains(&self, term: &str) -> Self {
        self.filter(|item| item.path.to_string_lossy().contains(term))
    }

    /// Attachments with the extension `ext` (no leading dot, case-sensitive).
    pub fn by_extension(&self, ext: &str) -> Self {
        self.filter(|item| item.path.extension() == Some(OsStr::new(ext)))
    }

    /// Attachments that live under a directory component named `dir`.
    ///
    /// Only whole components of the parent path match: `sub` does not match
    /// `subdir/file.txt`.
    pub fn by_directory(&self, dir: &str) -> Self {
        self.filter(|item| {
            item.path
                .parent()
                .is_some_and(|parent| parent.components().any(|c| c.as_os_str() == dir))
        })
    }

    /// Attachments with `min_bytes <= size <= max_bytes`.
    ///
    /// A `max_bytes` of 0 means "no upper bound", so `(0, 0)` keeps
    /// everything. This matches the default of the `filesize` template
    /// filter when no maximum is given.
    pub fn by_size_range(&self, min_bytes: u64, max_bytes: u64) -> Self {
        let max_bytes = if max_bytes == 0 { u64::MAX } else { max_bytes };
        self.filter(|item| (min_bytes..=max_bytes).contains(&item.size))
    }

    /// Pick `count` distinct attachments at random, without replacement.
    ///
    /// The generator is seeded with `seed` for this call only, so the same
    /// seed over the same library always picks the same attachments in the
    /// same order.
    pub fn sample(&self, count: usize, seed: u64) -> Result<Self> {
        if count > self.index.len() {
            return Err(SmokeError::InsufficientItems {
                requested: count,
                available: self.index.len(),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut positions: Vec<usize> = (0..self.index.len()).collect();
        positions.shuffle(&mut rng);

        Ok(Self::wrap(
            positions
                .into_iter()
                .take(count)
                .map(|i| self.index[i].clone())
                .collect(),
        ))
    }

    /// Number of attachments.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the library holds no attachments.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.index.iter()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.index
    }

    pub fn into_attachments(self) -> Vec<Attachment> {
        self.index
    }

    /// Paths of all attachments, in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.index.iter().map(|a| a.path.clone()).collect()
    }

    /// Sum of all attachment sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.index.iter().map(|a| a.size).sum()
    }
}

impl<'a> IntoIterator for &'a AttachmentLibrary {
    type Item = &'a Attachment;
    type IntoIter = std::slice::Iter<'a, Attachment>;

    fn into_iter(self) -> Self::IntoIter {
        self.index.iter()
    }
}

impl FromIterator<Attachment> for AttachmentLibrary {
    fn from_iter<I: IntoIterator<Item = Attachment>>(iter: I) -> Self {
        Self::wrap(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_library() -> AttachmentLibrary {
        AttachmentLibrary::wrap(vec![
            Attachment::new("lib/root_file_1.txt", 1000),
            Attachment::new("lib/root_file_2.txt", 1000),
            Attachment::new("lib/subdir/subfile_1.txt", 1000),
            Attachment::new("lib/subdir/subfile_2.txt", 1000),
            Attachment::new("lib/pdf_file.pdf", 1000),
            Attachment::new("lib/big_file.txt", 2000),
        ])
    }

    fn names(library: &AttachmentLibrary) -> Vec<&str> {
        library.iter().filter_map(|a| a.file_name()).collect()
    }

    #[test]
    fn test_by_exact_name() {
        let lib = make_library();
        assert_eq!(names(&lib.by_exact_name("root_file_1.txt")), vec!["root_file_1.txt"]);
        assert!(lib.by_exact_name("root_file").is_empty());
    }

    #[test]
    fn test_by_contains() {
        let lib = make_library();
        assert_eq!(
            names(&lib.by_contains("subfile")),
            vec!["subfile_1.txt", "subfile_2.txt"]
        );
        // Directory names are part of the path too
        assert_eq!(lib.by_contains("subdir/").len(), 2);
    }

    #[test]
    fn test_by_extension() {
        let lib = make_library();
        assert_eq!(names(&lib.by_extension("pdf")), vec!["pdf_file.pdf"]);
        assert_eq!(lib.by_extension("txt").len(), 5);
        assert!(lib.by_extension("PDF").is_empty());
        assert!(lib.by_extension(".pdf").is_empty());
    }

    #[test]
    fn test_by_directory_matches_whole_components() {
        let lib = make_library();
        assert_eq!(
            names(&lib.by_directory("subdir")),
            vec!["subfile_1.txt", "subfile_2.txt"]
        );
        assert!(lib.by_directory("sub").is_empty());
        assert_eq!(lib.by_directory("lib").len(), 6);
        // The file name itself is not a directory
        assert!(lib.by_directory("pdf_file.pdf").is_empty());
    }

    #[test]
    fn test_by_size_range() {
        let lib = make_library();
        assert_eq!(lib.by_size_range(0, 0).len(), 6);
        assert_eq!(lib.by_size_range(1500, 0).len(), 1);
        assert_eq!(lib.by_size_range(0, 1500).len(), 5);
        assert_eq!(lib.by_size_range(500, 2500).len(), 6);
        assert_eq!(lib.by_size_range(1000, 1000).len(), 5);
        assert!(lib.by_size_range(2001, 0).is_empty());
    }

    #[test]
    fn test_sample_is_deterministic() {
        let lib = make_library();
        let first = lib.sample(2, 1337).unwrap();
        let second = lib.sample(2, 1337).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_ne!(first.attachments()[0], first.attachments()[1]);
    }

    #[test]
    fn test_sample_whole_library_is_a_permutation() {
        let lib = make_library();
        let all = lib.sample(lib.len(), 7).unwrap();
        let mut sampled = all.paths();
        let mut original = lib.paths();
        sampled.sort();
        original.sort();
        assert_eq!(sampled, original);
        assert!(lib.sample(0, 7).unwrap().is_empty());
    }

    #[test]
    fn test_sample_insufficient_items() {
        let lib = make_library();
        let err = lib.sample(7, 1).unwrap_err();
        assert!(matches!(
            err,
            SmokeError::InsufficientItems {
                requested: 7,
                available: 6
            }
        ));
    }

    #[test]
    fn test_queries_do_not_mutate_receiver() {
        let lib = make_library();
        let _ = lib.by_extension("pdf");
        let _ = lib.sample(3, 9).unwrap();
        assert_eq!(lib, make_library());
    }

    #[test]
    fn test_chaining_commutes() {
        let lib = make_library();
        let a = lib.by_extension("txt").by_directory("subdir");
        let b = lib.by_directory("subdir").by_extension("txt");
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_build_skips_missing_roots() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("only.txt"), b"hello").unwrap();
        let missing = tmp.path().join("does-not-exist");

        let lib = AttachmentLibrary::build(&[missing.as_path(), tmp.path()]);
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.total_size(), 5);
    }

    #[test]
    fn test_build_keeps_duplicates_from_overlapping_roots() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("dup.txt"), b"x").unwrap();

        let lib = AttachmentLibrary::build(&[tmp.path(), tmp.path()]);
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.attachments()[0], lib.attachments()[1]);
    }
}

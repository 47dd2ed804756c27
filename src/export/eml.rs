//! Write rendered messages as individual `.eml` files.
//!
//! An `.eml` file is the raw RFC 5322 message bytes.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SmokeError};

/// Attempts at a free file name before giving up.
const MAX_ATTEMPTS: usize = 1000;

/// Write `raw` into `output_dir` and return the path of the new file.
///
/// The name is `{yyyymmdd_hhmmss}_{subject}.eml`. An existing file is never
/// replaced; a counter is appended instead (`..._1.eml`, `..._2.eml`).
pub fn export_eml(raw: &[u8], subject: Option<&str>, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| SmokeError::io(output_dir, e))?;

    let stem = eml_stem(subject);
    for attempt in 0..MAX_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.eml")
        } else {
            format!("{stem}_{attempt}.eml")
        };
        let path = output_dir.join(name);

        // `create_new` makes the existence check and the create one step.
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(raw).map_err(|e| SmokeError::io(&path, e))?;
                tracing::info!(path = %path.display(), bytes = raw.len(), "Wrote message");
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(SmokeError::io(&path, e)),
        }
    }

    Err(SmokeError::Export(format!(
        "no free file name for '{stem}.eml' in {}",
        output_dir.display()
    )))
}

fn eml_stem(subject: Option<&str>) -> String {
    let date = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let subject = sanitize_filename_part(subject.unwrap_or(""), 80);
    format!("{date}_{subject}")
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("hello world", 20), "hello_world");
        assert_eq!(sanitize_filename_part("a/b\\c:d*e", 20), "a_b_c_d_e");
        assert_eq!(sanitize_filename_part("", 20), "untitled");
        assert_eq!(sanitize_filename_part("abcdef", 3), "abc");
    }

    #[test]
    fn test_export_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");

        let first = export_eml(b"first", Some("Same subject"), &out).unwrap();
        let second = export_eml(b"second", Some("Same subject"), &out).unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"first");
        assert_eq!(std::fs::read(&second).unwrap(), b"second");

        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_Same_subject.eml"), "{name}");
    }

    #[test]
    fn test_export_without_subject() {
        let tmp = tempfile::tempdir().unwrap();
        let path = export_eml(b"x", None, tmp.path()).unwrap();
        assert!(path.to_string_lossy().ends_with("_untitled.eml"));
    }
}

//! Removal of transient files once a response no longer needs them.
//!
//! Deletion is best-effort: every path is attempted, and the failures are
//! reported together afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One or more paths could not be removed
#[derive(Error, Debug)]
#[error("Failed to delete {} file(s): {}", .failures.len(), DisplayFailures(.failures))]
pub struct CleanupError {
    pub failures: Vec<(PathBuf, std::io::Error)>,
}

struct DisplayFailures<'a>(&'a [(PathBuf, std::io::Error)]);

impl fmt::Display for DisplayFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, err)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", path.display(), err)?;
        }
        Ok(())
    }
}

/// Delete every path in `paths`
///
/// Keeps going after a failure so one bad path never strands the others.
/// This is synchronous: it runs from `Drop` of the response body, where a
/// single unlink is cheaper than handing off to another task.
pub fn delete_local_files<P: AsRef<Path>>(paths: &[P]) -> Result<(), CleanupError> {
    let mut failures = Vec::new();

    for path in paths {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!("Deleted {}", path.display()),
            Err(e) => failures.push((path.to_path_buf(), e)),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(CleanupError { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn deletes_all_given_paths() {
        let dir = TempDir::new().unwrap();
        let a = touch(&dir, "a.jpg");
        let b = touch(&dir, "b.jpg");

        delete_local_files(&[&a, &b]).unwrap();

        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn empty_input_is_ok() {
        let none: [PathBuf; 0] = [];
        assert!(delete_local_files(&none).is_ok());
    }

    #[test]
    fn continues_past_a_missing_path_and_reports_it() {
        let dir = TempDir::new().unwrap();
        let first = touch(&dir, "first.jpg");
        let missing = dir.path().join("missing.jpg");
        let last = touch(&dir, "last.jpg");

        let err = delete_local_files(&[&first, &missing, &last]).unwrap_err();

        assert!(!first.exists());
        assert!(!last.exists());
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].0, missing);
        assert_eq!(err.failures[0].1.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("missing.jpg"));
    }

    #[test]
    fn reports_every_failure() {
        let dir = TempDir::new().unwrap();
        let missing_a = dir.path().join("a.jpg");
        let missing_b = dir.path().join("b.jpg");

        let err = delete_local_files(&[&missing_a, &missing_b]).unwrap_err();
        assert_eq!(err.failures.len(), 2);
        assert!(err.to_string().starts_with("Failed to delete 2 file(s)"));
    }

    #[test]
    fn leaves_unlisted_files_alone() {
        let dir = TempDir::new().unwrap();
        let target = touch(&dir, "target.jpg");
        let bystander = touch(&dir, "bystander.jpg");

        delete_local_files(&[&target]).unwrap();

        assert!(!target.exists());
        assert!(bystander.exists());
    }
}

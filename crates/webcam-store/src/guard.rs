//! Removal guard for freshly written files.

use std::path::PathBuf;

use tracing::{debug, warn};

/// A file that is deleted again when the guard is dropped, unless kept.
///
/// Used to make sure an image that was written but not fully committed never
/// stays behind in the archive.
#[derive(Debug)]
pub(crate) struct PendingFile {
    path: Option<PathBuf>,
}

impl PendingFile {
    /// Guard an existing file.
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Keep the file, disarming the guard.
    pub(crate) fn keep(mut self) -> Option<PathBuf> {
        self.path.take()
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed uncommitted file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove uncommitted file {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_20240601_120003.jpg");
        std::fs::write(&path, b"partial").unwrap();

        drop(PendingFile::new(&path));

        assert!(!path.exists());
    }

    #[test]
    fn test_keep_preserves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_20240601_120003.jpg");
        std::fs::write(&path, b"complete").unwrap();

        let kept = PendingFile::new(&path).keep();

        assert_eq!(kept.as_deref(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[test]
    fn test_drop_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        drop(PendingFile::new(dir.path().join("gone.jpg")));
    }
}

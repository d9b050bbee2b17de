//! Filesystem utilities for scoped temporary audio files.
//!
//! Every downloaded file is owned by a [`TempAudio`] guard. Dropping the guard
//! removes the file, so success, failure, panic and task cancellation all end
//! with the same single cleanup.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Owner of a temporary audio file on local disk.
#[derive(Debug)]
pub struct TempAudio {
    path: PathBuf,
}

impl TempAudio {
    /// Take ownership of an already-created file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        cleanup_temp_file(&self.path);
    }
}

/// Remove a temporary file if it exists.
///
/// Never fails: a missing file is a no-op and removal errors are logged.
/// Returns `true` when a file was actually removed.
pub fn cleanup_temp_file(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed temp audio file");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove temp audio file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_guard_removes_file_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sonar-test.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        {
            let guard = TempAudio::new(&path);
            assert_eq!(guard.path(), path.as_path());
            assert!(path.exists());
        }

        assert!(!path.exists(), "guard should delete the file");
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sonar-twice.mp3");
        std::fs::write(&path, b"ID3").unwrap();

        assert!(cleanup_temp_file(&path));
        assert!(!cleanup_temp_file(&path));
        assert!(!cleanup_temp_file(&dir.path().join("never-existed.ogg")));
    }

    #[test]
    fn test_guard_tolerates_already_removed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sonar-gone.flac");
        std::fs::write(&path, b"fLaC").unwrap();

        let guard = TempAudio::new(&path);
        std::fs::remove_file(&path).unwrap();
        drop(guard);

        assert!(!path.exists());
    }
}

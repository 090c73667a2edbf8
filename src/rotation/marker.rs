//! Persisted time of the last rotation for one key
//!
//! Stored as `<root>/<key>.last` holding a decimal Unix timestamp. A missing
//! file means the key has never been rotated.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::paths::marker_file;
use crate::error::{MnemosyneError, MnemosyneResult};

/// The `.last` file for one backup key
#[derive(Debug, Clone)]
pub struct GenerationMarker {
    path: PathBuf,
}

impl GenerationMarker {
    pub fn new(root: &Path, key: &str) -> Self {
        Self {
            path: marker_file(root, key),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last rotation time, or 0 if never rotated
    pub fn read(&self) -> MnemosyneResult<u64> {
        if !self.path.exists() {
            return Ok(0);
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| MnemosyneError::marker(&self.path, e))?;

        contents
            .trim()
            .parse::<u64>()
            .map_err(|e| MnemosyneError::marker(&self.path, format!("{:?}: {}", contents.trim(), e)))
    }

    /// Record `timestamp` as the last rotation (write to temp, then rename)
    pub fn write(&self, timestamp: u64) -> MnemosyneResult<()> {
        let temp_path = self.path.with_extension("last.tmp");

        fs::write(&temp_path, timestamp.to_string()).map_err(|e| {
            MnemosyneError::Io(format!(
                "Failed to write {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            MnemosyneError::Io(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_absent_marker_reads_zero() {
        let temp = TempDir::new().unwrap();
        let marker = GenerationMarker::new(temp.path(), "home");
        assert_eq!(marker.read().unwrap(), 0);
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let marker = GenerationMarker::new(temp.path(), "home");

        marker.write(1_700_000_000).unwrap();

        assert_eq!(marker.read().unwrap(), 1_700_000_000);
        assert_eq!(
            fs::read_to_string(temp.path().join("home.last")).unwrap(),
            "1700000000"
        );
        assert!(!temp.path().join("home.last.tmp").exists());
    }

    #[test]
    fn test_trailing_newline_accepted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("home.last"), "1234\n").unwrap();
        let marker = GenerationMarker::new(temp.path(), "home");
        assert_eq!(marker.read().unwrap(), 1234);
    }

    #[test]
    fn test_garbage_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("home.last"), "yesterday").unwrap();
        let marker = GenerationMarker::new(temp.path(), "home");

        let err = marker.read().unwrap_err();
        assert!(matches!(err, MnemosyneError::Marker { .. }));
    }

    #[test]
    fn test_dotted_key() {
        let temp = TempDir::new().unwrap();
        let marker = GenerationMarker::new(temp.path(), "var.lib");
        marker.write(5).unwrap();
        assert!(temp.path().join("var.lib.last").exists());
        assert_eq!(marker.read().unwrap(), 5);
    }
}

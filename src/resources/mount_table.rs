//! Mount table probing
//!
//! Reads `/proc/mounts` (or a stand-in file in tests) to answer whether a
//! directory currently has something mounted on it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MnemosyneError, MnemosyneResult};

/// A mount table in `/proc/mounts` format
#[derive(Debug, Clone)]
pub struct MountTable {
    path: PathBuf,
}

impl MountTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All mount points currently listed
    pub fn mount_points(&self) -> MnemosyneResult<Vec<PathBuf>> {
        let data = fs::read_to_string(&self.path).map_err(|e| {
            MnemosyneError::Io(format!(
                "Failed to read mount table {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(data
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(|field| PathBuf::from(unescape_mount(field)))
            .collect())
    }

    /// Check if `mount_point` is listed
    pub fn is_mounted(&self, mount_point: &Path) -> MnemosyneResult<bool> {
        Ok(self.mount_points()?.iter().any(|p| p == mount_point))
    }
}

/// Undo the octal escaping the kernel applies to spaces, tabs and
/// backslashes in mount paths (`\040`, `\011`, `\134`).
fn unescape_mount(value: &str) -> String {
    let mut output = String::new();
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let mut octal = String::new();
            for _ in 0..3 {
                match chars.peek() {
                    Some(next) if next.is_digit(8) => {
                        octal.push(*next);
                        chars.next();
                    }
                    _ => break,
                }
            }
            if octal.len() == 3 {
                if let Ok(byte) = u8::from_str_radix(&octal, 8) {
                    output.push(byte as char);
                    continue;
                }
            }
            output.push('\\');
            output.push_str(&octal);
            continue;
        }
        output.push(ch);
    }
    output
}

//! Environment check
//!
//! Reports whether this host can run backups at all: root privileges and
//! the external tools every step shells out to. Changes nothing.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{MnemosyneError, MnemosyneResult};

/// Programs a backup run may invoke
pub const REQUIRED_TOOLS: &[&str] = &[
    "cryptsetup",
    "btrfs",
    "mount.cifs",
    "mount",
    "umount",
    "rsync",
    "truncate",
    "mkfs.btrfs",
];

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub label: String,
    pub passed: bool,
    pub detail: String,
}

/// Handle the verify command
pub fn handle_verify() -> MnemosyneResult<()> {
    let path_var = env::var_os("PATH").unwrap_or_default();
    let mut checks = vec![root_check()];
    checks.extend(tool_checks(&path_var));

    println!("Environment check");
    println!("=================");
    for check in &checks {
        println!(
            "  {} {:<12} {}",
            if check.passed { "✓" } else { "✗" },
            check.label,
            check.detail
        );
    }

    let failed = checks.iter().filter(|c| !c.passed).count();
    println!();
    if failed > 0 {
        return Err(MnemosyneError::Verification(format!(
            "{} of {} checks failed",
            failed,
            checks.len()
        )));
    }

    println!("All checks passed.");
    Ok(())
}

fn root_check() -> Check {
    let passed = running_as_root();
    Check {
        label: "root".to_string(),
        passed,
        detail: if passed {
            "running as root".to_string()
        } else {
            "mounting and cryptsetup need root".to_string()
        },
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// One check per required tool, searched for in `path_var`
pub fn tool_checks(path_var: &OsStr) -> Vec<Check> {
    REQUIRED_TOOLS
        .iter()
        .map(|tool| match find_in_path(tool, path_var) {
            Some(found) => Check {
                label: tool.to_string(),
                passed: true,
                detail: found.display().to_string(),
            },
            None => Check {
                label: tool.to_string(),
                passed: false,
                detail: "not found in PATH".to_string(),
            },
        })
        .collect()
}

/// First executable called `program` in the directories of `path_var`
pub fn find_in_path(program: &str, path_var: &OsStr) -> Option<PathBuf> {
    env::split_paths(path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

//! Keyfile generation
//!
//! Writes the random keyfile the encrypted store is formatted with.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use tracing::info;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::{MnemosyneError, MnemosyneResult};

/// Size of a generated keyfile in bytes
pub const KEYFILE_LEN: usize = 4096;

/// Handle the init-key command
pub fn handle_init_key(config: &Config, force: bool) -> MnemosyneResult<()> {
    let path = &config.store.keyfile_path;
    write_keyfile(path, force)?;

    println!("Wrote {}-byte keyfile to {}", KEYFILE_LEN, path.display());
    println!();
    println!("Keep a copy of this file somewhere other than the backup store.");
    println!("Without it the backups cannot be decrypted.");

    Ok(())
}

/// Fill `path` with fresh random key material, readable by the owner only.
///
/// An existing file is only replaced when `force` is set.
pub fn write_keyfile(path: &Path, force: bool) -> MnemosyneResult<()> {
    let mut key = Zeroizing::new(vec![0u8; KEYFILE_LEN]);
    OsRng.fill_bytes(&mut key);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                MnemosyneError::Io(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => MnemosyneError::Provision(format!(
            "Keyfile {} already exists; use --force to replace it",
            path.display()
        )),
        _ => MnemosyneError::Io(format!("Failed to create {}: {}", path.display(), e)),
    })?;

    // mode() only applies to newly created files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(&key)?;
    file.sync_all()?;

    info!("Keyfile written to {}", path.display());
    Ok(())
}

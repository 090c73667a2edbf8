//! Path management for mnemosyne
//!
//! Every fixed location the tool touches lives here: the config file, the
//! share and volume mount points, the device-mapper name and the mount table
//! we probe.
//!
//! ## Config File Resolution Order
//!
//! 1. `--config` / `-c` on the command line
//! 2. `MNEMOSYNE_CONFIG` environment variable (if set)
//! 3. `/usr/local/etc/mnemosyne/config.json`
//!
//! Only one instance may run against a given set of mount points at a time.
//! Nothing here locks them; give each instance its own `paths` section if
//! you need two.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/usr/local/etc/mnemosyne/config.json";

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV_VAR: &str = "MNEMOSYNE_CONFIG";

const DEFAULT_SHARE_MOUNT: &str = "/tmp/mnemosyne-remote";
const DEFAULT_VOLUME_MOUNT: &str = "/tmp/mnemosyne-volume";
const DEFAULT_MAPPER_NAME: &str = "mnemosyne-volume";
const DEFAULT_MAPPER_DIR: &str = "/dev/mapper";
const DEFAULT_MOUNT_TABLE: &str = "/proc/mounts";

/// Fixed locations used while a backup target is up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPaths {
    /// Where the network share is mounted
    #[serde(default = "default_share_mount")]
    pub share_mount: PathBuf,

    /// Where the decrypted filesystem is mounted
    #[serde(default = "default_volume_mount")]
    pub volume_mount: PathBuf,

    /// Device-mapper name for the opened container
    #[serde(default = "default_mapper_name")]
    pub mapper_name: String,

    /// Directory holding device-mapper nodes
    #[serde(default = "default_mapper_dir")]
    pub mapper_dir: PathBuf,

    /// Mount table consulted to see what is mounted
    #[serde(default = "default_mount_table")]
    pub mount_table: PathBuf,
}

fn default_share_mount() -> PathBuf {
    PathBuf::from(DEFAULT_SHARE_MOUNT)
}

fn default_volume_mount() -> PathBuf {
    PathBuf::from(DEFAULT_VOLUME_MOUNT)
}

fn default_mapper_name() -> String {
    DEFAULT_MAPPER_NAME.to_string()
}

fn default_mapper_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MAPPER_DIR)
}

fn default_mount_table() -> PathBuf {
    PathBuf::from(DEFAULT_MOUNT_TABLE)
}

impl Default for MountPaths {
    fn default() -> Self {
        Self {
            share_mount: default_share_mount(),
            volume_mount: default_volume_mount(),
            mapper_name: default_mapper_name(),
            mapper_dir: default_mapper_dir(),
            mount_table: default_mount_table(),
        }
    }
}

impl MountPaths {
    /// Create MountPaths rooted under a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: &Path) -> Self {
        Self {
            share_mount: base_dir.join("remote"),
            volume_mount: base_dir.join("volume"),
            mapper_name: default_mapper_name(),
            mapper_dir: base_dir.join("mapper"),
            mount_table: base_dir.join("mounts"),
        }
    }

    /// Path of the mapped device node once the container is open
    pub fn mapped_device(&self) -> PathBuf {
        self.mapper_dir.join(&self.mapper_name)
    }
}

/// Get the path to the rotation marker for `key` under `root`
pub fn marker_file(root: &Path, key: &str) -> PathBuf {
    root.join(format!("{}.last", key))
}

/// Get the path to generation slot `stage` for `key` under `root`
pub fn generation_slot(root: &Path, key: &str, stage: u32) -> PathBuf {
    root.join(format!("{}.{}", key, stage))
}

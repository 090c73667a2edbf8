//! Backup configuration for mnemosyne
//!
//! The configuration file is JSON with four required sections (`remote`,
//! `store`, `strategy`, `local`) and an optional `paths` section. Each
//! section is parsed on its own so an error names the section it came from.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::paths::MountPaths;
use super::secret::Secret;
use crate::error::{MnemosyneError, MnemosyneResult};
use crate::rotation::MarkerPolicy;

/// Where the encrypted store file lives
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum RemoteTarget {
    /// A CIFS share mounted for the duration of the run
    #[serde(rename = "cifs")]
    NetworkShare {
        /// Share address, e.g. `//nas.local/backup`
        #[serde(rename = "volume")]
        address: String,
        username: String,
        #[serde(rename = "password")]
        secret: Secret,
    },

    /// A directory on a device that is already mounted; no mount step
    #[serde(rename = "block")]
    BlockDevice {
        #[serde(rename = "device")]
        path: PathBuf,
    },
}

/// Identity and provisioning parameters of the encrypted container file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSpec {
    /// File name of the container, relative to the share mount
    pub name: String,

    /// Container size in GiB, used only when provisioning
    #[serde(rename = "size")]
    pub size_gib: u64,

    /// Keyfile protecting the container
    #[serde(rename = "keyfile")]
    pub keyfile_path: PathBuf,
}

/// Retention depth and cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationStrategy {
    /// Number of generations kept per key (slot 0 included)
    #[serde(rename = "stages")]
    pub stage_count: u32,

    /// Minimum hours between rotations; 0 rotates every cycle
    #[serde(rename = "rotate")]
    pub rotate_interval_hours: u64,

    /// When a rotation is recorded relative to the mirror sync
    #[serde(rename = "marker", default)]
    pub marker_policy: MarkerPolicy,
}

impl RotationStrategy {
    /// Rotation interval in seconds
    pub fn interval_secs(&self) -> u64 {
        self.rotate_interval_hours.saturating_mul(3600)
    }
}

/// One directory to back up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySpec {
    /// Unique key naming the slots and marker on the volume
    pub key: String,

    /// Local directory to back up
    #[serde(rename = "directory")]
    pub source_path: PathBuf,
}

/// The `local` section: what to back up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSpec {
    pub directories: Vec<DirectorySpec>,
}

/// Fully parsed and validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub remote: RemoteTarget,
    pub store: StoreSpec,
    pub strategy: RotationStrategy,
    pub directories: Vec<DirectorySpec>,
    pub paths: MountPaths,
}

impl Config {
    /// Load and validate the configuration file at `path`
    pub fn load(path: &Path) -> MnemosyneResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MnemosyneError::Config(format!(
                "Parsing config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&contents)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(contents: &str) -> MnemosyneResult<Self> {
        let root: serde_json::Value = serde_json::from_str(contents)
            .map_err(|e| MnemosyneError::Config(format!("Parsing config file: {}", e)))?;

        let remote = section(&root, "remote")?;
        let store = section(&root, "store")?;
        let strategy = section(&root, "strategy")?;
        let local: LocalSpec = section(&root, "local")?;
        let paths = match root.get("paths") {
            Some(_) => section(&root, "paths")?,
            None => MountPaths::default(),
        };

        let config = Self {
            remote,
            store,
            strategy,
            directories: local.directories,
            paths,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> MnemosyneResult<()> {
        match &self.remote {
            RemoteTarget::NetworkShare {
                address, username, ..
            } => {
                if address.trim().is_empty() {
                    return Err(invalid("remote", "share address must not be empty"));
                }
                // mount.cifs splits its -o list on commas
                if username.contains(',') {
                    return Err(invalid("remote", "username must not contain ','"));
                }
            }
            RemoteTarget::BlockDevice { path } => {
                if !path.is_absolute() {
                    return Err(invalid(
                        "remote",
                        format!("device '{}' must be an absolute path", path.display()),
                    ));
                }
            }
        }

        if self.store.name.is_empty() || self.store.name.contains('/') {
            return Err(invalid(
                "store",
                "name must be a plain file name without '/'",
            ));
        }
        if self.store.size_gib == 0 {
            return Err(invalid("store", "size must be at least 1 GiB"));
        }

        if self.strategy.stage_count == 0 {
            return Err(invalid("strategy", "stages must be at least 1"));
        }

        if self.directories.is_empty() {
            return Err(invalid("local", "at least one directory is required"));
        }

        let mut seen = HashSet::new();
        for dir in &self.directories {
            if dir.key.is_empty() || dir.key.contains('/') {
                return Err(invalid(
                    "local",
                    format!("key '{}' must be non-empty and contain no '/'", dir.key),
                ));
            }
            if !seen.insert(dir.key.as_str()) {
                return Err(invalid("local", format!("duplicate key '{}'", dir.key)));
            }
            if dir.source_path.as_os_str().is_empty() {
                return Err(invalid(
                    "local",
                    format!("directory for key '{}' must not be empty", dir.key),
                ));
            }
        }

        // the kernel mount table only lists absolute paths
        let paths = &self.paths;
        for (name, path) in [
            ("share_mount", &paths.share_mount),
            ("volume_mount", &paths.volume_mount),
            ("mapper_dir", &paths.mapper_dir),
            ("mount_table", &paths.mount_table),
        ] {
            if !path.is_absolute() {
                return Err(invalid(
                    "paths",
                    format!("{} '{}' must be an absolute path", name, path.display()),
                ));
            }
        }
        if paths.mapper_name.is_empty() || paths.mapper_name.contains('/') {
            return Err(invalid(
                "paths",
                "mapper_name must be a plain device name without '/'",
            ));
        }

        Ok(())
    }
}

fn section<T: DeserializeOwned>(root: &serde_json::Value, name: &str) -> MnemosyneResult<T> {
    let value = root
        .get(name)
        .ok_or_else(|| invalid(name, "section is missing"))?;

    serde_json::from_value(value.clone()).map_err(|e| invalid(name, e))
}

fn invalid(section: &str, reason: impl std::fmt::Display) -> MnemosyneError {
    MnemosyneError::Config(format!("Parsing '{}' config: {}", section, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "remote": {"type": "cifs", "volume": "//nas/backup",
                   "username": "backup", "password": "s3cret"},
        "store": {"name": "backup.store", "size": 500, "keyfile": "/root/backup.key"},
        "strategy": {"stages": 7, "rotate": 24},
        "local": {"directories": [
            {"key": "home", "directory": "/home"},
            {"key": "etc", "directory": "/etc"}
        ]}
    }"#;

    fn sample_with(patch: impl FnOnce(&mut serde_json::Value)) -> String {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        patch(&mut value);
        value.to_string()
    }

    #[test]
    fn test_parse_sample() {
        let config = Config::from_json(SAMPLE).unwrap();

        match &config.remote {
            RemoteTarget::NetworkShare { address, username, secret } => {
                assert_eq!(address, "//nas/backup");
                assert_eq!(username, "backup");
                assert_eq!(secret.expose(), "s3cret");
            }
            other => panic!("unexpected remote {:?}", other),
        }
        assert_eq!(config.store.size_gib, 500);
        assert_eq!(config.strategy.stage_count, 7);
        assert_eq!(config.strategy.interval_secs(), 24 * 3600);
        assert_eq!(config.directories.len(), 2);
        assert_eq!(config.directories[0].key, "home");
        assert_eq!(config.paths, MountPaths::default());
    }

    #[test]
    fn test_parse_block_remote() {
        let json = sample_with(|v| {
            v["remote"] = serde_json::json!({"type": "block", "device": "/mnt/usb"});
        });
        let config = Config::from_json(&json).unwrap();
        assert_eq!(
            config.remote,
            RemoteTarget::BlockDevice { path: PathBuf::from("/mnt/usb") }
        );
    }

    #[test]
    fn test_unknown_remote_type() {
        let json = sample_with(|v| v["remote"]["type"] = "nfs".into());
        let err = Config::from_json(&json).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("Parsing 'remote' config"));
    }

    #[test]
    fn test_missing_section() {
        let json = sample_with(|v| {
            v.as_object_mut().unwrap().remove("strategy");
        });
        let err = Config::from_json(&json).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Parsing 'strategy' config: section is missing"
        );
    }

    #[test]
    fn test_zero_stages_rejected() {
        let json = sample_with(|v| v["strategy"]["stages"] = serde_json::json!(0));
        let err = Config::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("stages must be at least 1"));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let json = sample_with(|v| v["local"]["directories"][1]["key"] = "home".into());
        let err = Config::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("duplicate key 'home'"));
    }

    #[test]
    fn test_empty_directory_list_rejected() {
        let json = sample_with(|v| v["local"]["directories"] = serde_json::json!([]));
        assert!(Config::from_json(&json).unwrap_err().is_config());
    }

    #[test]
    fn test_store_name_with_slash_rejected() {
        let json = sample_with(|v| v["store"]["name"] = "../escape".into());
        assert!(Config::from_json(&json).unwrap_err().is_config());
    }

    #[test]
    fn test_paths_section_overrides_defaults() {
        let json = sample_with(|v| {
            v["paths"] = serde_json::json!({"share_mount": "/srv/share"});
        });
        let config = Config::from_json(&json).unwrap();
        assert_eq!(config.paths.share_mount, PathBuf::from("/srv/share"));
        assert_eq!(config.paths.mapper_name, "mnemosyne-volume");
    }

    #[test]
    fn test_relative_mount_points_rejected() {
        for field in ["share_mount", "volume_mount", "mapper_dir", "mount_table"] {
            let json = sample_with(|v| {
                v["paths"] = serde_json::json!({ field: "relative/dir" });
            });
            let err = Config::from_json(&json).unwrap_err();
            assert!(err.is_config());
            assert!(
                err.to_string().contains(&format!("Parsing 'paths' config: {}", field)),
                "{}",
                err
            );
        }
    }

    #[test]
    fn test_mapper_name_with_slash_rejected() {
        let json = sample_with(|v| {
            v["paths"] = serde_json::json!({"mapper_name": "../sda"});
        });
        let err = Config::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("mapper_name"));

        let json = sample_with(|v| v["paths"] = serde_json::json!({"mapper_name": ""}));
        assert!(Config::from_json(&json).unwrap_err().is_config());
    }

    #[test]
    fn test_username_with_comma_rejected() {
        let json = sample_with(|v| v["remote"]["username"] = "backup,uid=0".into());
        let err = Config::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("Parsing 'remote' config: username"));
    }

    #[test]
    fn test_relative_block_device_rejected() {
        let json = sample_with(|v| {
            v["remote"] = serde_json::json!({"type": "block", "device": "mnt/usb"});
        });
        assert!(Config::from_json(&json).unwrap_err().is_config());
    }

    #[test]
    fn test_marker_policy_defaults_and_parses() {
        let config = Config::from_json(SAMPLE).unwrap();
        assert_eq!(config.strategy.marker_policy, MarkerPolicy::BeforeSync);

        let json = sample_with(|v| v["strategy"]["marker"] = "after-sync".into());
        let config = Config::from_json(&json).unwrap();
        assert_eq!(config.strategy.marker_policy, MarkerPolicy::AfterSync);

        let json = sample_with(|v| v["strategy"]["marker"] = "whenever".into());
        let err = Config::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("Parsing 'strategy' config"));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.name, "backup.store");
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(&temp_dir.path().join("nope.json")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_secret_not_in_debug() {
        let config = Config::from_json(SAMPLE).unwrap();
        assert!(!format!("{:?}", config).contains("s3cret"));
    }
}

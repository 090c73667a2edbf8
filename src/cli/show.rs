//! The config command: print what a run would use

use std::fmt::Write;
use std::path::Path;

use crate::config::{Config, RemoteTarget};
use crate::rotation::MarkerPolicy;

/// Handle the config command
pub fn handle_config(config_path: &Path, config: &Config) {
    print!("{}", render(config_path, config));
}

/// Human-readable summary of `config`, with the share password redacted
pub fn render(config_path: &Path, config: &Config) -> String {
    let mut out = String::new();

    // writing to a String cannot fail
    let _ = writeln!(out, "Configuration: {}", config_path.display());
    let _ = writeln!(out);

    match &config.remote {
        RemoteTarget::NetworkShare {
            address,
            username,
            secret,
        } => {
            let _ = writeln!(out, "Remote:      cifs {}", address);
            let _ = writeln!(out, "  User:      {}", username);
            let _ = writeln!(out, "  Password:  {}", secret);
        }
        RemoteTarget::BlockDevice { path } => {
            let _ = writeln!(out, "Remote:      block {}", path.display());
        }
    }

    let _ = writeln!(out, "Store:       {}", config.store.name);
    let _ = writeln!(out, "  Size:      {} GiB", config.store.size_gib);
    let _ = writeln!(out, "  Keyfile:   {}", config.store.keyfile_path.display());

    let _ = writeln!(
        out,
        "Strategy:    {} stages, rotate every {} h",
        config.strategy.stage_count, config.strategy.rotate_interval_hours
    );
    let _ = writeln!(
        out,
        "  Marker:    {}",
        match config.strategy.marker_policy {
            MarkerPolicy::BeforeSync => "recorded before mirror sync",
            MarkerPolicy::AfterSync => "recorded after mirror sync",
        }
    );

    let _ = writeln!(out, "Directories:");
    for dir in &config.directories {
        let _ = writeln!(out, "  {:<12} {}", dir.key, dir.source_path.display());
    }

    let paths = &config.paths;
    let _ = writeln!(out, "Paths:");
    let _ = writeln!(out, "  Share mount:  {}", paths.share_mount.display());
    let _ = writeln!(out, "  Volume mount: {}", paths.volume_mount.display());
    let _ = writeln!(out, "  Mapped device: {}", paths.mapped_device().display());
    let _ = writeln!(out, "  Mount table:  {}", paths.mount_table.display());

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "remote": {"type": "cifs", "volume": "//nas/backup", "username": "backup", "password": "hunter2"},
        "store": {"name": "backup.store", "size": 500, "keyfile": "/root/backup.key"},
        "strategy": {"stages": 7, "rotate": 24},
        "local": {"directories": [
            {"key": "home", "directory": "/home"},
            {"key": "etc", "directory": "/etc"}
        ]}
    }"#;

    #[test]
    fn test_password_is_redacted() {
        let config = Config::from_json(CONFIG).unwrap();
        let text = render(Path::new("/etc/mnemosyne.json"), &config);

        assert!(!text.contains("hunter2"));
        assert!(text.contains("[REDACTED]"));
        assert!(text.contains("//nas/backup"));
    }

    #[test]
    fn test_lists_directories_in_order() {
        let config = Config::from_json(CONFIG).unwrap();
        let text = render(Path::new("/etc/mnemosyne.json"), &config);

        let home = text.find("/home").unwrap();
        let etc = text.find("/etc\n").unwrap();
        assert!(home < etc);
        assert!(text.contains("7 stages, rotate every 24 h"));
        assert!(text.contains("/dev/mapper/mnemosyne-volume"));
    }
}

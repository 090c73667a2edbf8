//! External operations the rotator relies on
//!
//! Generation slots are btrfs subvolumes so a snapshot is copy-on-write and
//! cheap; directory contents are moved with rsync.

use std::path::Path;

use tracing::info;

use crate::error::{MnemosyneError, MnemosyneResult};
use crate::exec::{CommandRunner, Invocation};

/// Creates, snapshots and deletes generation slots
pub trait SlotStore {
    /// Create an empty slot
    fn create(&self, slot: &Path) -> MnemosyneResult<()>;

    /// Make `dest` a point-in-time copy of `src`, leaving `src` untouched
    fn snapshot(&self, src: &Path, dest: &Path) -> MnemosyneResult<()>;

    /// Irreversibly discard a slot
    fn delete(&self, slot: &Path) -> MnemosyneResult<()>;
}

/// How a sync treats destination files missing from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Delete them, so the destination becomes an exact copy
    Mirror,
    /// Keep them; only add and update
    Additive,
}

/// Copies a directory tree into a slot
pub trait Syncer {
    fn sync(&self, src: &Path, dest: &Path, mode: SyncMode) -> MnemosyneResult<()>;
}

/// Slots as btrfs subvolumes
pub struct BtrfsSlots<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> BtrfsSlots<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl SlotStore for BtrfsSlots<'_> {
    fn create(&self, slot: &Path) -> MnemosyneResult<()> {
        info!("Creating subvolume {}...", slot.display());
        self.runner
            .run(
                &Invocation::new("btrfs")
                    .args(["subvolume", "create"])
                    .arg(slot.display()),
            )
            .map_err(|e| MnemosyneError::Snapshot(format!("Creation of subvolume: {}", e)))
    }

    fn snapshot(&self, src: &Path, dest: &Path) -> MnemosyneResult<()> {
        info!("Snapshotting {} to {}...", src.display(), dest.display());
        self.runner
            .run(
                &Invocation::new("btrfs")
                    .args(["subvolume", "snapshot"])
                    .arg(src.display())
                    .arg(dest.display()),
            )
            .map_err(|e| MnemosyneError::Snapshot(format!("Subvolume snapshot: {}", e)))
    }

    fn delete(&self, slot: &Path) -> MnemosyneResult<()> {
        info!("Deleting subvolume {}...", slot.display());
        self.runner
            .run(
                &Invocation::new("btrfs")
                    .args(["subvolume", "delete"])
                    .arg(slot.display()),
            )
            .map_err(|e| MnemosyneError::Snapshot(format!("Removal of subvolume: {}", e)))
    }
}

/// Directory sync with rsync in archive mode
pub struct Rsync<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Rsync<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl Syncer for Rsync<'_> {
    fn sync(&self, src: &Path, dest: &Path, mode: SyncMode) -> MnemosyneResult<()> {
        info!("Syncing directory {} ({:?})...", src.display(), mode);

        let mut inv = Invocation::new("rsync");
        if mode == SyncMode::Mirror {
            inv = inv.arg("--delete");
        }
        // trailing slashes: copy the contents, not the directory itself
        let inv = inv
            .arg("-a")
            .arg(format!("{}/", src.display()))
            .arg(format!("{}/", dest.display()));

        self.runner
            .run(&inv)
            .map_err(|e| MnemosyneError::Sync(format!("Directory sync failed: {}", e)))?;

        info!("Sync complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;

    #[test]
    fn test_btrfs_commands() {
        let runner = FakeRunner::new();
        let slots = BtrfsSlots::new(&runner);

        slots.create(Path::new("/v/home.0")).unwrap();
        slots
            .snapshot(Path::new("/v/home.0"), Path::new("/v/home.1"))
            .unwrap();
        slots.delete(Path::new("/v/home.1")).unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "btrfs subvolume create /v/home.0",
                "btrfs subvolume snapshot /v/home.0 /v/home.1",
                "btrfs subvolume delete /v/home.1",
            ]
        );
    }

    #[test]
    fn test_btrfs_failure_is_snapshot_error() {
        let runner = FakeRunner::new();
        runner.fail("btrfs subvolume snapshot", 1);
        let slots = BtrfsSlots::new(&runner);

        let err = slots
            .snapshot(Path::new("/v/home.0"), Path::new("/v/home.1"))
            .unwrap_err();
        assert!(matches!(err, MnemosyneError::Snapshot(_)));
    }

    #[test]
    fn test_mirror_deletes() {
        let runner = FakeRunner::new();
        Rsync::new(&runner)
            .sync(Path::new("/home"), Path::new("/v/home.0"), SyncMode::Mirror)
            .unwrap();
        assert_eq!(runner.calls(), vec!["rsync --delete -a /home/ /v/home.0/"]);
    }

    #[test]
    fn test_additive_does_not_delete() {
        let runner = FakeRunner::new();
        Rsync::new(&runner)
            .sync(Path::new("/home"), Path::new("/v/home.0"), SyncMode::Additive)
            .unwrap();
        assert_eq!(runner.calls(), vec!["rsync -a /home/ /v/home.0/"]);
    }

    #[test]
    fn test_rsync_failure_is_sync_error() {
        let runner = FakeRunner::new();
        runner.fail("rsync", 1);
        let err = Rsync::new(&runner)
            .sync(Path::new("/home"), Path::new("/v/home.0"), SyncMode::Mirror)
            .unwrap_err();
        assert!(matches!(err, MnemosyneError::Sync(_)));
    }
}

//! The btrfs filesystem inside the opened container

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::MountTable;
use crate::error::{MnemosyneError, MnemosyneResult};
use crate::exec::{CommandRunner, Invocation};
use crate::guard::{Resource, ResourceState};

/// The filesystem on the mapped device, mounted at a fixed local point
pub struct LocalVolume<'a> {
    device: PathBuf,
    mount_point: PathBuf,
    table: MountTable,
    runner: &'a dyn CommandRunner,
}

impl<'a> LocalVolume<'a> {
    pub fn new(
        device: PathBuf,
        mount_point: PathBuf,
        table: MountTable,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            device,
            mount_point,
            table,
            runner,
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Put a fresh btrfs filesystem on the device. Destroys its contents.
    pub fn format(&self) -> MnemosyneResult<()> {
        info!("Initialising volume on {}...", self.device.display());
        self.runner
            .run(&Invocation::new("mkfs.btrfs").arg("-f").arg(self.device.display()))
            .map_err(|e| MnemosyneError::Provision(format!("Volume format failed: {}", e)))
    }
}

impl Resource for LocalVolume<'_> {
    fn name(&self) -> &str {
        "backup volume"
    }

    fn probe(&self) -> MnemosyneResult<ResourceState> {
        Ok(if self.table.is_mounted(&self.mount_point)? {
            ResourceState::Active
        } else {
            ResourceState::Inactive
        })
    }

    fn activate(&mut self) -> MnemosyneResult<()> {
        fs::create_dir_all(&self.mount_point).map_err(|e| {
            MnemosyneError::Io(format!(
                "Could not create '{}': {}",
                self.mount_point.display(),
                e
            ))
        })?;

        info!("Mounting volume...");
        self.runner.run(
            &Invocation::new("mount")
                .arg(self.device.display())
                .arg(self.mount_point.display()),
        )
    }

    fn deactivate(&mut self) -> MnemosyneResult<()> {
        info!("Unmounting volume...");
        self.runner
            .run(&Invocation::new("umount").arg(self.mount_point.display()))
    }
}

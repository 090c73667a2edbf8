//! The remote share holding the encrypted store file

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::MountTable;
use crate::config::RemoteTarget;
use crate::error::{MnemosyneError, MnemosyneResult};
use crate::exec::{CommandRunner, Invocation};
use crate::guard::{Resource, ResourceState};

/// A CIFS share mounted at a fixed point, or a pass-through directory on a
/// device that is already mounted
pub struct RemoteShare<'a> {
    target: RemoteTarget,
    mount_point: PathBuf,
    table: MountTable,
    runner: &'a dyn CommandRunner,
}

impl<'a> RemoteShare<'a> {
    /// `mount_point` is used for network shares; a block device target
    /// supplies its own directory.
    pub fn new(
        target: RemoteTarget,
        mount_point: PathBuf,
        table: MountTable,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            target,
            mount_point,
            table,
            runner,
        }
    }

    /// Directory the store file lives in while the share is active
    pub fn mount_point(&self) -> &Path {
        match &self.target {
            RemoteTarget::NetworkShare { .. } => &self.mount_point,
            RemoteTarget::BlockDevice { path } => path,
        }
    }
}

impl Resource for RemoteShare<'_> {
    fn name(&self) -> &str {
        "remote share"
    }

    fn probe(&self) -> MnemosyneResult<ResourceState> {
        match &self.target {
            // never ours to unmount
            RemoteTarget::BlockDevice { .. } => Ok(ResourceState::Inactive),
            RemoteTarget::NetworkShare { .. } => Ok(if self.table.is_mounted(&self.mount_point)? {
                ResourceState::Active
            } else {
                ResourceState::Inactive
            }),
        }
    }

    fn activate(&mut self) -> MnemosyneResult<()> {
        match &self.target {
            RemoteTarget::BlockDevice { path } => {
                if !path.is_dir() {
                    return Err(MnemosyneError::Io(format!(
                        "Block device target {} is not a mounted directory",
                        path.display()
                    )));
                }
                info!("Using block device target at {}", path.display());
                Ok(())
            }
            RemoteTarget::NetworkShare {
                address,
                username,
                secret,
            } => {
                fs::create_dir_all(&self.mount_point).map_err(|e| {
                    MnemosyneError::Io(format!(
                        "Could not create '{}': {}",
                        self.mount_point.display(),
                        e
                    ))
                })?;

                info!("Mounting remote FS {}...", address);
                // mount.cifs reads the password from $PASSWD
                self.runner.run(
                    &Invocation::new("mount.cifs")
                        .arg(address)
                        .arg(self.mount_point.display())
                        .args(["-o".to_string(), format!("user={}", username)])
                        .secret_env("PASSWD", secret.clone()),
                )
            }
        }
    }

    fn deactivate(&mut self) -> MnemosyneResult<()> {
        match &self.target {
            RemoteTarget::BlockDevice { .. } => Ok(()),
            RemoteTarget::NetworkShare { .. } => {
                info!("Unmounting remote FS...");
                self.runner
                    .run(&Invocation::new("umount").arg(self.mount_point.display()))
            }
        }
    }
}

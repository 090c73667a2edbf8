//! The LUKS container file on the remote share

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::{MnemosyneError, MnemosyneResult};
use crate::exec::{CommandRunner, Invocation};
use crate::guard::{Resource, ResourceState};

/// An encrypted container opened as `<mapper_dir>/<mapper_name>`
pub struct EncryptedVolume<'a> {
    container: PathBuf,
    keyfile: PathBuf,
    mapper_name: String,
    device: PathBuf,
    runner: &'a dyn CommandRunner,
}

impl<'a> EncryptedVolume<'a> {
    pub fn new(
        container: PathBuf,
        keyfile: PathBuf,
        mapper_name: String,
        mapper_dir: &Path,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        let device = mapper_dir.join(&mapper_name);
        Self {
            container,
            keyfile,
            mapper_name,
            device,
            runner,
        }
    }

    /// Mapped device node, present while the container is open
    pub fn device_path(&self) -> &Path {
        &self.device
    }

    pub fn container(&self) -> &Path {
        &self.container
    }

    /// Create the sparse container file and format it as LUKS.
    ///
    /// Refuses to touch an existing container. If either step fails the
    /// partly created file is removed again.
    pub fn provision(&self, size_gib: u64) -> MnemosyneResult<()> {
        if self.container.exists() {
            return Err(MnemosyneError::Provision(format!(
                "Store '{}' already exists, refusing to initialise it",
                self.container.display()
            )));
        }

        info!("Creating encrypted store file ({} GiB)...", size_gib);
        if let Err(e) = self.runner.run(
            &Invocation::new("truncate")
                .args(["-s".to_string(), format!("{}G", size_gib)])
                .arg(self.container.display()),
        ) {
            self.discard();
            return Err(MnemosyneError::Provision(format!(
                "Backup store creation failed: {}",
                e
            )));
        }

        info!("Setting up encryption key...");
        if let Err(e) = self.runner.run(
            &Invocation::new("cryptsetup")
                .args(["--batch-mode", "luksFormat"])
                .arg(self.container.display())
                .arg(self.keyfile.display()),
        ) {
            self.discard();
            return Err(MnemosyneError::Provision(format!(
                "Backup store format failed: {}",
                e
            )));
        }

        Ok(())
    }

    /// Remove an incompletely provisioned container file, if there is one.
    /// Only call this while the container is closed.
    pub fn discard(&self) {
        match fs::remove_file(&self.container) {
            Ok(()) => warn!("Removed incomplete store {}", self.container.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => error!(
                "Could not remove incomplete store {}: {}",
                self.container.display(),
                e
            ),
        }
    }
}

impl Resource for EncryptedVolume<'_> {
    fn name(&self) -> &str {
        "encrypted store"
    }

    fn probe(&self) -> MnemosyneResult<ResourceState> {
        Ok(if self.device.exists() {
            ResourceState::Active
        } else {
            ResourceState::Inactive
        })
    }

    fn activate(&mut self) -> MnemosyneResult<()> {
        info!("Opening encrypted store {}...", self.container.display());
        self.runner.run(
            &Invocation::new("cryptsetup")
                .arg("open")
                .arg(self.container.display())
                .arg(&self.mapper_name)
                .arg("--key-file")
                .arg(self.keyfile.display()),
        )
    }

    fn deactivate(&mut self) -> MnemosyneResult<()> {
        info!("Closing encrypted store...");
        self.runner
            .run(&Invocation::new("cryptsetup").arg("close").arg(&self.mapper_name))
    }
}

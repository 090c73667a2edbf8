//! Nested acquisition of the backup target

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::error::{MnemosyneError, MnemosyneResult};
use crate::exec::CommandRunner;
use crate::guard::{Guards, RetryPolicy, Sleeper};
use crate::resources::{EncryptedVolume, LocalVolume, MountTable, RemoteShare};
use crate::rotation::{BtrfsSlots, Clock, CycleReport, GenerationalRotator, Rsync};
use crate::signal::ShutdownCheck;

/// Drives one invocation against one backup target
pub struct Orchestrator<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    sleeper: &'a dyn Sleeper,
    clock: &'a dyn Clock,
    guards: Guards<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        runner: &'a dyn CommandRunner,
        sleeper: &'a dyn Sleeper,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            config,
            runner,
            sleeper,
            clock,
            guards: Guards::new(RetryPolicy::default(), sleeper),
        }
    }

    fn mount_table(&self) -> MountTable {
        MountTable::new(self.config.paths.mount_table.clone())
    }

    fn remote_share(&self) -> RemoteShare<'a> {
        RemoteShare::new(
            self.config.remote.clone(),
            self.config.paths.share_mount.clone(),
            self.mount_table(),
            self.runner,
        )
    }

    fn encrypted_volume(&self, share_mount: &Path) -> EncryptedVolume<'a> {
        EncryptedVolume::new(
            share_mount.join(&self.config.store.name),
            self.config.store.keyfile_path.clone(),
            self.config.paths.mapper_name.clone(),
            &self.config.paths.mapper_dir,
            self.runner,
        )
    }

    fn local_volume(&self, device: &Path) -> LocalVolume<'a> {
        LocalVolume::new(
            device.to_path_buf(),
            self.config.paths.volume_mount.clone(),
            self.mount_table(),
            self.runner,
        )
    }

    /// Take down whatever an earlier run left up, innermost layer first.
    ///
    /// Each guard also recovers its own layer on entry, but outermost first:
    /// the share cannot be unmounted while the container on it is open.
    fn recover_stale(&self) -> MnemosyneResult<()> {
        let share = self.remote_share();
        let mut volume = self.local_volume(&self.config.paths.mapped_device());
        self.guards.recover(&mut volume)?;

        let mut store = self.encrypted_volume(share.mount_point());
        self.guards.recover(&mut store)
    }

    /// Run `body` with the backup volume mounted, passing it the volume's
    /// mount point. Every layer is down again when this returns.
    pub fn with_volume<T, F>(&self, body: F) -> MnemosyneResult<T>
    where
        F: FnOnce(&Path) -> MnemosyneResult<T>,
    {
        self.recover_stale()?;

        let mut share = self.remote_share();
        self.guards.scoped(&mut share, |share| {
            let mut store = self.encrypted_volume(share.mount_point());
            self.guards.scoped(&mut store, |store| {
                let mut volume = self.local_volume(store.device_path());
                self.guards
                    .scoped(&mut volume, |volume| body(volume.mount_point()))
            })
        })
    }

    /// Back up every configured directory once, in order.
    ///
    /// The first failing key ends the cycle; later keys are not attempted.
    /// `shutdown` is checked before each key.
    pub fn run_cycle(&self, shutdown: &dyn ShutdownCheck) -> MnemosyneResult<Vec<CycleReport>> {
        self.with_volume(|root| {
            let slots = BtrfsSlots::new(self.runner);
            let syncer = Rsync::new(self.runner);
            let rotator = GenerationalRotator::new(&slots, &syncer, self.clock);

            let mut reports = Vec::with_capacity(self.config.directories.len());
            for dir in &self.config.directories {
                if shutdown.should_stop() {
                    return Err(MnemosyneError::Cancelled(format!("backing up '{}'", dir.key)));
                }

                info!("Backing up {} ({})...", dir.key, dir.source_path.display());
                let report = rotator.run(&dir.key, &dir.source_path, root, &self.config.strategy)?;
                reports.push(report);
            }
            Ok(reports)
        })
    }

    /// Mount the backup volume and keep it mounted until `shutdown` says
    /// stop, checking every `poll`.
    pub fn mount_and_hold(&self, shutdown: &dyn ShutdownCheck, poll: Duration) -> MnemosyneResult<()> {
        self.with_volume(|root| {
            println!("Backup volume mounted at {}", root.display());
            println!("Press Ctrl-C to unmount and exit.");

            while !shutdown.should_stop() {
                self.sleeper.sleep(poll);
            }

            info!("Releasing backup volume...");
            Ok(())
        })
    }

    /// Create a new encrypted store on the remote and put an empty btrfs
    /// volume in it. Refuses to touch an existing store.
    pub fn init_store(&self) -> MnemosyneResult<()> {
        let keyfile = &self.config.store.keyfile_path;
        if !keyfile.is_file() {
            return Err(MnemosyneError::Provision(format!(
                "Keyfile {} does not exist; create one with init-key",
                keyfile.display()
            )));
        }

        self.recover_stale()?;

        let mut share = self.remote_share();
        self.guards.scoped(&mut share, |share| {
            let mut store = self.encrypted_volume(share.mount_point());
            store.provision(self.config.store.size_gib)?;

            let formatted = self.guards.scoped(&mut store, |store| {
                self.local_volume(store.device_path()).format()
            });
            // a container that failed to close may still be in use
            if matches!(&formatted, Err(e) if !e.is_deactivation()) {
                store.discard();
            }
            formatted
        })?;

        info!("Backup store initialised");
        Ok(())
    }
}

//! Generational retention for one backup key
//!
//! Each key owns `stage_count` slots on the backup volume, `<key>.0` through
//! `<key>.<stage_count-1>`. Slot 0 is the live mirror of the source; higher
//! slots are progressively older snapshots.
//!
//! A cycle either rotates or it doesn't, depending on how long ago the
//! marker file says the last rotation happened:
//!
//! - **not due**: rsync the source into slot 0 without deleting anything;
//! - **due**: shift every slot up by one (the oldest is discarded, slot 0
//!   is snapshotted into slot 1), record the rotation time, then mirror the
//!   source into slot 0 with deletion.
//!
//! The rotation time is recorded before the mirror runs by default. A mirror
//! that then fails leaves the marker advanced, so the next rotation waits a
//! full interval even though slot 0 was never completed. `MarkerPolicy`
//! (`strategy.marker` in the configuration) makes that choice explicit.

mod backend;
mod marker;

pub use backend::{BtrfsSlots, Rsync, SlotStore, SyncMode, Syncer};
pub use marker::GenerationMarker;

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::paths::generation_slot;
use crate::config::RotationStrategy;
use crate::error::MnemosyneResult;

/// Source of the current Unix time
pub trait Clock {
    fn now_unix_sec(&self) -> u64;
}

/// Real system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_sec(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// When a rotating cycle records its rotation time
///
/// Set per configuration as `strategy.marker`: `"before-sync"` or
/// `"after-sync"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerPolicy {
    /// Before the mirror sync; a failed sync does not trigger another
    /// rotation until the interval elapses again
    #[default]
    BeforeSync,
    /// Only once the mirror sync has succeeded
    AfterSync,
}

/// What one cycle did for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub key: String,
    pub rotated: bool,
    /// Snapshots taken while shifting slots
    pub snapshots: u32,
    /// Slots deleted to make room
    pub deleted: u32,
}

/// Runs backup cycles against one destination volume
pub struct GenerationalRotator<'a> {
    slots: &'a dyn SlotStore,
    syncer: &'a dyn Syncer,
    clock: &'a dyn Clock,
}

impl<'a> GenerationalRotator<'a> {
    pub fn new(slots: &'a dyn SlotStore, syncer: &'a dyn Syncer, clock: &'a dyn Clock) -> Self {
        Self {
            slots,
            syncer,
            clock,
        }
    }

    /// Back up `source` under `root` for `key`. Any failing step aborts the
    /// cycle; nothing is retried here.
    pub fn run(
        &self,
        key: &str,
        source: &Path,
        root: &Path,
        strategy: &RotationStrategy,
    ) -> MnemosyneResult<CycleReport> {
        let marker = GenerationMarker::new(root, key);
        let last = marker.read()?;
        let now = self.clock.now_unix_sec();
        let live = generation_slot(root, key, 0);

        let mut report = CycleReport {
            key: key.to_string(),
            rotated: false,
            snapshots: 0,
            deleted: 0,
        };

        if now.saturating_sub(last) < strategy.interval_secs() {
            info!("Not rotating backup directories for {}", key);
            if !live.exists() {
                self.slots.create(&live)?;
            }
            self.syncer.sync(source, &live, SyncMode::Additive)?;
            return Ok(report);
        }

        info!("Rotating backup directories for {}...", key);
        for stage in (1..strategy.stage_count).rev() {
            let newer = generation_slot(root, key, stage - 1);
            let older = generation_slot(root, key, stage);
            if !newer.exists() {
                continue;
            }
            if older.exists() {
                self.slots.delete(&older)?;
                report.deleted += 1;
            }
            self.slots.snapshot(&newer, &older)?;
            report.snapshots += 1;
        }
        info!("Rotation successful");

        // checked on its own: with one stage the loop above never runs
        if !live.exists() {
            self.slots.create(&live)?;
        }

        if strategy.marker_policy == MarkerPolicy::BeforeSync {
            marker.write(now)?;
        }
        self.syncer.sync(source, &live, SyncMode::Mirror)?;
        if strategy.marker_policy == MarkerPolicy::AfterSync {
            marker.write(now)?;
        }

        report.rotated = true;
        Ok(report)
    }
}

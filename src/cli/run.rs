//! Commands that bring the backup target up

use std::time::Duration;

use tracing::info;

use crate::backup::Orchestrator;
use crate::config::Config;
use crate::error::MnemosyneResult;
use crate::exec::SystemRunner;
use crate::guard::RealSleeper;
use crate::rotation::{CycleReport, SystemClock};
use crate::signal::ShutdownFlag;

/// How often mount-and-hold checks for a signal
const HOLD_POLL: Duration = Duration::from_millis(500);

/// Handle the backup command
pub fn handle_backup(config: &Config) -> MnemosyneResult<()> {
    let shutdown = ShutdownFlag::install()?;
    let (runner, sleeper, clock) = (SystemRunner::new(), RealSleeper::new(), SystemClock);

    let reports = Orchestrator::new(config, &runner, &sleeper, &clock).run_cycle(&shutdown)?;

    println!();
    for report in &reports {
        println!("  {}", summarize(report));
    }
    info!("Backup complete ({} directories)", reports.len());
    Ok(())
}

/// Handle the mount command
pub fn handle_mount(config: &Config) -> MnemosyneResult<()> {
    let shutdown = ShutdownFlag::install()?;
    let (runner, sleeper, clock) = (SystemRunner::new(), RealSleeper::new(), SystemClock);

    Orchestrator::new(config, &runner, &sleeper, &clock).mount_and_hold(&shutdown, HOLD_POLL)
}

/// Handle the init-store command
pub fn handle_init_store(config: &Config) -> MnemosyneResult<()> {
    let (runner, sleeper, clock) = (SystemRunner::new(), RealSleeper::new(), SystemClock);

    Orchestrator::new(config, &runner, &sleeper, &clock).init_store()?;

    println!(
        "Backup store '{}' created ({} GiB).",
        config.store.name, config.store.size_gib
    );
    Ok(())
}

fn summarize(report: &CycleReport) -> String {
    if report.rotated {
        format!(
            "{}: rotated ({} snapshot{}), mirrored",
            report.key,
            report.snapshots,
            if report.snapshots == 1 { "" } else { "s" }
        )
    } else {
        format!("{}: updated in place", report.key)
    }
}

//! Backup runs for mnemosyne
//!
//! Brings the backup target up, does the work, and takes it down again.
//!
//! # Architecture
//!
//! A backup target is three resources stacked on each other:
//!
//! - the remote share holding the container file
//! - the encrypted container, opened through device-mapper
//! - the btrfs volume inside it, mounted locally
//!
//! `Orchestrator` nests one guard per layer, outermost first, so that
//! whatever fails, each layer that came up is taken down in reverse order.
//!
//! # Modes
//!
//! - backup cycle: one `GenerationalRotator` pass per configured directory,
//!   in configuration order, stopping at the first failure
//! - mount-and-hold: keep the volume mounted until a termination signal
//! - store initialisation: create and format a new container on the share
//!
//! # Example
//!
//! ```rust,ignore
//! use mnemosyne::backup::Orchestrator;
//! use mnemosyne::config::Config;
//! use mnemosyne::exec::SystemRunner;
//! use mnemosyne::guard::RealSleeper;
//! use mnemosyne::rotation::SystemClock;
//! use mnemosyne::signal::ShutdownFlag;
//!
//! let config = Config::load(path)?;
//! let (runner, sleeper, clock) = (SystemRunner::new(), RealSleeper::new(), SystemClock);
//! let shutdown = ShutdownFlag::install()?;
//!
//! let reports = Orchestrator::new(&config, &runner, &sleeper, &clock).run_cycle(&shutdown)?;
//! ```

mod orchestrator;

pub use orchestrator::Orchestrator;

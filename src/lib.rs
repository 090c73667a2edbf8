//! mnemosyne - encrypted generational backups
//!
//! Backs up local directories into a LUKS-encrypted btrfs volume that lives
//! as a single container file on a remote share. Each directory keeps a
//! fixed number of generations as btrfs snapshots, rotated on a schedule.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration file, mount points and secrets
//! - `error`: Custom error types
//! - `exec`: External command invocation
//! - `guard`: Scoped activation and retried teardown of resources
//! - `resources`: The remote share, encrypted container and local volume
//! - `rotation`: Generation slots, rotation markers and directory sync
//! - `backup`: Nested acquisition of the backup target and the run modes
//! - `signal`: Cancellation on SIGINT / SIGTERM
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use mnemosyne::config::Config;
//!
//! let config = Config::load(Path::new("/usr/local/etc/mnemosyne/config.json"))?;
//! mnemosyne::cli::handle_backup(&config)?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod guard;
pub mod resources;
pub mod rotation;
pub mod signal;

#[cfg(test)]
pub(crate) mod testing;

pub use error::MnemosyneError;

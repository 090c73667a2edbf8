//! Configuration module for mnemosyne
//!
//! This module provides configuration management including:
//! - the JSON backup configuration and its validation
//! - fixed mount points and device names
//! - redacted handling of share credentials

pub mod paths;
pub mod secret;
pub mod settings;

pub use paths::MountPaths;
pub use secret::Secret;
pub use settings::{Config, DirectorySpec, RemoteTarget, RotationStrategy, StoreSpec};

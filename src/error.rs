//! Custom error types for mnemosyne
//!
//! One enum for everything that can go wrong in a run. Resource failures say
//! which resource and whether it was going up or coming down.

use std::path::Path;

use thiserror::Error;

/// The main error type for mnemosyne operations
#[derive(Error, Debug)]
pub enum MnemosyneError {
    /// Malformed or missing configuration; raised before anything is mounted
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// An external command could not be started or exited unsuccessfully
    #[error("{program} failed: {status}")]
    Command { program: String, status: String },

    /// A resource could not be brought up (mount, open)
    #[error("Could not activate {resource}: {reason}")]
    Activation { resource: String, reason: String },

    /// A resource could not be torn down after every retry was used
    #[error("Could not deactivate {resource}: {reason}")]
    Deactivation { resource: String, reason: String },

    /// Directory sync failed
    #[error("Sync error: {0}")]
    Sync(String),

    /// Generation slot create/snapshot/delete failed
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// The persisted rotation marker could not be read
    #[error("Invalid rotation marker {path}: {reason}")]
    Marker { path: String, reason: String },

    /// One-time provisioning of the store or volume failed
    #[error("Provisioning error: {0}")]
    Provision(String),

    /// The host environment is missing something we need
    #[error("Verification error: {0}")]
    Verification(String),

    /// The operator interrupted the run
    #[error("Interrupted before {0}")]
    Cancelled(String),
}

impl MnemosyneError {
    /// Create an activation error for the named resource
    pub fn activation(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Activation {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a deactivation error for the named resource
    pub fn deactivation(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Deactivation {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a marker error for the marker file at `path`
    pub fn marker(path: &Path, reason: impl ToString) -> Self {
        Self::Marker {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is an activation error
    pub fn is_activation(&self) -> bool {
        matches!(self, Self::Activation { .. })
    }

    /// Check if this is a deactivation error
    pub fn is_deactivation(&self) -> bool {
        matches!(self, Self::Deactivation { .. })
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for MnemosyneError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for mnemosyne operations
pub type MnemosyneResult<T> = Result<T, MnemosyneError>;

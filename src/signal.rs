//! Cancellation on SIGINT / SIGTERM
//!
//! The handler only raises a flag. Whoever holds resources polls it and
//! unwinds through the normal guard path, so a Ctrl-C never skips teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::{MnemosyneError, MnemosyneResult};

/// Polled between units of work to see whether to stop
pub trait ShutdownCheck {
    fn should_stop(&self) -> bool;
}

/// Set once a termination signal arrives
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Register the process-wide signal handler and return its flag
    pub fn install() -> MnemosyneResult<Self> {
        let shutdown = Self::manual();
        let flag = shutdown.flag.clone();

        ctrlc::set_handler(move || {
            if flag.swap(true, Ordering::SeqCst) {
                warn!("Already shutting down");
            } else {
                warn!("Signal received, shutting down...");
            }
        })
        .map_err(|e| MnemosyneError::Io(format!("Could not install signal handler: {}", e)))?;

        Ok(shutdown)
    }

    /// A flag with no handler behind it; only `trigger` sets it
    pub fn manual() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl ShutdownCheck for ShutdownFlag {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_flag() {
        let flag = ShutdownFlag::manual();
        assert!(!flag.should_stop());

        flag.trigger();
        assert!(flag.should_stop());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = ShutdownFlag::manual();
        let seen_by_loop = flag.clone();

        flag.trigger();
        assert!(seen_by_loop.should_stop());
    }
}

//! Bounded retry with a fixed delay
//!
//! Used for teardown only. Activation is attempted once.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::MnemosyneResult;

/// Trait for sleeping between attempts, so tests don't wait.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Real sleeper that uses `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealSleeper;

impl RealSleeper {
    pub fn new() -> Self {
        Self
    }
}

impl Sleeper for RealSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How many times to attempt an operation and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub attempts: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    /// 5 attempts, 3 seconds apart
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or attempts run out, returning the last
    /// failure in that case. `what` names the operation in log messages.
    pub fn run<T, F>(&self, sleeper: &dyn Sleeper, what: &str, mut op: F) -> MnemosyneResult<T>
    where
        F: FnMut() -> MnemosyneResult<T>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    warn!("{} failed after {} attempts, giving up", what, attempts);
                    return Err(e);
                }
                Err(e) => {
                    info!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        what, attempt, attempts, e, self.delay
                    );
                    sleeper.sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MnemosyneError;
    use crate::testing::NoSleep;
    use std::cell::Cell;

    fn flaky(failures: u32, calls: &Cell<u32>) -> MnemosyneResult<u32> {
        calls.set(calls.get() + 1);
        if calls.get() <= failures {
            Err(MnemosyneError::Io(format!("failure {}", calls.get())))
        } else {
            Ok(calls.get())
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.delay, Duration::from_secs(3));
    }

    #[test]
    fn test_success_first_time() {
        let sleeper = NoSleep::new();
        let calls = Cell::new(0);
        let result = RetryPolicy::default().run(&sleeper, "op", || flaky(0, &calls));
        assert_eq!(result.unwrap(), 1);
        assert_eq!(sleeper.count(), 0);
    }

    #[test]
    fn test_recovers_before_exhaustion() {
        for failures in 1..5 {
            let sleeper = NoSleep::new();
            let calls = Cell::new(0);
            let result = RetryPolicy::default().run(&sleeper, "op", || flaky(failures, &calls));
            assert_eq!(result.unwrap(), failures + 1);
            assert_eq!(sleeper.count(), failures);
            assert_eq!(sleeper.total(), Duration::from_secs(3 * failures as u64));
        }
    }

    #[test]
    fn test_exhaustion_returns_last_error() {
        let sleeper = NoSleep::new();
        let calls = Cell::new(0);
        let err = RetryPolicy::default()
            .run(&sleeper, "op", || flaky(5, &calls))
            .unwrap_err();
        assert_eq!(calls.get(), 5);
        assert_eq!(err.to_string(), "I/O error: failure 5");
        // no pause after the final attempt
        assert_eq!(sleeper.count(), 4);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let sleeper = NoSleep::new();
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            attempts: 0,
            delay: Duration::from_secs(1),
        };
        assert!(policy.run(&sleeper, "op", || flaky(1, &calls)).is_err());
        assert_eq!(calls.get(), 1);
    }
}

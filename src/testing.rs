//! Test doubles shared by the unit tests
//!
//! A command runner that records what it was asked to run, a sleeper that
//! returns immediately, and a clock that reads whatever the test sets.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{MnemosyneError, MnemosyneResult};
use crate::exec::{CommandRunner, Invocation};
use crate::guard::Sleeper;
use crate::rotation::Clock;

/// Records every invocation; programs can be scripted to fail.
#[derive(Default)]
pub struct FakeRunner {
    calls: RefCell<Vec<String>>,
    failures: RefCell<HashMap<String, u32>>,
    hooks: RefCell<Vec<(String, Box<dyn Fn(&Invocation)>)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` invocations whose command line starts with
    /// `prefix` fail.
    pub fn fail(&self, prefix: &str, times: u32) {
        self.failures.borrow_mut().insert(prefix.to_string(), times);
    }

    /// Run `hook` whenever a command line starting with `prefix` succeeds
    pub fn on(&self, prefix: &str, hook: impl Fn(&Invocation) + 'static) {
        self.hooks
            .borrow_mut()
            .push((prefix.to_string(), Box::new(hook)));
    }

    /// Command lines run so far, secrets redacted
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Programs run so far, in order
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| c.split_whitespace().next().unwrap_or_default().to_string())
            .collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> MnemosyneResult<()> {
        let line = format!("{} {}", invocation.program(), invocation.arguments().join(" "));
        let line = line.trim_end().to_string();
        self.calls.borrow_mut().push(line.clone());

        for (prefix, remaining) in self.failures.borrow_mut().iter_mut() {
            if line.starts_with(prefix.as_str()) && *remaining > 0 {
                *remaining -= 1;
                return Err(MnemosyneError::Command {
                    program: invocation.program().to_string(),
                    status: "exit status: 1".to_string(),
                });
            }
        }

        for (prefix, hook) in self.hooks.borrow().iter() {
            if line.starts_with(prefix.as_str()) {
                hook(invocation);
            }
        }
        Ok(())
    }
}

/// Sleeper that only counts what it was asked to do
#[derive(Debug, Default)]
pub struct NoSleep {
    count: Cell<u32>,
    total: Cell<Duration>,
}

impl NoSleep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.count.get()
    }

    pub fn total(&self) -> Duration {
        self.total.get()
    }
}

impl Sleeper for NoSleep {
    fn sleep(&self, duration: Duration) {
        self.count.set(self.count.get() + 1);
        self.total.set(self.total.get() + duration);
    }
}

/// Clock fixed at a settable timestamp
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<u64>,
}

impl FixedClock {
    pub fn new(now: u64) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn advance(&self, secs: u64) {
        self.now.set(self.now.get() + secs);
    }
}

impl Clock for FixedClock {
    fn now_unix_sec(&self) -> u64 {
        self.now.get()
    }
}

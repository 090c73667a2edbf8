//! External command execution
//!
//! Every mount, cryptsetup, btrfs and rsync call goes through a
//! `CommandRunner`. Only the exit status matters; output is passed straight
//! through to the operator's terminal.

use std::fmt;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::Secret;
use crate::error::{MnemosyneError, MnemosyneResult};

/// One external command line
#[derive(Clone)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    secret_env: Vec<(String, Secret)>,
}

impl Invocation {
    /// Start building an invocation of `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret_env: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl fmt::Display) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: fmt::Display,
    {
        self.args.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    /// Pass a secret through the environment rather than the command line
    pub fn secret_env(mut self, name: impl Into<String>, value: Secret) -> Self {
        self.secret_env.push((name.into(), value));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Names of environment variables carrying secrets
    pub fn secret_env_names(&self) -> impl Iterator<Item = &str> {
        self.secret_env.iter().map(|(name, _)| name.as_str())
    }
}

// Secrets never appear here; env values are shown as [REDACTED]
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.secret_env {
            write!(f, "{}={} ", name, value)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invocation({})", self)
    }
}

/// Runs external commands, reporting only success or failure
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> MnemosyneResult<()>;
}

/// Runs commands on the host with `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> MnemosyneResult<()> {
        debug!(command = %invocation, "running");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (name, value) in &invocation.secret_env {
            cmd.env(name, value.expose());
        }

        let status = cmd.status().map_err(|e| MnemosyneError::Command {
            program: invocation.program.clone(),
            status: format!("could not start: {}", e),
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(MnemosyneError::Command {
                program: invocation.program.clone(),
                status: status.to_string(),
            })
        }
    }
}

//! Spawning the kubectl child process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::credentials::KUBECONFIG_VAR;
use crate::errors::Error;

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;

/// Binary the plugin runs.
pub const KUBECTL_BINARY: &str = "kubectl";

/// Exit code for every failure that is not the child's own exit code.
pub const FAILURE_EXIT_CODE: u8 = 1;

/// A fully assembled child process invocation.
///
/// The child inherits stdin, stdout, stderr and the environment of the
/// plugin, except for `KUBECONFIG`: the encoded secret is removed and, when a
/// kubeconfig file was written, replaced by its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    binary: String,
    args: Vec<String>,
    kubeconfig: Option<PathBuf>,
}

impl Invocation {
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
            kubeconfig: None,
        }
    }

    /// Points the child's `KUBECONFIG` at `path`.
    pub fn with_kubeconfig(mut self, path: Option<&Path>) -> Self {
        self.kubeconfig = path.map(Path::to_path_buf);
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn kubeconfig(&self) -> Option<&Path> {
        self.kubeconfig.as_deref()
    }

    /// Builds the [`Command`] without starting it.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .env_remove(KUBECONFIG_VAR);

        if let Some(path) = &self.kubeconfig {
            command.env(KUBECONFIG_VAR, path);
        }

        command
    }

    /// Runs the child to completion.
    ///
    /// # Errors
    ///
    /// Returns `Error::Spawn` when the child cannot be started. A child that
    /// starts and fails is not an error; its status is returned.
    pub fn run(&self) -> Result<ExitStatus, Error> {
        debug!(binary = %self.binary, args = ?self.args, "Starting child process");
        let status = self.command().status().map_err(|source| Error::Spawn {
            binary: self.binary.clone(),
            source,
        })?;
        debug!(%status, "Child process finished");
        Ok(status)
    }
}

/// Renders as the shell-style echo line, without the leading `+ `.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Maps a child status to the plugin's exit code.
///
/// The child's code is passed through. A child terminated by a signal has no
/// code and maps to [`FAILURE_EXIT_CODE`], as does a code outside `0..=255`.
pub fn exit_code(status: ExitStatus) -> u8 {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(FAILURE_EXIT_CODE)
}

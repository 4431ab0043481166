use std::io;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that abort a plugin run.
///
/// Any of these ends the run with a non-zero exit code before, or instead of,
/// the child process result. Failures of individual template files are not
/// represented here: those are skipped and reported while assembling
/// arguments.
#[derive(Error, Debug)]
pub enum Error {
    /// A setting is missing or has a value that cannot be parsed.
    ///
    /// Returned when no kubectl command was given, or a boolean or list
    /// option holds an unparseable value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The kubeconfig secret is not valid base64.
    #[error("Failed to base64 decode kubeconfig: {0}")]
    CredentialDecode(#[from] base64::DecodeError),

    /// The kubectl command string is a template that failed to render.
    #[error("Failed to render kubectl command: {0}")]
    CommandTemplate(#[source] template_engine::Error),

    /// Creating or writing a temporary file failed.
    #[error("{operation}: {source}")]
    FileIo {
        /// What was being attempted
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// The child process could not be started.
    ///
    /// This usually means the binary is not on `PATH`.
    #[error("Failed to start {binary}: {source}")]
    Spawn {
        /// Name of the binary that failed to start
        binary: String,
        #[source]
        source: io::Error,
    },
}

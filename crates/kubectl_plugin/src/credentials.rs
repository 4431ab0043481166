//! Cluster credentials for the kubectl child process.
//!
//! The CI secret arrives base64 encoded in `KUBECONFIG`. When it is empty,
//! kubectl runs with in-cluster credentials; otherwise the decoded
//! kubeconfig is written to a temporary file that lives as long as the
//! [`Credentials`] value.

use std::io::Write;
use std::path::Path;

use base64::Engine as _;
use tempfile::{Builder, TempPath};
use tracing::{debug, info};

use crate::errors::Error;

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;

/// Variable carrying the encoded kubeconfig, and the variable the child reads
/// the kubeconfig path from.
pub const KUBECONFIG_VAR: &str = "KUBECONFIG";

const KUBECONFIG_FILE_PREFIX: &str = "kubeconfig";

/// How kubectl authenticates against the cluster.
#[derive(Debug)]
pub enum Credentials {
    /// Use the service account of the pod the plugin runs in.
    InCluster,

    /// Use the kubeconfig written to this temporary file.
    KubeConfig(TempPath),
}

impl Credentials {
    /// Decodes `encoded` and writes it to a temporary file in `dir`.
    ///
    /// A missing or blank value selects in-cluster credentials. With `debug`
    /// set the decoded kubeconfig is logged.
    ///
    /// # Errors
    ///
    /// - `Error::CredentialDecode` when `encoded` is not valid base64
    /// - `Error::FileIo` when the temporary file cannot be created or written
    pub fn from_encoded(encoded: Option<&str>, dir: &Path, debug: bool) -> Result<Self, Error> {
        let encoded = encoded.map(str::trim).unwrap_or_default();
        if encoded.is_empty() {
            info!("No kubeconfig provided, using in-cluster credentials");
            return Ok(Self::InCluster);
        }

        let kubeconfig = decode_kubeconfig(encoded)?;
        if debug {
            info!(
                "Decoded kubeconfig:\n{}",
                String::from_utf8_lossy(&kubeconfig)
            );
        }

        let path = write_kubeconfig(&kubeconfig, dir)?;
        debug!(path = %path.display(), "Wrote kubeconfig");
        Ok(Self::KubeConfig(path))
    }

    /// Path of the kubeconfig file, `None` for in-cluster credentials.
    pub fn kubeconfig_path(&self) -> Option<&Path> {
        match self {
            Self::InCluster => None,
            Self::KubeConfig(path) => Some(&**path),
        }
    }
}

/// Decodes a standard-alphabet base64 kubeconfig.
///
/// Line breaks are ignored, so output wrapped by `base64` at 76 columns
/// decodes as well.
pub fn decode_kubeconfig(encoded: &str) -> Result<Vec<u8>, Error> {
    let unwrapped: String = encoded.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(unwrapped)?)
}

fn write_kubeconfig(kubeconfig: &[u8], dir: &Path) -> Result<TempPath, Error> {
    let mut file = Builder::new()
        .prefix(KUBECONFIG_FILE_PREFIX)
        .tempfile_in(dir)
        .map_err(|source| Error::FileIo {
            operation: "Failed to create tmp kubeconfig file",
            source,
        })?;

    file.write_all(kubeconfig)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|source| Error::FileIo {
            operation: "Failed to write to tmp kubeconfig file",
            source,
        })?;

    Ok(file.into_temp_path())
}

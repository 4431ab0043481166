use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while turning a template file into a rendered
/// manifest.
///
/// Each variant carries the source template path so the operator can tell
/// which of several templates failed.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The template source could not be read.
    #[error("Failed to read template file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The template source did not render.
    #[error("Failed to render template file {path:?}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: template_engine::Error,
    },

    /// The temporary file for the rendered manifest could not be created.
    #[error("Failed to create temporary file for template {path:?}: {source}")]
    CreateTempFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The rendered manifest could not be written to its temporary file.
    #[error("Failed to write rendered template {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ManifestError {
    /// Path of the template source the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            ManifestError::Read { path, .. }
            | ManifestError::Render { path, .. }
            | ManifestError::CreateTempFile { path, .. }
            | ManifestError::Write { path, .. } => path,
        }
    }
}

//! Rendering template files into temporary manifests.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::{Builder, TempPath};
use template_engine::{TemplateContext, TemplateRenderer};
use tracing::debug;

use crate::errors::ManifestError;

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;

/// Reads `source`, renders it, and writes the result to a new temporary file
/// in `output_dir`.
///
/// The returned [`TempPath`] deletes the file when dropped. On any error no
/// file is left behind.
///
/// The temporary file keeps the template's stem and extension around a unique
/// suffix (`deployment.yaml` becomes `deployment-Xa81Qz.yaml`) so concurrent
/// pipeline steps never collide.
///
/// # Errors
///
/// - `ManifestError::Read`: the template could not be read as UTF-8 text
/// - `ManifestError::Render`: the template failed to parse or execute
/// - `ManifestError::CreateTempFile` / `ManifestError::Write`: the rendered
///   manifest could not be stored
pub fn render_manifest<R>(
    source: &Path,
    renderer: &R,
    context: &TemplateContext,
    output_dir: &Path,
) -> Result<TempPath, ManifestError>
where
    R: TemplateRenderer + ?Sized,
{
    let body = fs::read_to_string(source).map_err(|e| ManifestError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;

    let rendered = renderer
        .render(&body, context)
        .map_err(|e| ManifestError::Render {
            path: source.to_path_buf(),
            source: e,
        })?;

    let (prefix, suffix) = temp_file_affixes(source);
    let mut file = Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile_in(output_dir)
        .map_err(|e| ManifestError::CreateTempFile {
            path: source.to_path_buf(),
            source: e,
        })?;

    file.write_all(rendered.as_bytes())
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| ManifestError::Write {
            path: source.to_path_buf(),
            source: e,
        })?;

    let path = file.into_temp_path();
    debug!(
        template = %source.display(),
        manifest = %path.display(),
        "Rendered template file"
    );

    Ok(path)
}

fn temp_file_affixes(source: &Path) -> (String, String) {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "template".to_string());
    let suffix = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    (format!("{stem}-"), suffix)
}

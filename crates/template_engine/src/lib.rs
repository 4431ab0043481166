//! Template engine for the kubectl pipeline plugin
//!
//! This crate renders command strings and manifest files against variables
//! taken from the CI environment. It provides:
//!
//! - [`TemplateContext`]: environment variables under normalized names
//!   (`DRONE_COMMIT` is `DroneCommit`)
//! - [`HelperFunctionSet`]: the fixed text helpers templates can call
//! - [`HandlebarsTemplateEngine`]: the [`TemplateRenderer`] used in production
//! - [`render_command`]: templating for inline command strings, only applied
//!   when the string contains template markers

mod context;
mod errors;
mod go_compat;
mod handlebars_engine;
mod helpers;

pub use context::{normalize_variable_name, TemplateContext};
pub use errors::Error;
pub use handlebars_engine::{HandlebarsTemplateEngine, TemplateRenderConfig, TemplateRenderer};
pub use helpers::{
    base64_decode, base64_encode, datetime, strftime_layout, truncate, HelperFn, HelperFunctionSet,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Opening template marker.
pub const OPEN_MARKER: &str = "{{";

/// Closing template marker.
pub const CLOSE_MARKER: &str = "}}";

/// Returns true when `text` contains both an opening and a closing marker.
pub fn has_template_markers(text: &str) -> bool {
    text.contains(OPEN_MARKER) && text.contains(CLOSE_MARKER)
}

/// Renders an inline command string when it is a template.
///
/// Strings without both `{{` and `}}` are returned as-is and the renderer is
/// never called, so plain commands cannot fail here.
///
/// # Errors
///
/// Propagates the renderer's error for strings that are templates.
///
/// # Examples
///
/// ```rust
/// use template_engine::{render_command, HandlebarsTemplateEngine, TemplateContext};
///
/// let engine = HandlebarsTemplateEngine::new();
/// let context = TemplateContext::from_env_vars(vec![
///     ("DRONE_COMMIT".to_string(), "v1.2.3".to_string()),
/// ]);
///
/// let command = render_command("set image deployment/foo app=bar:{{ .DroneCommit }}", &engine, &context).unwrap();
/// assert_eq!(command, "set image deployment/foo app=bar:v1.2.3");
///
/// let plain = render_command("get nodes", &engine, &context).unwrap();
/// assert_eq!(plain, "get nodes");
/// ```
pub fn render_command<R>(
    command: &str,
    renderer: &R,
    context: &TemplateContext,
) -> Result<String, Error>
where
    R: TemplateRenderer + ?Sized,
{
    if !has_template_markers(command) {
        return Ok(command.to_string());
    }

    renderer.render(command, context)
}

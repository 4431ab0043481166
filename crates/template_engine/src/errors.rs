use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while rendering a template body.
///
/// Parse failures and execution failures are kept apart so callers can tell a
/// broken template from a template that referenced something it could not
/// resolve at render time.
///
/// # Examples
///
/// ```rust
/// use template_engine::{Error, HandlebarsTemplateEngine, TemplateContext, TemplateRenderer};
///
/// let engine = HandlebarsTemplateEngine::new();
/// let context = TemplateContext::default();
///
/// match engine.render("{{#if Ready}}never closed", &context) {
///     Err(Error::Parse { .. }) => {}
///     other => panic!("expected a parse error, got {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The template body is not syntactically valid.
    ///
    /// Unclosed blocks, malformed expressions and mismatched closing tags all
    /// end up here. Nothing has been rendered when this is returned.
    #[error("Failed to parse template: {message}")]
    Parse {
        /// Detailed error message from the template parser
        message: String,
    },

    /// The template parsed but rendering it failed.
    ///
    /// Examples are a helper called with the wrong argument types, a negative
    /// truncation length, or an undefined variable when strict variables are
    /// enabled.
    #[error("Failed to execute template: {message}")]
    Execute {
        /// Detailed error message from the renderer or the failing helper
        message: String,
    },

    /// The template body is larger than the configured limit.
    #[error("Template size {size} bytes exceeds limit of {limit} bytes")]
    ResourceLimit {
        /// Size of the rejected template body in bytes
        size: usize,
        /// Configured maximum size in bytes
        limit: usize,
    },
}

//! # Handlebars Template Engine
//!
//! Renders template bodies against a [`TemplateContext`] using the Handlebars
//! templating engine with the plugin's helper set installed.
//!
//! ## Features
//!
//! - **Variable Substitution**: `{{ DroneCommit }}`, and Go-template style
//!   `{{ .DroneCommit }}` for templates written for older releases
//! - **Control Structures**: `{{#if}}`, `{{#each}}`, `{{#unless}}`, and Go-style
//!   `{{ if }}`/`{{ range }}`/`{{ with }}` blocks closed by `{{ end }}`
//! - **Helpers**: the fixed [`HelperFunctionSet`], usable directly, as
//!   subexpressions, or through `|` pipelines
//! - **Raw Output**: rendered text is never HTML-escaped, manifests and command
//!   lines are emitted verbatim
//!
//! ## Examples
//!
//! ```rust
//! # use template_engine::{HandlebarsTemplateEngine, TemplateContext, TemplateRenderer};
//! # fn main() -> Result<(), template_engine::Error> {
//! let engine = HandlebarsTemplateEngine::new();
//! let context = TemplateContext::from_env_vars(vec![
//!     ("DRONE_COMMIT".to_string(), "v1.2.3".to_string()),
//!     ("DRONE_BRANCH".to_string(), "main".to_string()),
//! ]);
//!
//! let rendered = engine.render("image: app:{{ .DroneCommit }} ({{ uppercase DroneBranch }})", &context)?;
//! assert_eq!(rendered, "image: app:v1.2.3 (MAIN)");
//! # Ok(())
//! # }
//! ```

use handlebars::{no_escape, Handlebars, Template};
use tracing::debug;

use crate::context::TemplateContext;
use crate::errors::Error;
use crate::go_compat;
use crate::helpers::HelperFunctionSet;

#[cfg(test)]
#[path = "handlebars_tests.rs"]
mod handlebars_tests;

/// Renders a template body against a context.
///
/// This is the seam the argument assembler and the command renderer depend on,
/// so they can be exercised with a substitute renderer.
pub trait TemplateRenderer {
    /// Renders `body` with the variables of `context`.
    ///
    /// # Errors
    ///
    /// - `Error::Parse`: the body is not a valid template
    /// - `Error::Execute`: a variable or helper failed while rendering
    /// - `Error::ResourceLimit`: the body exceeds the size limit
    fn render(&self, body: &str, context: &TemplateContext) -> Result<String, Error>;
}

/// Configuration for template rendering behavior.
///
/// ## Examples
///
/// ```rust
/// use template_engine::TemplateRenderConfig;
///
/// let config = TemplateRenderConfig {
///     strict_variables: true,
///     ..Default::default()
/// };
/// assert_eq!(config.max_template_size, 1_048_576);
/// ```
#[derive(Debug, Clone)]
pub struct TemplateRenderConfig {
    /// Whether to fail on undefined variables (true) or render them as empty
    /// strings (false).
    ///
    /// **Default**: `false`
    pub strict_variables: bool,

    /// Maximum size of template content in bytes.
    ///
    /// **Default**: 1MB (1,048,576 bytes)
    pub max_template_size: usize,
}

impl Default for TemplateRenderConfig {
    fn default() -> Self {
        Self {
            strict_variables: false,
            max_template_size: 1_048_576, // 1MB
        }
    }
}

/// Handlebars-backed [`TemplateRenderer`] with the standard helpers installed.
///
/// The registry is configured once at construction: helpers installed, HTML
/// escaping disabled, strict mode set from the configuration. Rendering only
/// reads it.
pub struct HandlebarsTemplateEngine {
    handlebars: Handlebars<'static>,
    config: TemplateRenderConfig,
}

impl HandlebarsTemplateEngine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(TemplateRenderConfig::default())
    }

    /// Creates an engine with a custom configuration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use template_engine::{HandlebarsTemplateEngine, TemplateContext, TemplateRenderConfig, TemplateRenderer};
    ///
    /// let engine = HandlebarsTemplateEngine::with_config(TemplateRenderConfig {
    ///     strict_variables: true,
    ///     ..Default::default()
    /// });
    ///
    /// assert!(engine.render("{{ Missing }}", &TemplateContext::default()).is_err());
    /// ```
    pub fn with_config(config: TemplateRenderConfig) -> Self {
        let mut handlebars = Handlebars::new();

        handlebars.set_strict_mode(config.strict_variables);
        handlebars.register_escape_fn(no_escape);
        HelperFunctionSet::standard().install(&mut handlebars);

        Self { handlebars, config }
    }

    pub fn config(&self) -> &TemplateRenderConfig {
        &self.config
    }
}

impl Default for HandlebarsTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlebarsTemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarsTemplateEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TemplateRenderer for HandlebarsTemplateEngine {
    fn render(&self, body: &str, context: &TemplateContext) -> Result<String, Error> {
        if body.len() > self.config.max_template_size {
            return Err(Error::ResourceLimit {
                size: body.len(),
                limit: self.config.max_template_size,
            });
        }

        let source = go_compat::translate(body)?;
        debug!(
            bytes = source.len(),
            variables = context.len(),
            "Rendering template"
        );

        // Compile separately so syntax errors are reported as parse failures
        Template::compile(&source).map_err(|e| Error::Parse {
            message: e.to_string(),
        })?;

        self.handlebars
            .render_template(&source, context)
            .map_err(|e| Error::Execute {
                message: e.to_string(),
            })
    }
}

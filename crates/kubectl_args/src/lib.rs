//! Argument assembly for kubectl invocations
//!
//! A base command string such as `apply` or `get pods -n drone` is split into
//! tokens, then an ordered list of [`OptionRule`]s is folded over it. Each rule
//! appends a flag only when no spelling of that flag is already present, so
//! options the user wrote into the command always win over defaults supplied
//! through pipeline settings.
//!
//! ```rust
//! use kubectl_args::{ArgumentAssembler, OptionRule};
//! use template_engine::{HandlebarsTemplateEngine, TemplateContext};
//!
//! let engine = HandlebarsTemplateEngine::new();
//! let context = TemplateContext::default();
//! let assembler = ArgumentAssembler::new(&engine, &context);
//!
//! let line = assembler.assemble(
//!     "get pods -n drone",
//!     vec![
//!         OptionRule::Files(vec!["pod.yaml".to_string()]),
//!         OptionRule::Namespace("app".to_string()),
//!     ],
//! );
//!
//! assert_eq!(line.args(), ["get", "pods", "-n", "drone", "-f", "pod.yaml"]);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use template_engine::{TemplateContext, TemplateRenderer};
use tracing::{debug, warn};

mod errors;
mod manifest;

pub use errors::ManifestError;
pub use manifest::render_manifest;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Spellings of kubectl's file option.
pub const FILENAME_FLAGS: [&str; 2] = ["-f", "--filename"];

/// Spellings of kubectl's namespace option.
pub const NAMESPACE_FLAGS: [&str; 2] = ["-n", "--namespace"];

/// Splits a command string on single spaces.
///
/// There is no shell quoting: repeated spaces produce empty tokens and a value
/// cannot contain a space.
pub fn tokenize(command: &str) -> Vec<String> {
    command.split(' ').map(String::from).collect()
}

/// A template path that could not be turned into a manifest.
#[derive(Debug)]
pub struct SkippedTemplate {
    pub path: PathBuf,
    pub error: ManifestError,
}

/// The argument list being assembled, plus the rendered manifests it refers
/// to.
///
/// Rendered manifests live exactly as long as the command line: dropping it
/// deletes them.
#[derive(Debug, Default)]
pub struct CommandLine {
    args: Vec<String>,
    rendered_manifests: Vec<TempPath>,
    skipped_templates: Vec<SkippedTemplate>,
}

impl CommandLine {
    /// Starts a command line from a base command string.
    pub fn parse(command: &str) -> Self {
        Self {
            args: tokenize(command),
            ..Self::default()
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// True when any spelling in `aliases` is an exact token of the line.
    pub fn contains_any(&self, aliases: &[&str]) -> bool {
        self.args
            .iter()
            .any(|arg| aliases.iter().any(|alias| arg == alias))
    }

    fn push_option(&mut self, flag: &str, value: impl Into<String>) {
        self.args.push(flag.to_string());
        self.args.push(value.into());
    }

    /// Paths of manifests rendered from templates, in injection order.
    pub fn rendered_manifests(&self) -> impl Iterator<Item = &Path> {
        self.rendered_manifests.iter().map(|p| &**p)
    }

    pub fn skipped_templates(&self) -> &[SkippedTemplate] {
        &self.skipped_templates
    }

    /// Splits into the argument list and the guards of the rendered manifests.
    ///
    /// The manifests are deleted once the returned guards are dropped, so keep
    /// them alive until the command has finished.
    pub fn into_parts(self) -> (Vec<String>, Vec<TempPath>) {
        (self.args, self.rendered_manifests)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// One conditionally injected kubectl option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionRule {
    /// `-f <file>` per file, unless a file option is already present.
    Files(Vec<String>),

    /// `--namespace <ns>`, unless empty or a namespace option is already
    /// present.
    Namespace(String),

    /// `-f <rendered>` per template, unless a file option is already present.
    /// Templates that fail to render are skipped.
    TemplateFiles(Vec<PathBuf>),
}

/// Folds [`OptionRule`]s over a base command.
///
/// Holds the renderer and context needed by [`OptionRule::TemplateFiles`].
pub struct ArgumentAssembler<'a, R: ?Sized> {
    renderer: &'a R,
    context: &'a TemplateContext,
    output_dir: PathBuf,
}

impl<'a, R> ArgumentAssembler<'a, R>
where
    R: TemplateRenderer + ?Sized,
{
    /// Creates an assembler writing rendered manifests to the system temporary
    /// directory.
    pub fn new(renderer: &'a R, context: &'a TemplateContext) -> Self {
        Self {
            renderer,
            context,
            output_dir: std::env::temp_dir(),
        }
    }

    /// Writes rendered manifests to `dir` instead of the system temporary
    /// directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Tokenizes `command` and applies `rules` in order.
    pub fn assemble<I>(&self, command: &str, rules: I) -> CommandLine
    where
        I: IntoIterator<Item = OptionRule>,
    {
        rules
            .into_iter()
            .fold(CommandLine::parse(command), |line, rule| {
                self.apply(line, rule)
            })
    }

    /// Applies a single rule.
    pub fn apply(&self, mut line: CommandLine, rule: OptionRule) -> CommandLine {
        match rule {
            OptionRule::Files(files) => {
                if line.contains_any(&FILENAME_FLAGS) {
                    debug!("File option already present, ignoring configured files");
                    return line;
                }
                for file in files {
                    line.push_option("-f", file);
                }
            }
            OptionRule::Namespace(namespace) => {
                if namespace.is_empty() {
                    return line;
                }
                if line.contains_any(&NAMESPACE_FLAGS) {
                    debug!(%namespace, "Namespace option already present, ignoring configured namespace");
                    return line;
                }
                line.push_option("--namespace", namespace);
            }
            OptionRule::TemplateFiles(templates) => {
                if line.contains_any(&FILENAME_FLAGS) {
                    debug!("File option already present, ignoring configured templates");
                    return line;
                }
                for template in templates {
                    match render_manifest(&template, self.renderer, self.context, &self.output_dir)
                    {
                        Ok(manifest) => {
                            line.push_option("-f", manifest.to_string_lossy());
                            line.rendered_manifests.push(manifest);
                        }
                        Err(error) => {
                            warn!(
                                template = %template.display(),
                                %error,
                                "Skipping template file"
                            );
                            line.skipped_templates.push(SkippedTemplate {
                                path: template,
                                error,
                            });
                        }
                    }
                }
            }
        }

        line
    }
}

//! Plugin settings.
//!
//! Every option can come from a command-line flag or from the environment the
//! CI runner provides. Flags win; otherwise the first non-empty variable of the
//! option's alias list is used, `PLUGIN_*` before the legacy bare name.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, warn};

use crate::errors::Error;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Variable naming an env file loaded before settings are resolved.
pub const ENV_FILE_VAR: &str = "PLUGIN_ENV_FILE";

/// Variable holding the `tracing` filter directives.
pub const LOG_FILTER_VAR: &str = "PLUGIN_LOG";

pub const DRY_RUN_VARS: &[&str] = &["PLUGIN_DRY_RUN", "DRY_RUN"];
pub const FILES_VARS: &[&str] = &["PLUGIN_FILES", "FILES"];
pub const KUBECTL_VARS: &[&str] = &["PLUGIN_KUBECTL", "KUBECTL"];
pub const NAMESPACE_VARS: &[&str] = &["PLUGIN_NAMESPACE", "NAMESPACE"];
pub const TEMPLATES_VARS: &[&str] = &["PLUGIN_TEMPLATES", "TEMPLATES"];
pub const DEBUG_VARS: &[&str] = &["PLUGIN_DEBUG", "DEBUG"];
pub const STRICT_TEMPLATES_VARS: &[&str] = &["PLUGIN_STRICT_TEMPLATES", "STRICT_TEMPLATES"];

/// Run kubectl commands from a CI pipeline
#[derive(Parser, Debug, Default)]
#[command(name = "kubectl-plugin", version)]
#[command(about = "Run kubectl commands from a CI pipeline", long_about = None)]
pub struct Cli {
    /// Print the command instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// Manifest files passed to kubectl with -f
    #[arg(long, value_delimiter = ',')]
    pub files: Vec<String>,

    /// The kubectl command to run, e.g. "apply" or "get pods"
    #[arg(long)]
    pub kubectl: Option<String>,

    /// Namespace passed to kubectl with --namespace
    #[arg(long)]
    pub namespace: Option<String>,

    /// Manifest templates rendered against the environment and passed with -f
    #[arg(long, value_delimiter = ',')]
    pub templates: Vec<PathBuf>,

    /// Enable debug output, including the decoded kubeconfig
    #[arg(long)]
    pub debug: bool,

    /// Fail templates that reference undefined variables
    #[arg(long)]
    pub strict_templates: bool,
}

/// Read access to environment variables.
///
/// Lets settings be resolved against a fixed map in tests instead of the
/// process environment.
pub trait EnvSource {
    /// Returns the value of `name`, or `None` when it is unset or not valid
    /// UTF-8.
    fn var(&self, name: &str) -> Option<String>;
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    /// Every variable of the process environment with a UTF-8 name and value.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }
}

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Fully resolved plugin settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginConfig {
    pub dry_run: bool,
    pub files: Vec<String>,
    /// Base kubectl command, possibly a template. Never empty.
    pub kubectl: String,
    pub namespace: String,
    pub templates: Vec<PathBuf>,
    pub debug: bool,
    pub strict_templates: bool,
}

impl PluginConfig {
    /// Merges flags with the environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when no kubectl command is set anywhere, or a
    /// boolean variable holds something other than a recognised spelling.
    pub fn resolve(cli: &Cli, env: &impl EnvSource) -> Result<Self, Error> {
        let kubectl = cli
            .kubectl
            .clone()
            .filter(|command| !command.is_empty())
            .or_else(|| lookup(env, KUBECTL_VARS).map(|(_, value)| value))
            .ok_or_else(|| Error::Config("no kubectl command specified".to_string()))?;

        let files = if cli.files.is_empty() {
            lookup(env, FILES_VARS)
                .map(|(_, value)| parse_list(&value))
                .unwrap_or_default()
        } else {
            trim_list(&cli.files)
        };

        let templates = if cli.templates.is_empty() {
            lookup(env, TEMPLATES_VARS)
                .map(|(_, value)| parse_list(&value).into_iter().map(PathBuf::from).collect())
                .unwrap_or_default()
        } else {
            cli.templates
                .iter()
                .filter(|path| !path.as_os_str().is_empty())
                .cloned()
                .collect()
        };

        let namespace = cli
            .namespace
            .clone()
            .filter(|namespace| !namespace.is_empty())
            .or_else(|| lookup(env, NAMESPACE_VARS).map(|(_, value)| value))
            .unwrap_or_default();

        let config = Self {
            dry_run: resolve_flag(cli.dry_run, env, DRY_RUN_VARS)?,
            files,
            kubectl,
            namespace,
            templates,
            debug: resolve_flag(cli.debug, env, DEBUG_VARS)?,
            strict_templates: resolve_flag(cli.strict_templates, env, STRICT_TEMPLATES_VARS)?,
        };

        debug!(?config, "Resolved plugin configuration");
        Ok(config)
    }
}

/// True when debug output was asked for by flag or environment.
///
/// Used before logging is set up, so an unparseable value counts as off and is
/// reported later by [`PluginConfig::resolve`].
pub fn debug_requested(cli: &Cli, env: &impl EnvSource) -> bool {
    cli.debug || resolve_flag(false, env, DEBUG_VARS).unwrap_or(false)
}

/// Loads the file named by `PLUGIN_ENV_FILE` into the process environment.
///
/// Variables that are already set keep their values. Returns the loaded path,
/// or `None` when no env file is configured.
///
/// # Errors
///
/// Returns `Error::Config` when the file cannot be read or parsed.
pub fn load_env_file(env: &impl EnvSource) -> Result<Option<PathBuf>, Error> {
    let Some(path) = env.var(ENV_FILE_VAR).filter(|path| !path.is_empty()) else {
        return Ok(None);
    };

    let path = PathBuf::from(path);
    load_env_file_from(&path)?;
    Ok(Some(path))
}

fn load_env_file_from(path: &Path) -> Result<(), Error> {
    dotenvy::from_path(path).map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to load env file");
        Error::Config(format!("failed to load env file {}: {e}", path.display()))
    })
}

/// Parses a boolean the way CI settings spell them.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and the matching false
/// spellings.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Splits a comma separated list, trimming entries and dropping empty ones.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

fn trim_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(String::from)
        .collect()
}

/// First alias with a non-empty value, together with the alias name.
fn lookup<'n>(env: &impl EnvSource, names: &[&'n str]) -> Option<(&'n str, String)> {
    names
        .iter()
        .find_map(|name| env.var(name).filter(|value| !value.is_empty()).map(|value| (*name, value)))
}

fn resolve_flag(flag: bool, env: &impl EnvSource, names: &[&str]) -> Result<bool, Error> {
    if flag {
        return Ok(true);
    }

    match lookup(env, names) {
        None => Ok(false),
        Some((name, value)) => parse_bool(&value).ok_or_else(|| {
            Error::Config(format!("could not parse {value:?} as a boolean value for {name}"))
        }),
    }
}

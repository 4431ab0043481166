//! One plugin run, from resolved settings to the child's exit status.

use std::path::PathBuf;
use std::process::ExitStatus;

use kubectl_args::{ArgumentAssembler, CommandLine, OptionRule};
use template_engine::{render_command, TemplateContext, TemplateRenderer};
use tracing::{info, instrument};

use crate::config::PluginConfig;
use crate::credentials::{Credentials, KUBECONFIG_VAR};
use crate::errors::Error;
use crate::runner::{exit_code, Invocation, KUBECTL_BINARY};

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command was printed but not run.
    DryRun,

    /// The child ran and exited with this status.
    Completed(ExitStatus),
}

impl Outcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::DryRun => 0,
            Self::Completed(status) => exit_code(*status),
        }
    }
}

/// Runs kubectl for a [`PluginConfig`].
///
/// Temporary files written during a run (the kubeconfig and rendered
/// manifests) are removed before [`Plugin::run`] returns, on success and on
/// error alike.
pub struct Plugin<'a, R: ?Sized> {
    renderer: &'a R,
    binary: String,
    temp_dir: PathBuf,
}

impl<'a, R> Plugin<'a, R>
where
    R: TemplateRenderer + ?Sized,
{
    pub fn new(renderer: &'a R) -> Self {
        Self {
            renderer,
            binary: KUBECTL_BINARY.to_string(),
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Runs `binary` instead of `kubectl`.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Writes temporary files to `dir` instead of the system temporary
    /// directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Assembles the command line and runs it unless `config.dry_run` is set.
    ///
    /// The command is echoed to stdout as `+ kubectl <args>` either way.
    ///
    /// # Errors
    ///
    /// Everything [`Plugin::prepare`] returns, plus `Error::Spawn` when the
    /// child cannot be started.
    #[instrument(skip_all, fields(command = %config.kubectl, dry_run = config.dry_run))]
    pub fn run(&self, config: &PluginConfig, environment: &[(String, String)]) -> Result<Outcome, Error> {
        let prepared = self.prepare(config, environment)?;
        println!("+ {}", prepared.invocation());

        if config.dry_run {
            info!("Dry run, not starting {}", self.binary);
            return Ok(Outcome::DryRun);
        }

        let status = prepared.invocation().run()?;
        Ok(Outcome::Completed(status))
    }

    /// Renders the command, prepares credentials and assembles the arguments
    /// without starting anything.
    ///
    /// `environment` is the plugin's environment: it supplies the template
    /// variables and the encoded kubeconfig. The kubeconfig variable is never
    /// exposed to templates.
    ///
    /// # Errors
    ///
    /// - `Error::CommandTemplate` when the kubectl command template fails
    /// - `Error::CredentialDecode` or `Error::FileIo` when the kubeconfig
    ///   cannot be prepared
    pub fn prepare(
        &self,
        config: &PluginConfig,
        environment: &[(String, String)],
    ) -> Result<PreparedRun, Error> {
        let context = TemplateContext::from_env_vars(
            environment
                .iter()
                .filter(|(name, _)| name != KUBECONFIG_VAR)
                .cloned(),
        );

        let command = render_command(&config.kubectl, self.renderer, &context)
            .map_err(Error::CommandTemplate)?;

        let encoded = environment
            .iter()
            .find(|(name, _)| name == KUBECONFIG_VAR)
            .map(|(_, value)| value.as_str());
        let credentials = Credentials::from_encoded(encoded, &self.temp_dir, config.debug)?;

        let line = ArgumentAssembler::new(self.renderer, &context)
            .with_output_dir(&self.temp_dir)
            .assemble(
                &command,
                [
                    OptionRule::Files(config.files.clone()),
                    OptionRule::Namespace(config.namespace.clone()),
                    OptionRule::TemplateFiles(config.templates.clone()),
                ],
            );

        let invocation = Invocation::new(self.binary.as_str(), line.args().to_vec())
            .with_kubeconfig(credentials.kubeconfig_path());

        Ok(PreparedRun {
            invocation,
            line,
            credentials,
        })
    }
}

/// An assembled invocation together with the temporary files it refers to.
///
/// Dropping it deletes the kubeconfig and rendered manifests.
#[derive(Debug)]
pub struct PreparedRun {
    invocation: Invocation,
    line: CommandLine,
    credentials: Credentials,
}

impl PreparedRun {
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.line
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

//! CI plugin that runs kubectl.
//!
//! Settings come from flags and the CI environment ([`config`]). A run renders
//! the kubectl command if it is a template, decodes the kubeconfig secret
//! ([`credentials`]), assembles the argument list with the configured files,
//! namespace and manifest templates, echoes it and runs the child
//! ([`runner`]). [`plugin`] ties these steps together.

pub mod config;
pub mod credentials;
pub mod errors;
pub mod plugin;
pub mod runner;

pub use config::{Cli, EnvSource, PluginConfig, ProcessEnv};
pub use credentials::Credentials;
pub use errors::Error;
pub use plugin::{Outcome, Plugin, PreparedRun};
pub use runner::{Invocation, FAILURE_EXIT_CODE, KUBECTL_BINARY};

use std::process::ExitCode;

use clap::Parser;
use kubectl_plugin::config::{self, LOG_FILTER_VAR};
use kubectl_plugin::{Cli, Error, Plugin, PluginConfig, ProcessEnv, FAILURE_EXIT_CODE};
use template_engine::{HandlebarsTemplateEngine, TemplateRenderConfig};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging(debug: bool) {
    let default_directive = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_FILTER_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // stdout belongs to the child
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> Result<u8, Error> {
    let config = PluginConfig::resolve(cli, &ProcessEnv)?;
    let engine = HandlebarsTemplateEngine::with_config(TemplateRenderConfig {
        strict_variables: config.strict_templates,
        ..Default::default()
    });

    let outcome = Plugin::new(&engine).run(&config, &ProcessEnv.snapshot())?;
    Ok(outcome.exit_code())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Loaded before logging so the file can set PLUGIN_LOG and PLUGIN_DEBUG
    let env_file = config::load_env_file(&ProcessEnv);
    init_logging(config::debug_requested(&cli, &ProcessEnv));

    if let Err(e) = env_file {
        error!("Error: {e}");
        return ExitCode::from(FAILURE_EXIT_CODE);
    }

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("Error: {e}");
            ExitCode::from(FAILURE_EXIT_CODE)
        }
    }
}

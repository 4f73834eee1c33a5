use anyhow::Result;
use clap::Parser;
use config::Config;
use std::process::ExitCode;

mod commands;
mod output;
mod runtime;
pub mod ux_error;

use commands::{Cli, Commands};
use ux_error::UxError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<UxError>() {
                Some(ux) => ux.display(),
                None => UxError::new(err.to_string())
                    .why(format!("{err:#}"))
                    .display()
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = cli.log_format.map(|format| {
        let mut config = Config::default();
        config.observability.log_format = format.into();
        config
    });
    let config = runtime::load_config(cli.config.as_deref(), overrides)?;

    runtime::init_tracing(&config, cli.verbose);
    runtime::init_metrics(&config)?;

    match cli.command {
        Commands::Build(args) => commands::build::run(args, &config).await,
        Commands::Query(args) => commands::query::run(args, &config).await,
        Commands::Retrieve(args) => commands::retrieve::run(args, &config).await,
        Commands::Plan(args) => commands::plan::run(args, &config),
        Commands::Check(args) => commands::check::run(args, &config).await,
        Commands::Config(cmd) => commands::settings::run(cmd, &config)
    }
}

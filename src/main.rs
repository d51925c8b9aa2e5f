//! Edgewise CLI entry point.

use anyhow::Result;
use clap::Parser;

use edgewise::cli::{commands, handle_error, Cli, Commands};
use edgewise::domain::models::Config;
use edgewise::infrastructure::logging::{LogConfig, LoggerImpl};
use edgewise::ConfigLoader;

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };
    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, config, cli.json).await,
        Commands::Daemon(args) => commands::daemon::execute(args, config, cli.json).await,
        Commands::Status(args) => commands::status::execute(args, config, cli.json).await,
        Commands::Priority(args) => commands::priority::execute(args, config, cli.json).await,
        Commands::Hypothesis(args) => commands::hypothesis::execute(args, config, cli.json).await,
        Commands::Handoff(args) => commands::handoff::execute(args, config, cli.json).await,
        Commands::Schedule(args) => commands::schedule::execute(args, config, cli.json).await,
        Commands::Responsibility(args) => {
            commands::responsibility::execute(args, config, cli.json).await
        }
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}

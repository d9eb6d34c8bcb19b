//! xaas-admin
//!
//! Runs the admin site and its maintenance commands.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use xaas_cli::cli::{Args, Command};
use xaas_cli::{commands, config_handlers};
use xaas_core::{ConfigManager, Settings};

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.as_deref();

    match args.command {
        Command::Config { action } => {
            init_tracing("warn");
            config_handlers::handle_config_command(config_path, action)?;
        }
        command => {
            let settings = Settings::load(config_path)?;
            init_tracing(&settings.log_level);
            run(command, settings).await?;
        }
    }
    Ok(())
}

async fn run(command: Command, mut settings: Settings) -> Result<()> {
    match command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            commands::serve(settings).await?;
        }
        Command::Migrate => commands::migrate(&settings).await?,
        Command::Check => {
            if commands::check(&settings) > 0 {
                std::process::exit(1);
            }
        }
        Command::Config { .. } => {}
    }
    Ok(())
}

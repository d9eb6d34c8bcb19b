//! xaas-deploy
//!
//! Runs deploy tasks left to right: `xaas-deploy prod deploy`.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use xaas_deploy::{DeployConfig, Deployer, SystemShell, Task};

/// Deploy xaas-admin or clone its production environment.
#[derive(Parser, Debug)]
#[command(name = "xaas-deploy", version, about)]
struct Args {
    /// Deploy configuration file (default: ./deploy.toml if present).
    #[arg(short, long, env = "XAAS_DEPLOY_CONFIG")]
    config: Option<PathBuf>,

    /// Tasks to run, in order.
    #[arg(value_enum, required = true)]
    tasks: Vec<Task>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = DeployConfig::load(args.config.as_deref())?;
    let mut deployer = Deployer::new(config, SystemShell);
    deployer.run_tasks(&args.tasks)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", format!("{err:#}").red());
            ExitCode::FAILURE
        }
    }
}

//! Command-line arguments.

use clap::{Parser, Subcommand};

/// xaas-admin: quota, faculty and service catalog administration
#[derive(Parser, Debug)]
#[command(name = "xaas-admin", version)]
#[command(about = "Administration site for the XaaS self-service platform", long_about = None)]
pub struct Args {
    /// Settings file merged over the environment defaults
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the admin site
    Serve {
        /// Override the listening port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create missing database tables
    Migrate,
    /// Report settings problems for the active environment
    Check,
    /// Inspect and edit the settings file
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the resolved settings file path
    Path,
    /// Print a value by dotted key, e.g. `server.port`
    Get {
        /// Dotted key
        key: String,
    },
    /// Set a value by dotted key in the settings file
    Set {
        /// Dotted key
        key: String,
        /// New value (bool, integer, float or string)
        value: String,
    },
    /// Write a settings file with the defaults
    Init {
        /// Target file instead of the default location
        #[arg(short, long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the settings as environment variables
    Export {
        /// Format as `--env KEY=VALUE` for `docker run`
        #[arg(long)]
        docker_env: bool,
    },
}

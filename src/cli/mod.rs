//! Command-line interface for the updater.
//!
//! # Commands
//!
//! - `check` - Compare the newest published release with the running version
//! - `apply` - Back up the application, pull the latest release, roll back on failure
//! - `auto` - Turn scheduled update notifications on or off
//! - `status` - Show version, persisted state and the selected mirror
//! - `mirrors` - Probe every mirror and print its latency
//! - `run` - Run the background scheduler and accept operator commands on stdin
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - Debug logging
//! - `--quiet` / `-q` - Errors only
//! - `--config` / `-c` - Configuration file (also `CHATBOT_UPDATER_CONFIG`)
//!
//! `RUST_LOG` overrides both logging flags.

mod apply;
mod auto;
mod check;
pub mod common;
mod mirrors;
mod run;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::CONFIG_ENV;

/// Settings shared by every command, derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub config_path: Option<PathBuf>,
}

#[derive(Parser)]
#[command(
    name = "chatbot-updater",
    about = "Keep a git-deployed chat bot up to date from the fastest mirror",
    version,
    long_about = "Checks the bot's mirrors for newer release tags, notifies the operator, \
                  and applies updates with a backup and automatic rollback."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a newer release is published
    Check(check::CheckCommand),
    /// Install the latest release
    Apply(apply::ApplyCommand),
    /// Enable or disable scheduled update notifications
    Auto(auto::AutoCommand),
    /// Show the updater's current state
    Status(status::StatusCommand),
    /// Probe every configured mirror
    Mirrors(mirrors::MirrorsCommand),
    /// Run the update scheduler in the foreground
    Run(run::RunCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(&config);
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };
        CliConfig {
            log_level: log_level.to_string(),
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Apply(cmd) => cmd.execute(&config).await,
            Commands::Auto(cmd) => cmd.execute(&config).await,
            Commands::Status(cmd) => cmd.execute(&config).await,
            Commands::Mirrors(cmd) => cmd.execute(&config).await,
            Commands::Run(cmd) => cmd.execute(&config).await,
        }
    }
}

/// Install the stderr tracing subscriber. `RUST_LOG` wins over the flags.
fn init_logging(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

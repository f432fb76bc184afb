//! chatbot-updater CLI entry point
//!
//! Parses arguments, runs the command, and prints failures with suggestions:
//! - `check` - Look for a newer release on the fastest mirror
//! - `apply` - Install it with backup and rollback
//! - `auto` - Toggle scheduled notifications
//! - `status` - Show version, state and mirrors
//! - `mirrors` - Probe every mirror
//! - `run` - Foreground scheduler with operator commands on stdin

use anyhow::Result;
use chatbot_updater::cli;
use chatbot_updater::core::error::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::cli::CliConfig;
use crate::cli::common::{build_service, load_config};
use crate::service::OperatorCommand;
use crate::upgrade::UpdateScheduler;

/// Run the scheduler in the foreground.
///
/// Each line on stdin is handled as an operator command and the replies are
/// delivered through the configured notifier. Stops on end of input or Ctrl-C.
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Do not read operator commands from stdin
    #[arg(long)]
    no_stdin: bool,
}

impl RunCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = load_config(cli).await?;
        let service = build_service(&config).await?;

        let scheduler =
            UpdateScheduler::new(Arc::clone(&service), service.state(), config.schedule.clone());
        let handle = scheduler.spawn();
        info!(
            "Scheduler started: checks every {}s, wakes every {}s",
            config.schedule.check_interval_secs, config.schedule.wake_interval_secs
        );

        if !self.no_stdin {
            let commands: Vec<&str> = OperatorCommand::ALL.iter().map(|c| c.as_str()).collect();
            println!("Commands: {}", commands.join(", ").bold());
        }

        let result = tokio::select! {
            result = read_commands(&service), if !self.no_stdin => result,
            signal = tokio::signal::ctrl_c() => signal.context("Failed to listen for Ctrl-C"),
        };

        handle.abort();
        info!("Scheduler stopped");
        result
    }
}

async fn read_commands(service: &crate::service::GitUpdateService) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        // Rejections are already answered through the notifier
        if let Err(e) = service.respond(&line).await {
            warn!("Rejected command {:?}: {}", line.trim(), e);
        }
    }
    Ok(())
}

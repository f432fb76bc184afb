use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::cli::CliConfig;
use crate::cli::common::{build_service, load_config};
use crate::version::UpdateReport;

/// Compare the newest release on the fastest mirror with the running version.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl CheckCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = load_config(cli).await?;
        let service = build_service(&config).await?;

        if !self.json {
            println!("{}", "Checking for updates...".cyan());
        }
        let report = service.check_for_update().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

pub(crate) fn print_report(report: &UpdateReport) {
    if report.needs_update {
        println!(
            "New version available: {} -> {}",
            report.current_version.to_string().yellow(),
            report.latest_version.to_string().green()
        );
        println!("Run {} to install it.", "chatbot-updater apply --yes".bold());
    } else {
        println!(
            "{} ({})",
            "Already on the latest version".green(),
            report.current_version
        );
    }
}

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use crate::cli::CliConfig;
use crate::cli::check::print_report;
use crate::cli::common::{build_service, load_config};
use crate::upgrade::ApplyStatus;

/// Back up the application, pull the latest release and roll back on failure.
#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// Apply without asking; otherwise only report what would be installed
    #[arg(short, long)]
    yes: bool,
}

impl ApplyCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = load_config(cli).await?;
        let service = build_service(&config).await?;

        if !self.yes {
            let report = service.check_for_update().await?;
            print_report(&report);
            if report.needs_update {
                println!("Re-run with {} to apply the update.", "--yes".bold());
            }
            return Ok(());
        }

        println!("{}", "Updating...".cyan());
        let outcome = service.apply_update().await?;
        match outcome.status {
            ApplyStatus::Committed => println!("{}", outcome.message.green()),
            ApplyStatus::RolledBack | ApplyStatus::FailedWithoutBackup => {
                eprintln!("{}", outcome.message.yellow());
            }
            ApplyStatus::RollbackFailed => eprintln!("{}", outcome.message.red().bold()),
        }

        if let Some(path) = &outcome.backup_path
            && outcome.status == ApplyStatus::RollbackFailed
        {
            eprintln!("Backup kept at {}", path.display());
        }

        if !outcome.success {
            bail!("Update was not applied");
        }
        Ok(())
    }
}

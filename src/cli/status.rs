use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Args;
use colored::Colorize;

use crate::cli::CliConfig;
use crate::cli::common::{build_service, load_config};

/// Show the running version, persisted state and mirror configuration.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Also race the mirrors and show which one would be used
    #[arg(long)]
    probe: bool,
}

impl StatusCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = load_config(cli).await?;
        let service = build_service(&config).await?;
        let state = service.state().snapshot().await;

        println!("{}", "Updater status".bold());
        println!("  Current version:  {}", service.resolver().current_version().to_string().cyan());
        println!("  Application:      {}", config.app_dir()?.display());
        println!("  State file:       {}", service.state().path().display());
        println!(
            "  Auto update:      {}",
            if state.auto_update_enabled { "enabled".green() } else { "disabled".yellow() }
        );
        println!("  Last check:       {}", format_check_time(state.last_check_time));
        println!(
            "  Check interval:   {}h",
            config.schedule.check_interval_secs / 3600
        );

        let registry = service.selector().registry();
        println!("\n{}", "Mirrors".bold());
        for mirror in registry.mirrors() {
            println!("  {:<10} {}", mirror.name, mirror.url.bright_black());
        }
        let fallback: Vec<&str> = registry.fallback_mirrors().map(|m| m.name.as_str()).collect();
        println!("  Fallback order: {}", fallback.join(" -> "));

        if self.probe {
            let mirror = service.selector().select().await;
            let latency = service
                .selector()
                .cached()
                .and_then(|selected| selected.latency)
                .map_or_else(|| "no response".to_string(), |d| format!("{}ms", d.as_millis()));
            println!("  Selected: {} ({})", mirror.name.green(), latency);
        }
        Ok(())
    }
}

fn format_check_time(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "never".to_string();
    }
    DateTime::from_timestamp(timestamp, 0).map_or_else(
        || timestamp.to_string(),
        |utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::cli::CliConfig;
use crate::cli::common::{build_service, load_config};

/// Probe every configured mirror once and print the results.
#[derive(Args, Debug)]
pub struct MirrorsCommand {}

impl MirrorsCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = load_config(cli).await?;
        let service = build_service(&config).await?;

        println!("{}", "Probing mirrors...".cyan());
        let results = service.selector().probe_all().await;

        println!("\n{:<12} {:<14} {}", "Mirror".bold(), "Latency".bold(), "URL".bold());
        println!("{}", "─".repeat(72));
        for result in &results {
            let latency = match result.latency {
                Some(latency) if result.succeeded => {
                    format!("{}ms", latency.as_millis()).green()
                }
                _ => "unreachable".red(),
            };
            println!(
                "{:<12} {:<14} {}",
                result.mirror.name,
                latency,
                result.mirror.url.bright_black()
            );
        }

        let reachable = results.iter().filter(|r| r.succeeded).count();
        println!("\n{} of {} mirrors reachable", reachable, results.len());
        Ok(())
    }
}

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;

use crate::cli::CliConfig;
use crate::cli::common::load_config;
use crate::upgrade::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    Enable,
    Disable,
}

/// Turn scheduled update notifications on or off.
///
/// Only touches the persisted state file, so it works without `git` or
/// network access.
#[derive(Args, Debug)]
pub struct AutoCommand {
    #[arg(value_enum)]
    toggle: Toggle,
}

impl AutoCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = load_config(cli).await?;
        let store = StateStore::open(config.state_file()?).await;

        let enabled = self.toggle == Toggle::Enable;
        let state = store.set_auto_update(enabled).await;
        if state.auto_update_enabled {
            println!("{}", "Automatic update checks enabled.".green());
        } else {
            println!("{}", "Automatic update checks disabled.".yellow());
        }
        println!("State file: {}", store.path().display());
        Ok(())
    }
}

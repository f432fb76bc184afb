//! Shared setup for commands that talk to mirrors.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::cli::CliConfig;
use crate::config::UpdaterConfig;
use crate::git::GitCli;
use crate::notify::AnyNotifier;
use crate::service::GitUpdateService;
use crate::utils::platform::ensure_git_available;

/// Load the configuration named by the global `--config` flag.
pub async fn load_config(cli: &CliConfig) -> Result<UpdaterConfig> {
    let config = UpdaterConfig::load(cli.config_path.clone()).await?;
    debug!("Using application directory {}", config.app_dir);
    Ok(config)
}

/// Build the update service on top of the `git` command line.
///
/// # Errors
///
/// Fails when `git` is not installed or the configuration is invalid.
pub async fn build_service(config: &UpdaterConfig) -> Result<Arc<GitUpdateService>> {
    ensure_git_available()?;
    let notifier =
        AnyNotifier::from_endpoint(config.notify.endpoint.as_deref(), &config.notify.chat_type)?;
    let service = GitUpdateService::from_config(config, Arc::new(GitCli::new()), notifier).await?;
    Ok(Arc::new(service))
}

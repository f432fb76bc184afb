//! Updater configuration.
//!
//! Configuration is a single TOML file. Every field has a default, so a
//! missing file (at the default location) is a valid configuration.
//!
//! # Location
//!
//! 1. `--config <path>` on the command line
//! 2. the `CHATBOT_UPDATER_CONFIG` environment variable
//! 3. `<config dir>/chatbot-updater/config.toml` (e.g. `~/.config` on Linux)
//!
//! A path given explicitly (1 or 2) must exist.
//!
//! # Example
//!
//! ```toml
//! app_dir = "~/GracyBot"
//! operator = "10001"
//! exclude = [".git", "__pycache__", "*.pyc", ".updater", "logs"]
//! fallback_order = ["Gitee", "GitHub"]
//!
//! [[mirrors]]
//! name = "GitHub"
//! url = "https://github.com/MiniYv/GracyBot.git"
//!
//! [[mirrors]]
//! name = "Gitee"
//! url = "https://gitee.com/MiniYv/GracyBot.git"
//!
//! [schedule]
//! check_interval_secs = 28800
//!
//! [notify]
//! endpoint = "http://127.0.0.1:3000/send_msg"
//! ```
//!
//! Path fields accept `~` and `$VAR`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::DEFAULT_KEEP_BACKUPS;
use crate::core::UpdateError;
use crate::mirror::{GITEE_MIRROR_URL, GITHUB_MIRROR_URL, Mirror, MirrorRegistry};
use crate::upgrade::config::{RetryPolicy, ScheduleConfig, Timeouts};
use crate::utils::fs::ExcludeSet;
use crate::utils::platform::resolve_path;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CHATBOT_UPDATER_CONFIG";

/// Directory, relative to the application directory, holding updater state.
pub const STATE_DIR: &str = ".updater";

/// Where operator messages are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// HTTP endpoint accepting `{target, content, chat_type}`; console when unset.
    pub endpoint: Option<String>,
    pub chat_type: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            chat_type: "private".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Root of the application tree that gets updated.
    pub app_dir: String,
    /// Defaults to `<app_dir>/.updater/update_state.json`.
    pub state_file: Option<String>,
    /// Defaults to the system temporary directory.
    pub backup_dir: Option<String>,
    pub keep_backups: usize,
    /// Identity notified about new versions; empty prints to the console.
    pub operator: String,
    /// Overrides build metadata and `git describe`.
    pub current_version: Option<String>,
    /// Glob patterns left out of backups and kept during restores.
    pub exclude: Vec<String>,
    pub mirrors: Vec<Mirror>,
    /// Mirror names for the serial fallback; defaults to reverse registry order.
    pub fallback_order: Option<Vec<String>>,
    pub schedule: ScheduleConfig,
    pub timeouts: Timeouts,
    pub retry: RetryPolicy,
    pub notify: NotifyConfig,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            app_dir: ".".to_string(),
            state_file: None,
            backup_dir: None,
            keep_backups: DEFAULT_KEEP_BACKUPS,
            operator: String::new(),
            current_version: None,
            exclude: vec![
                ".git".to_string(),
                "__pycache__".to_string(),
                "*.pyc".to_string(),
                STATE_DIR.to_string(),
            ],
            mirrors: vec![
                Mirror::new("GitHub", GITHUB_MIRROR_URL),
                Mirror::new("Gitee", GITEE_MIRROR_URL),
            ],
            fallback_order: None,
            schedule: ScheduleConfig::default(),
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl UpdaterConfig {
    /// Default configuration file location.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine the configuration directory"))?;
        Ok(dir.join("chatbot-updater").join("config.toml"))
    }

    /// Load and validate the configuration.
    ///
    /// `explicit` is the `--config` argument; see the module docs for the
    /// lookup order.
    pub async fn load(explicit: Option<PathBuf>) -> Result<Self> {
        let explicit = explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(UpdateError::ConfigError {
                        message: format!("configuration file {} does not exist", path.display()),
                    }
                    .into());
                }
                Self::load_from(&path).await?
            }
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path).await?
                } else {
                    debug!("No configuration at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without validating it.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Check cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigError`] for an empty or duplicated mirror
    /// list, an unknown fallback name, a race deadline shorter than the probe
    /// timeout, zero retry attempts, or an invalid exclude glob.
    pub fn validate(&self) -> Result<()> {
        self.registry()?;
        self.excludes()?;

        if self.timeouts.race_deadline_ms < self.timeouts.probe_ms {
            return Err(config_error(format!(
                "timeouts.race_deadline_ms ({}) must be at least timeouts.probe_ms ({})",
                self.timeouts.race_deadline_ms, self.timeouts.probe_ms
            )));
        }
        if self.retry.attempts == 0 {
            return Err(config_error("retry.attempts must be at least 1"));
        }
        if self.schedule.wake_interval_secs == 0 {
            return Err(config_error("schedule.wake_interval_secs must be greater than 0"));
        }
        Ok(())
    }

    /// Build the mirror registry, applying the fallback order.
    pub fn registry(&self) -> Result<MirrorRegistry> {
        let registry = MirrorRegistry::new(self.mirrors.clone())?;
        match &self.fallback_order {
            Some(names) => registry.with_fallback_order(names),
            None => {
                let reversed: Vec<&str> =
                    self.mirrors.iter().rev().map(|m| m.name.as_str()).collect();
                registry.with_fallback_order(&reversed)
            }
        }
    }

    pub fn excludes(&self) -> Result<ExcludeSet> {
        ExcludeSet::new(&self.exclude).map_err(|e| config_error(format!("{e:#}")))
    }

    pub fn app_dir(&self) -> Result<PathBuf> {
        resolve_path(&self.app_dir)
    }

    pub fn state_file(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => resolve_path(path),
            None => Ok(self.app_dir()?.join(STATE_DIR).join("update_state.json")),
        }
    }

    pub fn backup_dir(&self) -> Result<PathBuf> {
        match &self.backup_dir {
            Some(path) => resolve_path(path),
            None => Ok(std::env::temp_dir()),
        }
    }
}

fn config_error(message: impl Into<String>) -> anyhow::Error {
    UpdateError::ConfigError {
        message: message.into(),
    }
    .into()
}

//! Self-update subsystem for a git-deployed chat bot.
//!
//! The bot's source tree is a clone of a release repository published on
//! several mirrors. This crate keeps it current:
//!
//! - [`mirror`] picks the mirror to use: a fast path on the cached choice,
//!   then a concurrent race, then a serial fallback, then the default mirror
//! - [`version`] lists release tags and compares the newest with the running
//!   version
//! - [`upgrade`] applies an update (backup, `git pull`, rollback on failure),
//!   persists the auto-update state and runs the periodic check
//! - [`service`] wires it all into one object that answers operator commands
//!   and [`notify`] delivers the replies
//!
//! # Example
//!
//! ```no_run
//! use chatbot_updater::config::UpdaterConfig;
//! use chatbot_updater::git::GitCli;
//! use chatbot_updater::notify::AnyNotifier;
//! use chatbot_updater::service::{GitUpdateService, OperatorCommand};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::load(None).await?;
//! let notifier = AnyNotifier::from_endpoint(None, "private")?;
//! let service = GitUpdateService::from_config(&config, Arc::new(GitCli::new()), notifier).await?;
//!
//! for reply in service.handle(OperatorCommand::CheckForUpdate).await {
//!     println!("{reply}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

pub mod git;
pub mod mirror;
pub mod version;

pub mod notify;
pub mod service;
pub mod upgrade;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

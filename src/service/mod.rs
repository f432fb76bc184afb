//! The update service: one explicitly owned object wiring mirror selection,
//! version resolution, the executor, persisted state and notifications.
//!
//! Command handlers and the background scheduler share one
//! `Arc<UpdateService>`; there is no global state.
//!
//! # Operator commands
//!
//! | command               | effect                                        |
//! |-----------------------|-----------------------------------------------|
//! | `check-for-update`    | check now; offer the update when one exists   |
//! | `enable-auto-update`  | turn on notifications from the scheduler      |
//! | `disable-auto-update` | turn them off                                 |
//! | `confirm-update`      | apply the latest version                      |
//! | `cancel-update`       | drop the pending offer                        |
//!
//! Every command produces exactly one reply, except a check that finds a
//! newer version, which adds a second reply inviting `confirm-update`.

pub mod commands;

use anyhow::Result;
use chrono::Utc;
use std::sync::{Arc, PoisonError};
use tracing::{info, warn};

pub use commands::OperatorCommand;

use crate::config::UpdaterConfig;
use crate::core::{UpdateError, describe_network_failure};
use crate::git::{GitCli, RemoteTransport};
use crate::mirror::{Mirror, MirrorSelector};
use crate::notify::{AnyNotifier, Notifier};
use crate::upgrade::{
    ApplyOutcome, PersistedUpdateState, ScheduledCheck, StateStore, TickOutcome, UpdateExecutor,
};
use crate::version::{UpdateReport, VersionResolver, detect_current_version, embedded_version};

/// The service as deployed: real `git` and the configured notifier.
pub type GitUpdateService = UpdateService<GitCli, AnyNotifier>;

pub struct UpdateService<T, N> {
    selector: MirrorSelector<T>,
    resolver: VersionResolver<T>,
    executor: UpdateExecutor<T>,
    state: Arc<StateStore>,
    notifier: N,
    operator: String,
    pending: std::sync::Mutex<Option<UpdateReport>>,
}

impl<T: RemoteTransport, N: Notifier> UpdateService<T, N> {
    pub fn new(
        selector: MirrorSelector<T>,
        resolver: VersionResolver<T>,
        executor: UpdateExecutor<T>,
        state: Arc<StateStore>,
        notifier: N,
        operator: impl Into<String>,
    ) -> Self {
        Self {
            selector,
            resolver,
            executor,
            state,
            notifier,
            operator: operator.into(),
            pending: std::sync::Mutex::new(None),
        }
    }

    /// Build every component from configuration around one transport.
    pub async fn from_config(config: &UpdaterConfig, transport: Arc<T>, notifier: N) -> Result<Self> {
        let app_dir = config.app_dir()?;
        let explicit = config.current_version.as_deref().or(embedded_version());
        let current = detect_current_version(explicit, &app_dir).await;
        info!("Current version {}", current);

        let selector =
            MirrorSelector::new(Arc::clone(&transport), config.registry()?, config.timeouts.clone());
        let resolver = VersionResolver::new(
            Arc::clone(&transport),
            current,
            config.retry.clone(),
            config.timeouts.tag_fetch(),
        );
        let executor =
            UpdateExecutor::new(transport, &app_dir, config.backup_dir()?, config.excludes()?)
                .with_keep_backups(config.keep_backups)
                .with_pull_timeout(config.timeouts.pull());
        let state = Arc::new(StateStore::open(config.state_file()?).await);

        Ok(Self::new(selector, resolver, executor, state, notifier, config.operator.clone()))
    }

    pub const fn selector(&self) -> &MirrorSelector<T> {
        &self.selector
    }

    pub const fn resolver(&self) -> &VersionResolver<T> {
        &self.resolver
    }

    pub const fn executor(&self) -> &UpdateExecutor<T> {
        &self.executor
    }

    /// Shared handle to the persisted state, for the scheduler.
    pub fn state(&self) -> Arc<StateStore> {
        Arc::clone(&self.state)
    }

    /// The update last offered to the operator and not yet confirmed or
    /// cancelled.
    pub fn pending_offer(&self) -> Option<UpdateReport> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_pending(&self, offer: Option<UpdateReport>) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = offer;
    }

    /// Select a mirror and compare its newest release with the running version.
    ///
    /// The check time is persisted before anything else, so failed checks
    /// count too.
    pub async fn check_for_update(&self) -> Result<UpdateReport> {
        self.state.record_check(Utc::now().timestamp()).await;

        let mirror = self.selector.select().await;
        match self.resolver.resolve(&mirror.url).await {
            Ok(report) => Ok(report),
            Err(e) => {
                // The cached mirror just failed real work; race again next time
                self.selector.invalidate();
                Err(e)
            }
        }
    }

    /// Apply the latest version from the currently selected mirror.
    ///
    /// Reuses the cached mirror when there is one instead of probing again.
    /// Clears the pending offer once the apply ran, whatever its outcome.
    ///
    /// # Errors
    ///
    /// [`UpdateError::UpdateInProgress`] when another apply is running.
    pub async fn apply_update(&self) -> Result<ApplyOutcome> {
        if self.executor.is_busy() {
            return Err(UpdateError::UpdateInProgress.into());
        }

        let mirror: Mirror = match self.selector.cached() {
            Some(selected) => selected.mirror,
            None => self.selector.select().await,
        };

        let outcome = self.executor.apply(&mirror.url).await?;
        self.set_pending(None);
        if !outcome.success {
            self.selector.invalidate();
        }
        Ok(outcome)
    }

    pub async fn set_auto_update(&self, enabled: bool) -> PersistedUpdateState {
        info!("Automatic update checks {}", if enabled { "enabled" } else { "disabled" });
        self.state.set_auto_update(enabled).await
    }

    /// Run an operator command and return its replies.
    pub async fn handle(&self, command: OperatorCommand) -> Vec<String> {
        match command {
            OperatorCommand::CheckForUpdate => {
                info!("Checking for updates...");
                match self.check_for_update().await {
                    Err(e) => {
                        vec![format!("Update check failed ({}); please retry later.", check_failure(&e))]
                    }
                    Ok(report) if !report.needs_update => {
                        self.set_pending(None);
                        vec![format!("Already on the latest version ({}).", report.current_version)]
                    }
                    Ok(report) => {
                        let first = format!(
                            "New version available: current {}, latest {}.",
                            report.current_version, report.latest_version
                        );
                        self.set_pending(Some(report));
                        vec![
                            first,
                            format!(
                                "Reply {} to install it, or {} to skip.",
                                OperatorCommand::ConfirmUpdate,
                                OperatorCommand::CancelUpdate
                            ),
                        ]
                    }
                }
            }
            OperatorCommand::EnableAutoUpdate => {
                self.set_auto_update(true).await;
                vec!["Automatic update checks enabled.".to_string()]
            }
            OperatorCommand::DisableAutoUpdate => {
                self.set_auto_update(false).await;
                vec!["Automatic update checks disabled.".to_string()]
            }
            OperatorCommand::ConfirmUpdate => {
                info!("Updating...");
                match self.apply_update().await {
                    Ok(outcome) => vec![outcome.message],
                    Err(e) => match e.downcast_ref::<UpdateError>() {
                        Some(UpdateError::UpdateInProgress) => {
                            vec!["Update already in progress.".to_string()]
                        }
                        _ => vec![format!("Update failed: {e:#}")],
                    },
                }
            }
            OperatorCommand::CancelUpdate => {
                self.set_pending(None);
                vec!["Update cancelled.".to_string()]
            }
        }
    }

    /// Parse and run a raw command text.
    pub async fn handle_text(&self, text: &str) -> Result<Vec<String>, UpdateError> {
        let command: OperatorCommand = text.parse()?;
        Ok(self.handle(command).await)
    }

    /// Handle `text` and deliver every reply to the operator.
    ///
    /// Unrecognized text is answered with the closest known command before
    /// the error is returned.
    pub async fn respond(&self, text: &str) -> Result<(), UpdateError> {
        match self.handle_text(text).await {
            Ok(replies) => {
                for reply in replies {
                    self.notify_operator(&reply).await;
                }
                Ok(())
            }
            Err(e) => {
                if let UpdateError::UnknownCommand { input, suggestion } = &e {
                    self.notify_operator(&unknown_command_reply(input, suggestion.as_deref()))
                        .await;
                }
                Err(e)
            }
        }
    }

    /// Send `message` to the operator; delivery failures are only logged.
    pub async fn notify_operator(&self, message: &str) {
        if let Err(e) = self.notifier.send(&self.operator, message).await {
            warn!("Failed to notify operator: {:#}", e);
        }
    }
}

impl<T: RemoteTransport, N: Notifier> ScheduledCheck for UpdateService<T, N> {
    async fn scheduled_check(&self) -> TickOutcome {
        let report = match self.check_for_update().await {
            Ok(report) => report,
            Err(e) => {
                return TickOutcome::Failed {
                    reason: format!("{e:#}"),
                };
            }
        };
        if !report.needs_update {
            return TickOutcome::UpToDate;
        }

        let latest = report.latest_version.to_string();
        if !self.state.snapshot().await.auto_update_enabled {
            info!("Version {} is available; automatic notifications are off", latest);
            return TickOutcome::UpdateAvailable {
                latest,
            };
        }

        let message = format!(
            "New version available: current {}, latest {}.\nReply {} to install it.",
            report.current_version,
            report.latest_version,
            OperatorCommand::ConfirmUpdate
        );
        self.set_pending(Some(report));
        self.notify_operator(&message).await;
        TickOutcome::Notified {
            latest,
        }
    }
}

fn unknown_command_reply(input: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!("Unknown command '{input}'. Did you mean '{s}'?"),
        None => {
            let known: Vec<&str> = OperatorCommand::ALL.iter().map(|c| c.as_str()).collect();
            format!("Unknown command '{input}'. Available commands: {}", known.join(", "))
        }
    }
}

/// Categorized reason for a failed check, without raw tool dumps.
fn check_failure(error: &anyhow::Error) -> String {
    match error.downcast_ref::<UpdateError>() {
        Some(UpdateError::TagFetchFailure { reason, .. }) => describe_network_failure(reason),
        Some(other) => other.to_string(),
        None => describe_network_failure(&format!("{error:#}")),
    }
}

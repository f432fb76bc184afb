//! Backup, apply and rollback of an update.
//!
//! [`UpdateExecutor::apply`] walks a small state machine:
//!
//! ```text
//! Idle -> BackingUp -> Applying -> Committed   -> Idle
//!                               \-> RollingBack -> Idle
//! ```
//!
//! Only one apply runs at a time. A second caller is turned away with
//! [`UpdateError::UpdateInProgress`] instead of waiting. Once applying has
//! begun it runs to completion; there is no cancellation.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::constants::MAX_DIAGNOSTIC_CHARS;
use crate::core::{UpdateError, truncate_diagnostic};
use crate::git::RemoteTransport;
use crate::upgrade::backup::{BackupManager, prune_backups};
use crate::utils::fs::ExcludeSet;
use crate::version::resolver::failure_reason;

/// Where an apply currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    BackingUp,
    Applying,
    Committed,
    RollingBack,
}

/// How an apply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    /// Changes were pulled cleanly.
    Committed,
    /// The pull failed and the tree was restored from the backup.
    RolledBack,
    /// The pull failed and there was no backup to restore.
    FailedWithoutBackup,
    /// The pull failed and so did the restore. Needs manual repair.
    RollbackFailed,
}

/// Result of one apply attempt.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub success: bool,
    pub status: ApplyStatus,
    /// Operator-facing summary.
    pub message: String,
    pub backup_path: Option<PathBuf>,
    /// Set when the backup could not be taken and the apply went ahead anyway.
    pub backup_warning: Option<String>,
    pub error: Option<UpdateError>,
}

/// Applies updates to the application tree with a backup to fall back on.
pub struct UpdateExecutor<T> {
    transport: Arc<T>,
    app_dir: PathBuf,
    backup_root: PathBuf,
    excludes: ExcludeSet,
    keep_backups: usize,
    pull_timeout: Duration,
    restore_delay: Duration,
    lock: Mutex<()>,
    state: std::sync::Mutex<ExecutorState>,
}

/// Puts the executor back to `Idle` however the apply ends.
struct IdleOnDrop<'a>(&'a std::sync::Mutex<ExecutorState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = ExecutorState::Idle;
    }
}

impl<T: RemoteTransport> UpdateExecutor<T> {
    pub fn new(
        transport: Arc<T>,
        app_dir: impl Into<PathBuf>,
        backup_root: impl Into<PathBuf>,
        excludes: ExcludeSet,
    ) -> Self {
        Self {
            transport,
            app_dir: app_dir.into(),
            backup_root: backup_root.into(),
            excludes,
            keep_backups: crate::constants::DEFAULT_KEEP_BACKUPS,
            pull_timeout: crate::constants::GIT_PULL_TIMEOUT,
            restore_delay: Duration::from_secs(1),
            lock: Mutex::new(()),
            state: std::sync::Mutex::new(ExecutorState::Idle),
        }
    }

    #[must_use]
    pub const fn with_keep_backups(mut self, keep: usize) -> Self {
        self.keep_backups = keep;
        self
    }

    #[must_use]
    pub const fn with_pull_timeout(mut self, timeout: Duration) -> Self {
        self.pull_timeout = timeout;
        self
    }

    /// Delay between restore attempts during a rollback.
    #[must_use]
    pub const fn with_restore_delay(mut self, delay: Duration) -> Self {
        self.restore_delay = delay;
        self
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    pub fn state(&self) -> ExecutorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an apply currently holds the lock.
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    fn set_state(&self, state: ExecutorState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Back up the application tree, pull from `mirror_url`, and restore the
    /// backup if the pull fails.
    ///
    /// A failed backup does not stop the apply; the outcome then carries a
    /// `backup_warning`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::UpdateInProgress`] immediately when another
    /// apply holds the lock. Every other failure is reported through the
    /// returned [`ApplyOutcome`].
    pub async fn apply(&self, mirror_url: &str) -> Result<ApplyOutcome> {
        let Ok(_guard) = self.lock.try_lock() else {
            warn!("Rejected apply request: another update is running");
            return Err(UpdateError::UpdateInProgress.into());
        };
        let _idle = IdleOnDrop(&self.state);

        self.set_state(ExecutorState::BackingUp);
        let (backup, backup_warning) =
            match BackupManager::create(&self.app_dir, &self.backup_root, &self.excludes).await {
                Ok(backup) => (Some(backup.with_retry_delay(self.restore_delay)), None),
                Err(e) => {
                    let reason = truncate_diagnostic(&format!("{e:#}"), MAX_DIAGNOSTIC_CHARS);
                    warn!("Backup failed, applying without a restore point: {}", reason);
                    (None, Some(format!("Backup failed ({reason}); the update ran without a restore point.")))
                }
            };
        let backup_path = backup.as_ref().map(|b| b.path().to_path_buf());

        self.set_state(ExecutorState::Applying);
        info!("Pulling changes from {}", mirror_url);
        let pulled = self.transport.pull(&self.app_dir, mirror_url, self.pull_timeout).await;

        let outcome = match pulled {
            Ok(output) => {
                self.set_state(ExecutorState::Committed);
                if !output.summary.is_empty() {
                    info!("Pull finished: {}", output.summary);
                }
                self.prune_old_backups().await;
                ApplyOutcome {
                    success: true,
                    status: ApplyStatus::Committed,
                    message: "Update applied successfully; restart the bot to run the new version."
                        .to_string(),
                    backup_path,
                    backup_warning,
                    error: None,
                }
            }
            Err(e) => {
                let apply_reason =
                    truncate_diagnostic(&failure_reason(&e), MAX_DIAGNOSTIC_CHARS);
                error!("Update failed: {}", apply_reason);
                self.roll_back(backup.as_ref(), apply_reason, backup_path, backup_warning).await
            }
        };

        Ok(with_warning(outcome))
    }

    async fn roll_back(
        &self,
        backup: Option<&BackupManager>,
        apply_reason: String,
        backup_path: Option<PathBuf>,
        backup_warning: Option<String>,
    ) -> ApplyOutcome {
        let Some(backup) = backup else {
            return ApplyOutcome {
                success: false,
                status: ApplyStatus::FailedWithoutBackup,
                message: format!(
                    "Update failed: {apply_reason}. No backup was available, so nothing was restored."
                ),
                backup_path,
                backup_warning,
                error: Some(UpdateError::ApplyFailure {
                    reason: apply_reason,
                }),
            };
        };

        self.set_state(ExecutorState::RollingBack);
        match backup.restore().await {
            Ok(()) => ApplyOutcome {
                success: false,
                status: ApplyStatus::RolledBack,
                message: format!(
                    "Update failed: {apply_reason}. The previous version was restored."
                ),
                backup_path,
                backup_warning,
                error: Some(UpdateError::ApplyFailure {
                    reason: apply_reason,
                }),
            },
            Err(e) => {
                let restore_reason = truncate_diagnostic(&format!("{e:#}"), MAX_DIAGNOSTIC_CHARS);
                let message = format!(
                    "Update failed AND restore failed, manual intervention required.\n\
                    Update error: {apply_reason}\nRestore error: {restore_reason}"
                );
                error!("{}", message);
                let err = UpdateError::RollbackFailure {
                    apply_reason,
                    restore_reason,
                };
                ApplyOutcome {
                    success: false,
                    status: ApplyStatus::RollbackFailed,
                    message,
                    backup_path,
                    backup_warning,
                    error: Some(err),
                }
            }
        }
    }

    async fn prune_old_backups(&self) {
        let root = self.backup_root.clone();
        let app_dir = self.app_dir.clone();
        let keep = self.keep_backups;
        match tokio::task::spawn_blocking(move || prune_backups(&root, &app_dir, keep)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(n)) => info!("Pruned {} old backup(s)", n),
            Ok(Err(e)) => warn!("Failed to prune old backups: {:#}", e),
            Err(e) => warn!("Backup pruning task failed: {}", e),
        }
    }
}

fn with_warning(mut outcome: ApplyOutcome) -> ApplyOutcome {
    if let Some(warning) = &outcome.backup_warning {
        outcome.message = format!("{}\nWarning: {}", outcome.message, warning);
    }
    outcome
}

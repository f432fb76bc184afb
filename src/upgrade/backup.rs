//! Whole-tree backups of the application directory.
//!
//! A backup is a plain directory copy of the application tree, minus
//! excluded entries, taken right before an update is applied. Restoring it
//! deletes every non-excluded entry of the application directory and copies
//! the backup back. Excluded entries (always `.git`) are left alone both ways,
//! so repository metadata and the updater's own state survive a rollback.
//!
//! Backups are named `<app>_backup_<YYYYmmdd_HHMMSS>_<id>` and live under a
//! backup root that must not be inside the application tree unless it is
//! excluded. Old backups are pruned with [`prune_backups`].

use anyhow::{Context, Result, bail};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::RESTORE_ATTEMPTS;
use crate::utils::fs::{ExcludeSet, clear_tree, copy_tree, ensure_dir, remove_dir_all, tree_digest};

/// A completed backup of the application tree.
#[derive(Debug, Clone)]
pub struct BackupManager {
    app_dir: PathBuf,
    backup_path: PathBuf,
    digest: String,
    excludes: ExcludeSet,
    retry_delay: Duration,
}

impl BackupManager {
    /// Copy `app_dir` into a fresh directory under `backup_root`.
    ///
    /// The digest of the copy is recorded so a later restore can be verified.
    ///
    /// # Errors
    ///
    /// Fails when the application directory does not exist, when the backup
    /// root lies inside the application tree without being excluded, or when
    /// copying fails. A partially written backup is removed.
    pub async fn create(app_dir: &Path, backup_root: &Path, excludes: &ExcludeSet) -> Result<Self> {
        if !app_dir.is_dir() {
            bail!("Application directory does not exist: {}", app_dir.display());
        }
        if let Ok(relative) = backup_root.strip_prefix(app_dir)
            && !excludes.is_excluded(relative)
        {
            bail!(
                "Backup directory {} is inside the application directory and not excluded",
                backup_root.display()
            );
        }

        let backup_path = backup_root.join(backup_name(app_dir));
        info!("Creating backup at {}", backup_path.display());

        let src = app_dir.to_path_buf();
        let dst = backup_path.clone();
        let filter = excludes.clone();
        let copied = tokio::task::spawn_blocking(move || -> Result<(usize, String)> {
            ensure_dir(dst.parent().unwrap_or(&dst))?;
            let result = copy_tree(&src, &dst, &filter)
                .and_then(|copied| Ok((copied, tree_digest(&dst, &filter)?)));
            if result.is_err() {
                remove_dir_all(&dst).ok();
            }
            result
        })
        .await
        .context("Backup task panicked")?;

        let (files, digest) = copied.context("Failed to create backup")?;
        info!("Backup created ({} files)", files);
        debug!("Backup digest {}", digest);

        Ok(Self {
            app_dir: app_dir.to_path_buf(),
            backup_path,
            digest,
            excludes: excludes.clone(),
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Delay between restore attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Put the application tree back to the backed-up state.
    ///
    /// Tries up to [`RESTORE_ATTEMPTS`] times. An attempt only succeeds when
    /// the digest of the restored tree equals the digest recorded at backup
    /// time.
    pub async fn restore(&self) -> Result<()> {
        if !self.backup_path.is_dir() {
            bail!("No backup found at {}", self.backup_path.display());
        }

        warn!("Restoring {} from {}", self.app_dir.display(), self.backup_path.display());

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt_restore().await {
                Ok(()) => {
                    info!("Successfully restored from backup");
                    return Ok(());
                }
                Err(e) if attempts < RESTORE_ATTEMPTS => {
                    warn!("Restore attempt {} failed: {:#}. Retrying...", attempts, e);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    return Err(e.context(format!(
                        "Failed to restore backup after {RESTORE_ATTEMPTS} attempts"
                    )));
                }
            }
        }
    }

    async fn attempt_restore(&self) -> Result<()> {
        let app_dir = self.app_dir.clone();
        let backup = self.backup_path.clone();
        let excludes = self.excludes.clone();
        let expected = self.digest.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            ensure_dir(&app_dir)?;
            clear_tree(&app_dir, &excludes)?;
            copy_tree(&backup, &app_dir, &excludes)?;

            let actual = tree_digest(&app_dir, &excludes)?;
            if actual != expected {
                bail!("Restored tree does not match the backup (digest {actual}, expected {expected})");
            }
            Ok(())
        })
        .await
        .context("Restore task panicked")?
    }

    /// Delete this backup.
    pub async fn cleanup(&self) -> Result<()> {
        if self.backup_path.exists() {
            debug!("Cleaning up backup at {}", self.backup_path.display());
            tokio::fs::remove_dir_all(&self.backup_path).await.context("Failed to remove backup")?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.backup_path
    }

    /// Hex SHA-256 of the backed-up tree.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

fn app_name(app_dir: &Path) -> String {
    app_dir
        .file_name()
        .map_or_else(|| "app".to_string(), |n| n.to_string_lossy().into_owned())
}

fn backup_prefix(app_dir: &Path) -> String {
    format!("{}_backup_", app_name(app_dir))
}

fn backup_name(app_dir: &Path) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}_{}", backup_prefix(app_dir), Local::now().format("%Y%m%d_%H%M%S"), &id[..8])
}

/// Delete all but the newest `keep` backups of `app_dir` under `backup_root`.
///
/// Returns the number of backups removed. A missing backup root counts as
/// nothing to prune.
pub fn prune_backups(backup_root: &Path, app_dir: &Path, keep: usize) -> Result<usize> {
    if !backup_root.is_dir() {
        return Ok(0);
    }

    let prefix = backup_prefix(app_dir);
    let mut backups: Vec<(std::time::SystemTime, PathBuf)> = fs::read_dir(backup_root)
        .with_context(|| format!("Failed to read backup directory {}", backup_root.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect();

    // Newest first; the name embeds the timestamp and breaks ties
    backups.sort_by(|a, b| b.cmp(a));

    let mut removed = 0;
    for (_, path) in backups.into_iter().skip(keep) {
        match remove_dir_all(&path) {
            Ok(()) => {
                debug!("Pruned old backup {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to prune backup {}: {:#}", path.display(), e),
        }
    }
    Ok(removed)
}

//! Persisted auto-update toggle and last check time.
//!
//! The record is small and always rewritten whole through an atomic
//! write-then-rename, so a crash never leaves a half-written file. Writes are
//! serialized by the store's lock.
//!
//! Persistence is best-effort: a failed write is logged as
//! [`UpdateError::ConfigPersistFailure`] and the in-memory value still
//! changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::core::UpdateError;
use crate::utils::fs::atomic_write;

/// On-disk state of the updater.
///
/// ```json
/// { "auto_update_enabled": false, "last_check_time": 1718000000 }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedUpdateState {
    #[serde(default)]
    pub auto_update_enabled: bool,
    /// Seconds since the Unix epoch; 0 means never checked.
    #[serde(default)]
    pub last_check_time: i64,
}

impl PersistedUpdateState {
    /// Whether at least `interval_secs` have passed since the last check.
    pub fn is_due(&self, now: i64, interval_secs: u64) -> bool {
        let interval = i64::try_from(interval_secs).unwrap_or(i64::MAX);
        now.saturating_sub(self.last_check_time) >= interval
    }

    /// Seconds until the next check is due; 0 when it already is.
    pub fn seconds_until_due(&self, now: i64, interval_secs: u64) -> i64 {
        let interval = i64::try_from(interval_secs).unwrap_or(i64::MAX);
        self.last_check_time.saturating_add(interval).saturating_sub(now).max(0)
    }
}

/// Owner of the state file and its in-memory copy.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: Mutex<PersistedUpdateState>,
}

impl StateStore {
    /// Load the state at `path`.
    ///
    /// A missing or unreadable file yields the default state; the file is
    /// created on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match load(&path).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!("No update state at {}, using defaults", path.display());
                PersistedUpdateState::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable update state: {:#}", e);
                PersistedUpdateState::default()
            }
        };
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> PersistedUpdateState {
        *self.state.lock().await
    }

    /// Turn unattended update notifications on or off.
    pub async fn set_auto_update(&self, enabled: bool) -> PersistedUpdateState {
        self.update(|s| s.auto_update_enabled = enabled).await
    }

    /// Record that a check started at `now` (epoch seconds).
    pub async fn record_check(&self, now: i64) -> PersistedUpdateState {
        self.update(|s| s.last_check_time = now).await
    }

    async fn update(&self, change: impl FnOnce(&mut PersistedUpdateState)) -> PersistedUpdateState {
        let mut guard = self.state.lock().await;
        change(&mut *guard);
        let state = *guard;
        if let Err(e) = self.persist(&state).await {
            let err = UpdateError::ConfigPersistFailure {
                path: self.path.display().to_string(),
                reason: format!("{e:#}"),
            };
            error!("{}: {:#}", err, e);
        }
        state
    }

    async fn persist(&self, state: &PersistedUpdateState) -> Result<()> {
        let content =
            serde_json::to_vec_pretty(state).context("Failed to serialize update state")?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&path, &content))
            .await
            .context("State write task panicked")?
    }
}

async fn load(path: &Path) -> Result<Option<PersistedUpdateState>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let state = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(state))
}

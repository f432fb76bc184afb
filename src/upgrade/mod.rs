//! Applying updates and scheduling checks.
//!
//! - [`backup`]: whole-tree backups taken before an apply, restored on failure
//! - [`executor`]: the backup/apply/rollback state machine behind a
//!   single-apply lock
//! - [`state`]: the persisted auto-update toggle and last check time
//! - [`scheduler`]: the background task that checks for new versions
//! - [`config`]: timeout, retry and schedule settings
//!
//! # Safety
//!
//! An apply always starts with a backup of the application tree. When the
//! pull fails the tree is cleared (except `.git` and other excluded entries)
//! and the backup copied back; the restored tree is verified against the
//! digest recorded at backup time. A failed backup is only a warning: the
//! operator explicitly asked for the update, so it still goes ahead.

pub mod backup;
pub mod config;
pub mod executor;
pub mod scheduler;
pub mod state;

pub use backup::{BackupManager, prune_backups};
pub use config::{RetryPolicy, ScheduleConfig, Timeouts};
pub use executor::{ApplyOutcome, ApplyStatus, ExecutorState, UpdateExecutor};
pub use scheduler::{ScheduledCheck, TickOutcome, UpdateScheduler};
pub use state::{PersistedUpdateState, StateStore};

//! Global constants used throughout the updater.
//!
//! This module contains timeout durations, retry parameters, and other
//! numeric constants that are used across multiple modules. Configuration
//! defaults in [`crate::upgrade::config`] are derived from these values.

use std::time::Duration;

/// Timeout for the fast-path re-probe of the cached mirror (500ms).
///
/// Only the previously selected mirror is contacted, so this stays well
/// below a second.
pub const FAST_PATH_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Timeout for a single probe during a race (2 seconds).
pub const RACE_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Deadline for collecting race results (2.5 seconds).
///
/// Slightly larger than [`RACE_PROBE_TIMEOUT`] so that a probe finishing
/// right at its own timeout is still observed.
pub const RACE_DEADLINE: Duration = Duration::from_millis(2500);

/// Timeout for each serial fallback probe (1 second).
pub const FALLBACK_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Timeout for one foreground tag listing attempt (30 seconds).
pub const TAG_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for pulling changes into the working tree (120 seconds).
pub const GIT_PULL_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for local-only git commands such as `describe` and `init` (10 seconds).
pub const GIT_LOCAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for one message delivered to the operator endpoint (10 seconds).
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Number of tag listing attempts before a check is reported as failed.
pub const TAG_FETCH_ATTEMPTS: u32 = 2;

/// Base delay for linear retry backoff (5 seconds).
///
/// Attempt `n` waits `n * base` before the next one.
pub const RETRY_BACKOFF_BASE: Duration = Duration::from_secs(5);

/// Minimum time between two scheduled update checks (8 hours).
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 8 * 60 * 60;

/// How often the scheduler wakes to see whether a check is due (1 hour).
pub const DEFAULT_WAKE_INTERVAL_SECS: u64 = 60 * 60;

/// Number of restore attempts made by [`crate::upgrade::BackupManager::restore`].
pub const RESTORE_ATTEMPTS: u32 = 3;

/// Maximum number of characters of tool output shown to the operator.
pub const MAX_DIAGNOSTIC_CHARS: usize = 400;

/// Number of snapshots retained per application after successful updates.
pub const DEFAULT_KEEP_BACKUPS: usize = 3;

/// Version assumed when neither build metadata nor git can provide one.
pub const FALLBACK_VERSION: &str = "1.0.0";

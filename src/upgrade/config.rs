use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_WAKE_INTERVAL_SECS, FALLBACK_PROBE_TIMEOUT,
    FAST_PATH_PROBE_TIMEOUT, GIT_PULL_TIMEOUT, RACE_DEADLINE, RACE_PROBE_TIMEOUT,
    RETRY_BACKOFF_BASE, TAG_FETCH_ATTEMPTS, TAG_FETCH_TIMEOUT,
};

/// Timeouts for every network operation the updater performs.
///
/// Probe timeouts are short because they only decide which mirror to use.
/// Tag fetching and pulling are deliberate foreground operations and get
/// generous limits.
///
/// ## TOML Example
/// ```toml
/// [timeouts]
/// fast_path_ms = 500
/// probe_ms = 2000
/// race_deadline_ms = 2500
/// fallback_ms = 1000
/// tag_fetch_secs = 30
/// pull_secs = 120
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Re-probe of the cached mirror before reusing it.
    pub fast_path_ms: u64,
    /// Per-mirror probe during a race.
    pub probe_ms: u64,
    /// Deadline for collecting race results; must be at least `probe_ms`.
    pub race_deadline_ms: u64,
    /// Per-mirror probe during the serial fallback.
    pub fallback_ms: u64,
    /// One tag listing attempt.
    pub tag_fetch_secs: u64,
    /// One pull into the working tree.
    pub pull_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            fast_path_ms: FAST_PATH_PROBE_TIMEOUT.as_millis() as u64,
            probe_ms: RACE_PROBE_TIMEOUT.as_millis() as u64,
            race_deadline_ms: RACE_DEADLINE.as_millis() as u64,
            fallback_ms: FALLBACK_PROBE_TIMEOUT.as_millis() as u64,
            tag_fetch_secs: TAG_FETCH_TIMEOUT.as_secs(),
            pull_secs: GIT_PULL_TIMEOUT.as_secs(),
        }
    }
}

impl Timeouts {
    pub const fn fast_path(&self) -> Duration {
        Duration::from_millis(self.fast_path_ms)
    }

    pub const fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub const fn race_deadline(&self) -> Duration {
        Duration::from_millis(self.race_deadline_ms)
    }

    pub const fn fallback(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }

    pub const fn tag_fetch(&self) -> Duration {
        Duration::from_secs(self.tag_fetch_secs)
    }

    pub const fn pull(&self) -> Duration {
        Duration::from_secs(self.pull_secs)
    }
}

/// Bounded retry with linear backoff for foreground network operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    /// Attempt `n` is followed by a `n * backoff_ms` pause.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: TAG_FETCH_ATTEMPTS,
            backoff_ms: RETRY_BACKOFF_BASE.as_millis() as u64,
        }
    }
}

impl RetryPolicy {
    pub const fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Number of retries after the first attempt.
    pub const fn retries(&self) -> usize {
        self.attempts.saturating_sub(1) as usize
    }
}

/// When the background scheduler checks for updates.
///
/// The scheduler wakes every `wake_interval_secs` and runs a check only when
/// at least `check_interval_secs` have passed since the last one, so a
/// restart does not trigger an immediate re-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub check_interval_secs: u64,
    pub wake_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            wake_interval_secs: DEFAULT_WAKE_INTERVAL_SECS,
        }
    }
}

impl ScheduleConfig {
    pub const fn wake_interval(&self) -> Duration {
        Duration::from_secs(self.wake_interval_secs)
    }
}

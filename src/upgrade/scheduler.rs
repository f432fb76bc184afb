//! Background update checks.
//!
//! The scheduler wakes every `wake_interval_secs` and runs a check when at
//! least `check_interval_secs` passed since the persisted `last_check_time`.
//! Because the decision is based on the persisted time, restarting the
//! process does not cause an extra check. The scheduler never applies an
//! update; that always takes an operator confirmation.

use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::upgrade::config::ScheduleConfig;
use crate::upgrade::state::StateStore;

/// What one scheduler wake-up did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The check interval has not elapsed yet.
    NotDue,
    UpToDate,
    /// A newer version exists and the operator was told.
    Notified { latest: String },
    /// A newer version exists but automatic notifications are off.
    UpdateAvailable { latest: String },
    /// The check failed; it is retried after the next interval.
    Failed { reason: String },
}

/// One unattended update check, including any notification it triggers.
///
/// Implementations must persist `last_check_time` whether or not the check
/// succeeds.
pub trait ScheduledCheck: Send + Sync {
    fn scheduled_check(&self) -> impl Future<Output = TickOutcome> + Send;
}

/// Periodically runs a [`ScheduledCheck`] when it is due.
pub struct UpdateScheduler<C> {
    check: Arc<C>,
    state: Arc<StateStore>,
    schedule: ScheduleConfig,
}

impl<C: ScheduledCheck + 'static> UpdateScheduler<C> {
    pub fn new(check: Arc<C>, state: Arc<StateStore>, schedule: ScheduleConfig) -> Self {
        Self {
            check,
            state,
            schedule,
        }
    }

    /// Run a check if one is due at `now` (epoch seconds).
    pub async fn tick(&self, now: i64) -> TickOutcome {
        let state = self.state.snapshot().await;
        if !state.is_due(now, self.schedule.check_interval_secs) {
            debug!(
                "Next update check in {}s",
                state.seconds_until_due(now, self.schedule.check_interval_secs)
            );
            return TickOutcome::NotDue;
        }

        let outcome = self.check.scheduled_check().await;
        match &outcome {
            TickOutcome::Failed { reason } => warn!("Scheduled update check failed: {}", reason),
            TickOutcome::Notified { latest } => info!("Operator notified about {}", latest),
            other => debug!("Scheduled update check: {:?}", other),
        }
        outcome
    }

    /// Tick forever. The first tick happens immediately.
    pub async fn run(self) {
        info!(
            "Update scheduler started (wake every {}s, check every {}s)",
            self.schedule.wake_interval_secs, self.schedule.check_interval_secs
        );
        let mut interval = tokio::time::interval(self.schedule.wake_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick(chrono::Utc::now().timestamp()).await;
        }
    }

    /// Run the scheduler on its own task. Abort the handle to stop it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

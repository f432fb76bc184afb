use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::git::RemoteTransport;
use crate::mirror::probe::{ProbeResult, probe, probe_all};
use crate::mirror::registry::{Mirror, MirrorRegistry};
use crate::upgrade::config::Timeouts;

/// The mirror chosen by the last selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedMirror {
    pub mirror: Mirror,
    pub probed_at: DateTime<Utc>,
    /// Latency of the probe that chose it; absent when it was picked as the
    /// default after every probe failed.
    pub latency: Option<Duration>,
}

/// Picks the mirror to talk to, preferring one that answers quickly.
///
/// Selection never fails: when no mirror answers, the first registered one is
/// returned and the real failure surfaces when tags are fetched or changes
/// pulled.
///
/// The cache is read without holding a lock across probes. Two concurrent
/// selections may both probe; the later write wins.
pub struct MirrorSelector<T> {
    transport: Arc<T>,
    registry: MirrorRegistry,
    timeouts: Timeouts,
    cache: RwLock<Option<SelectedMirror>>,
}

impl<T: RemoteTransport> MirrorSelector<T> {
    pub fn new(transport: Arc<T>, registry: MirrorRegistry, timeouts: Timeouts) -> Self {
        Self {
            transport,
            registry,
            timeouts,
            cache: RwLock::new(None),
        }
    }

    pub const fn registry(&self) -> &MirrorRegistry {
        &self.registry
    }

    /// Current cache entry, if any.
    pub fn cached(&self) -> Option<SelectedMirror> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forget the cached mirror so the next selection races again.
    pub fn invalidate(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn remember(&self, mirror: Mirror, latency: Option<Duration>) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(SelectedMirror {
            mirror,
            probed_at: Utc::now(),
            latency,
        });
    }

    /// Choose a mirror.
    ///
    /// 1. Re-probe the cached mirror with the fast-path timeout and reuse it
    ///    if it answers.
    /// 2. Otherwise race all mirrors; the first-listed mirror that succeeded
    ///    before the deadline wins.
    /// 3. Otherwise probe mirrors one by one in fallback order.
    /// 4. Otherwise use the first-listed mirror.
    pub async fn select(&self) -> Mirror {
        if let Some(cached) = self.cached() {
            let result = probe(&*self.transport, &cached.mirror, self.timeouts.fast_path()).await;
            if result.succeeded {
                info!(target: "mirror", "Using cached mirror {}", cached.mirror.name);
                self.remember(result.mirror.clone(), result.latency);
                return result.mirror;
            }
            warn!(target: "mirror", "Cached mirror {} failed the quick re-check, selecting again", cached.mirror.name);
            self.invalidate();
        }

        if let Some(winner) = self.race().await {
            info!(
                target: "mirror",
                "Selected {} ({}ms)",
                winner.mirror.name,
                winner.latency.unwrap_or_default().as_millis()
            );
            self.remember(winner.mirror.clone(), winner.latency);
            return winner.mirror;
        }

        warn!(target: "mirror", "No mirror answered during the race, retrying one by one");
        if let Some(result) = self.fallback().await {
            info!(target: "mirror", "Fallback selected {}", result.mirror.name);
            self.remember(result.mirror.clone(), result.latency);
            return result.mirror;
        }

        let default = self.registry.primary().clone();
        error!(target: "mirror", "All mirrors failed, defaulting to {}", default.name);
        self.remember(default.clone(), None);
        default
    }

    /// Probe all mirrors concurrently and pick the winner.
    ///
    /// Results are collected until every probe finished or the race deadline
    /// elapsed. Collection stops early once a mirror succeeded and every
    /// mirror listed before it has reported, since nothing can outrank it.
    /// Probes still running at that point are dropped.
    pub async fn race(&self) -> Option<ProbeResult> {
        let transport = &*self.transport;
        let per_probe = self.timeouts.probe();
        let mut slots: Vec<Option<ProbeResult>> = vec![None; self.registry.len()];

        let mut pending: FuturesUnordered<_> = self
            .registry
            .mirrors()
            .iter()
            .enumerate()
            .map(|(idx, mirror)| async move { (idx, probe(transport, mirror, per_probe).await) })
            .collect();

        let collect = async {
            while let Some((idx, result)) = pending.next().await {
                slots[idx] = Some(result);
                if decided(&slots) {
                    break;
                }
            }
        };

        if tokio::time::timeout(self.timeouts.race_deadline(), collect).await.is_err() {
            warn!(
                target: "mirror",
                "Race deadline of {}ms elapsed, abandoning unfinished probes",
                self.timeouts.race_deadline().as_millis()
            );
        }

        slots.into_iter().flatten().find(|r| r.succeeded)
    }

    async fn fallback(&self) -> Option<ProbeResult> {
        for mirror in self.registry.fallback_mirrors() {
            let result = probe(&*self.transport, mirror, self.timeouts.fallback()).await;
            if result.succeeded {
                return Some(result);
            }
        }
        None
    }

    /// Probe every mirror once with the race timeout, for diagnostics.
    ///
    /// Does not touch the cache.
    pub async fn probe_all(&self) -> Vec<ProbeResult> {
        probe_all(&*self.transport, self.registry.mirrors(), self.timeouts.probe()).await
    }
}

/// Whether the highest-ranked success is already known.
fn decided(slots: &[Option<ProbeResult>]) -> bool {
    for slot in slots {
        match slot {
            Some(r) if r.succeeded => return true,
            Some(_) => {}
            None => return false,
        }
    }
    false
}

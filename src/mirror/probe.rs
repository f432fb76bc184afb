use futures::future::join_all;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::core::UpdateError;
use crate::git::RemoteTransport;
use crate::mirror::registry::Mirror;
use crate::version::resolver::failure_reason;

/// Outcome of one reachability check.
///
/// A timeout and a refused connection look the same here: `succeeded` is
/// false and `latency` is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub mirror: Mirror,
    pub succeeded: bool,
    pub latency: Option<Duration>,
}

impl ProbeResult {
    fn failed(mirror: &Mirror) -> Self {
        Self {
            mirror: mirror.clone(),
            succeeded: false,
            latency: None,
        }
    }
}

/// List the mirror's tags without fetching content, bounded by `timeout`.
///
/// Never blocks past `timeout`, even if the transport ignores it.
pub async fn probe<T: RemoteTransport>(
    transport: &T,
    mirror: &Mirror,
    timeout: Duration,
) -> ProbeResult {
    let start = Instant::now();
    match tokio::time::timeout(timeout, transport.list_tags(&mirror.url, timeout)).await {
        Ok(Ok(_)) => {
            let latency = start.elapsed();
            debug!(target: "mirror", "{} answered in {}ms", mirror.name, latency.as_millis());
            ProbeResult {
                mirror: mirror.clone(),
                succeeded: true,
                latency: Some(latency),
            }
        }
        Ok(Err(e)) => {
            let reason = failure_reason(&e);
            let err = UpdateError::ProbeUnreachable {
                mirror: mirror.name.clone(),
                reason: reason.clone(),
            };
            warn!(target: "mirror", "{}: {}", err, reason);
            ProbeResult::failed(mirror)
        }
        Err(_) => {
            let err = UpdateError::ProbeTimeout {
                mirror: mirror.name.clone(),
            };
            warn!(target: "mirror", "{} ({}ms)", err, timeout.as_millis());
            ProbeResult::failed(mirror)
        }
    }
}

/// Probe every mirror concurrently; results keep the input order.
pub async fn probe_all<T: RemoteTransport>(
    transport: &T,
    mirrors: &[Mirror],
    timeout: Duration,
) -> Vec<ProbeResult> {
    join_all(mirrors.iter().map(|m| probe(transport, m, timeout))).await
}

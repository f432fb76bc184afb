use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::Retry;
use tracing::{debug, info, warn};

use crate::constants::{FALLBACK_VERSION, MAX_DIAGNOSTIC_CHARS};
use crate::core::{UpdateError, truncate_diagnostic};
use crate::git::{RemoteTransport, describe_latest_tag};
use crate::upgrade::config::RetryPolicy;
use crate::utils::backoff::linear_backoff;
use crate::version::tag::{VersionTag, latest_version};

/// Result of comparing the newest remote release against the running version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub current_version: VersionTag,
    pub latest_version: VersionTag,
    pub needs_update: bool,
}

impl UpdateReport {
    /// Build a report; `needs_update` is derived, never supplied.
    #[must_use]
    pub fn new(current_version: VersionTag, latest_version: VersionTag) -> Self {
        let needs_update = latest_version.is_newer_than(&current_version);
        Self {
            current_version,
            latest_version,
            needs_update,
        }
    }
}

/// Application version build metadata, set by the host build.
#[must_use]
pub const fn embedded_version() -> Option<&'static str> {
    option_env!("CHATBOT_APP_VERSION")
}

/// Determine the version the running application was built from.
///
/// Tries, in order: the explicit version (configuration override or build
/// metadata), the most recent tag reachable from `HEAD` in `app_dir`, and
/// finally [`FALLBACK_VERSION`].
pub async fn detect_current_version(explicit: Option<&str>, app_dir: &Path) -> VersionTag {
    if let Some(raw) = explicit {
        match VersionTag::parse(raw) {
            Some(version) => return version,
            None => warn!("Ignoring unparseable application version '{}'", raw),
        }
    }

    if let Some(tag) = describe_latest_tag(app_dir).await {
        if let Some(version) = VersionTag::parse(&tag) {
            debug!("Current version {} taken from git describe", version);
            return version;
        }
        debug!("Latest local tag '{}' is not a release version", tag);
    }

    warn!("Could not determine application version, assuming {}", FALLBACK_VERSION);
    VersionTag::parse(FALLBACK_VERSION).unwrap_or_else(|| VersionTag::from_parts(&[1, 0, 0]))
}

/// Fetches release tags from a mirror and compares them with the current version.
pub struct VersionResolver<T> {
    transport: Arc<T>,
    current: VersionTag,
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl<T: RemoteTransport> VersionResolver<T> {
    pub fn new(
        transport: Arc<T>,
        current: VersionTag,
        retry: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            current,
            retry,
            attempt_timeout,
        }
    }

    /// The version every report is compared against.
    pub const fn current_version(&self) -> &VersionTag {
        &self.current
    }

    /// Check `mirror_url` for a newer release.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::TagFetchFailure`] when every attempt to list
    /// tags failed, or when the mirror answered without any release tag.
    /// Both are transient: they never mean "there are no releases".
    pub async fn resolve(&self, mirror_url: &str) -> Result<UpdateReport> {
        let tags = self.fetch_tags(mirror_url).await?;

        let Some(latest) = latest_version(&tags) else {
            warn!("No release tags among {} tags at {}", tags.len(), mirror_url);
            return Err(UpdateError::TagFetchFailure {
                url: mirror_url.to_string(),
                reason: "no valid release tags in the remote tag list".to_string(),
            }
            .into());
        };

        let report = UpdateReport::new(self.current.clone(), latest);
        info!(
            "Version check: current {}, latest {}, update {}",
            report.current_version,
            report.latest_version,
            if report.needs_update { "available" } else { "not needed" }
        );
        Ok(report)
    }

    async fn fetch_tags(&self, url: &str) -> Result<Vec<String>> {
        let strategy = linear_backoff(self.retry.backoff_base()).take(self.retry.retries());
        let total = self.retry.attempts.max(1);
        let mut attempt = 0u32;

        Retry::start(strategy, || {
            attempt += 1;
            let n = attempt;
            async move {
                self.transport.list_tags(url, self.attempt_timeout).await.map_err(|e| {
                    let reason = failure_reason(&e);
                    warn!("Tag listing attempt {}/{} at {} failed: {}", n, total, url, reason);
                    reason
                })
            }
        })
        .await
        .map_err(|reason| {
            anyhow::Error::from(UpdateError::TagFetchFailure {
                url: url.to_string(),
                reason: truncate_diagnostic(&reason, MAX_DIAGNOSTIC_CHARS),
            })
        })
    }
}

/// Tool output carried by an error, or its message when there is none.
pub(crate) fn failure_reason(error: &anyhow::Error) -> String {
    error
        .downcast_ref::<UpdateError>()
        .and_then(UpdateError::diagnostic)
        .filter(|d| !d.trim().is_empty())
        .map_or_else(|| format!("{error:#}"), |d| d.trim().to_string())
}

//! Git access for the updater.
//!
//! The rest of the crate talks to mirrors through [`RemoteTransport`], which
//! exposes exactly two remote operations: listing tags and pulling the latest
//! changes into a working tree. [`GitCli`] implements it by shelling out to
//! the `git` executable through [`GitCommand`]; tests substitute a scripted
//! transport.
//!
//! # Remote query format
//!
//! `git ls-remote --tags` prints one reference per line:
//!
//! ```text
//! 3f2a...  refs/tags/v2.3.0
//! 9bc1...  refs/tags/v2.3.0^{}
//! ```
//!
//! [`parse_ls_remote_tags`] strips the `refs/tags/` prefix and the peeled
//! `^{}` suffix and removes duplicates, preserving first-seen order.

pub mod command_builder;

use anyhow::Result;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use command_builder::{GitCommand, GitCommandOutput};

use crate::constants::GIT_LOCAL_TIMEOUT;

/// Output of a successful pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOutput {
    /// Diagnostic text printed by the transport (e.g. the merge summary)
    pub summary: String,
}

/// The two remote operations the updater relies on.
///
/// Any version-control transport that can list tag names and pull into a
/// working tree can implement this trait.
pub trait RemoteTransport: Send + Sync {
    /// List tag names published at `url`.
    ///
    /// Must not run longer than `timeout`.
    fn list_tags(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Fetch and integrate the latest changes from `url` into `worktree`.
    ///
    /// Returns an error when the remote reports anything other than a clean,
    /// non-conflicting result.
    fn pull(
        &self,
        worktree: &Path,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<PullOutput>> + Send;
}

/// [`RemoteTransport`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    user_name: String,
    user_email: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            user_name: "chatbot-updater".to_string(),
            user_email: "updater@localhost".to_string(),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity written into repositories created by [`GitCli::ensure_repository`].
    pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.user_name = name.into();
        self.user_email = email.into();
        self
    }

    /// Make sure `worktree` is a git repository with an `origin` remote.
    ///
    /// Deployments copied without `.git` are turned into a repository pointing
    /// at `url`. An existing repository is left untouched. Failing to set the
    /// local identity is only a warning.
    pub async fn ensure_repository(&self, worktree: &Path, url: &str) -> Result<()> {
        if worktree.join(".git").is_dir() {
            debug!(target: "git", "Repository already present at {}", worktree.display());
            return Ok(());
        }

        info!("Initializing git repository in {}", worktree.display());
        GitCommand::init().current_dir(worktree).execute_success().await?;

        let has_origin = GitCommand::remote_url().current_dir(worktree).execute().await.is_ok();
        if !has_origin {
            GitCommand::add_remote(url).current_dir(worktree).execute_success().await?;
            info!("Added origin remote: {}", url);
        }

        for (key, value) in [("user.name", &self.user_name), ("user.email", &self.user_email)] {
            if let Err(e) =
                GitCommand::set_config(key, value).current_dir(worktree).execute_success().await
            {
                warn!("Failed to set git {}: {}", key, e);
            }
        }

        Ok(())
    }
}

impl RemoteTransport for GitCli {
    async fn list_tags(&self, url: &str, timeout: Duration) -> Result<Vec<String>> {
        let stdout = GitCommand::ls_remote_tags(url)
            .with_timeout(timeout)
            .with_context("ls-remote")
            .execute_stdout()
            .await?;
        Ok(parse_ls_remote_tags(&stdout))
    }

    async fn pull(&self, worktree: &Path, url: &str, timeout: Duration) -> Result<PullOutput> {
        self.ensure_repository(worktree, url).await?;

        let output = GitCommand::pull(url)
            .current_dir(worktree)
            .with_timeout(timeout)
            .with_context("pull")
            .execute()
            .await?;

        Ok(PullOutput {
            summary: output.stdout.trim().to_string(),
        })
    }
}

/// Extract tag names from `git ls-remote --tags` output.
#[must_use]
pub fn parse_ls_remote_tags(output: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for line in output.lines() {
        let Some((_, reference)) = line.split_once("refs/tags/") else {
            continue;
        };
        let name = reference.trim().trim_end_matches("^{}");
        if !name.is_empty() && !tags.iter().any(|t| t == name) {
            tags.push(name.to_string());
        }
    }
    tags
}

/// Most recent tag reachable from `HEAD` in `repo_dir`, if any.
pub async fn describe_latest_tag(repo_dir: &Path) -> Option<String> {
    match GitCommand::describe_tags()
        .current_dir(repo_dir)
        .with_timeout(GIT_LOCAL_TIMEOUT)
        .execute_stdout()
        .await
    {
        Ok(tag) if !tag.is_empty() => Some(tag),
        Ok(_) => None,
        Err(e) => {
            debug!(target: "git", "git describe failed in {}: {}", repo_dir.display(), e);
            None
        }
    }
}

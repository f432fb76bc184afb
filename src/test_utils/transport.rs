//! Scripted [`RemoteTransport`] for tests.
//!
//! Each mirror URL gets a [`ProbeScript`] that decides what `list_tags`
//! returns and how long it takes. Pulls follow one [`PullScript`] shared by
//! all URLs. Calls are counted so tests can assert what was contacted.

use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

use crate::core::UpdateError;
use crate::git::{PullOutput, RemoteTransport};

/// Behaviour of `list_tags` for one URL.
#[derive(Debug, Clone)]
pub struct ProbeScript {
    tags: Option<Vec<String>>,
    latency: Duration,
}

impl ProbeScript {
    /// Answer with `tags`.
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: Some(tags.into_iter().map(Into::into).collect()),
            latency: Duration::ZERO,
        }
    }

    /// Fail like an unreachable remote.
    pub fn failing() -> Self {
        Self {
            tags: None,
            latency: Duration::ZERO,
        }
    }

    /// Take `latency` before answering. A latency above the caller's timeout
    /// makes the call fail once the timeout elapses.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Behaviour of `pull`.
#[derive(Debug, Clone)]
pub enum PullScript {
    /// Write these `(relative path, content)` files into the worktree and succeed.
    Succeed(Vec<(String, String)>),
    /// Fail with this stderr without touching the worktree.
    Fail(String),
    /// Write files, then fail, like a merge that stopped half-way.
    CorruptThenFail {
        files: Vec<(String, String)>,
        stderr: String,
    },
    /// Like `CorruptThenFail`, and also delete `backup_root` so that no
    /// restore is possible.
    CorruptAndLoseBackups {
        files: Vec<(String, String)>,
        stderr: String,
        backup_root: PathBuf,
    },
}

pub struct MockTransport {
    mirrors: HashMap<String, ProbeScript>,
    list_calls: Mutex<HashMap<String, u32>>,
    pull: PullScript,
    pull_calls: AtomicU32,
    pull_gate: Mutex<Option<Arc<Notify>>>,
    pull_started: Notify,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            mirrors: HashMap::new(),
            list_calls: Mutex::new(HashMap::new()),
            pull: PullScript::Succeed(Vec::new()),
            pull_calls: AtomicU32::new(0),
            pull_gate: Mutex::new(None),
            pull_started: Notify::new(),
        }
    }

    #[must_use]
    pub fn with_mirror(mut self, url: impl Into<String>, script: ProbeScript) -> Self {
        self.mirrors.insert(url.into(), script);
        self
    }

    #[must_use]
    pub fn with_pull(mut self, script: PullScript) -> Self {
        self.pull = script;
        self
    }

    /// Number of `list_tags` calls made for `url`.
    pub fn list_calls(&self, url: &str) -> u32 {
        self.list_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn pull_calls(&self) -> u32 {
        self.pull_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent pull wait until the returned gate is notified.
    pub fn hold_pulls(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.pull_gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&gate));
        gate
    }

    /// Wait until a pull has started.
    pub async fn wait_for_pull(&self) {
        self.pull_started.notified().await;
    }
}

fn write_files(worktree: &Path, files: &[(String, String)]) -> Result<()> {
    for (relative, content) in files {
        let path = worktree.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
    }
    Ok(())
}

fn pull_error(stderr: &str) -> anyhow::Error {
    UpdateError::GitCommandError {
        operation: "pull".to_string(),
        stderr: stderr.to_string(),
    }
    .into()
}

impl RemoteTransport for MockTransport {
    async fn list_tags(&self, url: &str, timeout: Duration) -> Result<Vec<String>> {
        *self
            .list_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_string())
            .or_default() += 1;

        let Some(script) = self.mirrors.get(url) else {
            return Err(UpdateError::GitCommandError {
                operation: "ls-remote".to_string(),
                stderr: format!("fatal: repository '{url}' not found"),
            }
            .into());
        };

        if script.latency > timeout {
            tokio::time::sleep(timeout).await;
            return Err(UpdateError::GitCommandError {
                operation: "ls-remote".to_string(),
                stderr: format!("git command timed out after {}ms", timeout.as_millis()),
            }
            .into());
        }
        tokio::time::sleep(script.latency).await;

        script.tags.clone().ok_or_else(|| {
            UpdateError::GitCommandError {
                operation: "ls-remote".to_string(),
                stderr: format!("fatal: unable to access '{url}': Connection refused"),
            }
            .into()
        })
    }

    async fn pull(&self, worktree: &Path, _url: &str, _timeout: Duration) -> Result<PullOutput> {
        self.pull_calls.fetch_add(1, Ordering::SeqCst);
        self.pull_started.notify_one();

        let gate = self.pull_gate.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match &self.pull {
            PullScript::Succeed(files) => {
                write_files(worktree, files)?;
                Ok(PullOutput {
                    summary: "Fast-forward".to_string(),
                })
            }
            PullScript::Fail(stderr) => Err(pull_error(stderr)),
            PullScript::CorruptThenFail {
                files,
                stderr,
            } => {
                write_files(worktree, files)?;
                Err(pull_error(stderr))
            }
            PullScript::CorruptAndLoseBackups {
                files,
                stderr,
                backup_root,
            } => {
                write_files(worktree, files)?;
                std::fs::remove_dir_all(backup_root)?;
                Err(pull_error(stderr))
            }
        }
    }
}

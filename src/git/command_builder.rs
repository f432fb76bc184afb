//! Type-safe Git command builder for consistent command execution
//!
//! This module provides a fluent API for building and executing Git commands
//! with a mandatory timeout, so no remote query can hang the updater.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::GIT_LOCAL_TIMEOUT;
use crate::core::UpdateError;
use crate::utils::platform::git_command;

/// Builder for a single `git` invocation.
///
/// Output is always captured. The child is killed if the future is dropped,
/// which is what lets an abandoned probe stop without a cancellation signal.
pub struct GitCommand {
    /// Arguments passed after `git` (and after `-C <dir>` when set)
    args: Vec<String>,

    /// Directory passed through `-C`
    current_dir: Option<PathBuf>,

    /// Extra environment variables for the child process
    env_vars: Vec<(String, String)>,

    timeout_duration: Duration,

    /// Free-form label included in log lines
    context: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // Never wait for credentials on a terminal that nobody watches
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: GIT_LOCAL_TIMEOUT,
            context: None,
        }
    }
}

impl GitCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub const fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout_duration = duration;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The git subcommand, ignoring `-C <dir>`.
    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    /// Run the command and capture its output.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::GitCommandError`] when git exits non-zero or the
    /// timeout elapses, and an I/O error when git cannot be spawned.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let mut cmd = Command::new(git_command());

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());

        cmd.args(&full_args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        for (key, value) in &self.env_vars {
            tracing::trace!(target: "git", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        let label = self.context.as_deref().unwrap_or("git");
        tracing::debug!(target: "git", "({}) Executing command: git {}", label, full_args.join(" "));

        let output = match timeout(self.timeout_duration, cmd.output()).await {
            Ok(result) => {
                result.with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?
            }
            Err(_) => {
                tracing::warn!(
                    target: "git",
                    "({}) Command timed out after {}ms: git {}",
                    label,
                    self.timeout_duration.as_millis(),
                    full_args.join(" ")
                );
                return Err(UpdateError::GitCommandError {
                    operation: self.operation(),
                    stderr: format!(
                        "git command timed out after {}ms",
                        self.timeout_duration.as_millis()
                    ),
                }
                .into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "({}) Command failed with exit code {:?}: {}",
                label,
                output.status.code(),
                stderr.trim()
            );
            return Err(UpdateError::GitCommandError {
                operation: self.operation(),
                stderr: if stderr.trim().is_empty() { stdout } else { stderr },
            }
            .into());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "git::perf", "({}) Git {} took {:.2}s", label, self.operation(), elapsed.as_secs_f64());
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(target: "git::perf", "({}) Git {} took {}ms", label, self.operation(), elapsed.as_millis());
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Run the command and return trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Captured output of a successful git command.
#[derive(Debug, Clone)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

// Convenience builders for the operations the updater needs

impl GitCommand {
    /// `git ls-remote --tags <url>`: list tags without fetching objects.
    pub fn ls_remote_tags(url: &str) -> Self {
        Self::new().args(["ls-remote", "--tags", url])
    }

    /// `git pull <url>`: fetch and merge the remote's default branch.
    pub fn pull(url: &str) -> Self {
        Self::new().args(["pull", "--no-edit", "--ff", url])
    }

    /// `git describe --tags --abbrev=0`: most recent tag reachable from HEAD.
    pub fn describe_tags() -> Self {
        Self::new().args(["describe", "--tags", "--abbrev=0"])
    }

    pub fn init() -> Self {
        Self::new().arg("init")
    }

    pub fn remote_url() -> Self {
        Self::new().args(["remote", "get-url", "origin"])
    }

    pub fn add_remote(url: &str) -> Self {
        Self::new().args(["remote", "add", "origin", url])
    }

    pub fn set_config(key: &str, value: &str) -> Self {
        Self::new().args(["config", key, value])
    }
}

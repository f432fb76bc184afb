//! Git test helper utilities
//!
//! Thin synchronous wrapper around the `git` binary for building local
//! repositories that stand in for mirrors in tests.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    fn run(&self, args: &[&str], action: &str) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .with_context(|| action.to_string())?;

        if !output.status.success() {
            bail!("{} failed: {}", action, String::from_utf8_lossy(&output.stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Initialise a repository on branch `main` with a local identity.
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.repo_path)?;
        self.run(&["init", "-b", "main"], "Failed to initialize git repository")?;
        self.run(&["config", "user.email", "test@updater.example"], "Failed to set email")?;
        self.run(&["config", "user.name", "Test User"], "Failed to set name")?;
        self.run(&["config", "commit.gpgsign", "false"], "Failed to disable signing")?;
        Ok(())
    }

    pub fn init_bare(&self) -> Result<()> {
        std::fs::create_dir_all(&self.repo_path)?;
        self.run(&["init", "--bare", "-b", "main"], "Failed to initialize bare repository")?;
        Ok(())
    }

    /// Stage everything and commit.
    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.run(&["add", "-A"], "Failed to add files")?;
        self.run(&["commit", "-m", message], "Failed to commit")?;
        Ok(())
    }

    pub fn tag(&self, name: &str) -> Result<()> {
        self.run(&["tag", name], &format!("Failed to create tag {name}"))?;
        Ok(())
    }

    pub fn remote_add(&self, name: &str, url: &str) -> Result<()> {
        self.run(&["remote", "add", name, url], &format!("Failed to add remote {name}"))?;
        Ok(())
    }

    /// Push `main` and all tags to `remote`.
    pub fn push(&self, remote: &str) -> Result<()> {
        self.run(&["push", remote, "main", "--tags"], "Failed to push")?;
        Ok(())
    }

    pub fn clone_to(url: &str, target: &Path) -> Result<Self> {
        let output = Command::new("git")
            .args(["clone", url])
            .arg(target)
            .output()
            .context("Failed to run git clone")?;
        if !output.status.success() {
            bail!("git clone failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        let repo = Self::new(target);
        repo.run(&["config", "user.email", "test@updater.example"], "Failed to set email")?;
        repo.run(&["config", "user.name", "Test User"], "Failed to set name")?;
        Ok(repo)
    }

    pub fn rev_parse_head(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"], "Failed to read HEAD")
    }
}

/// A bare "mirror" repository plus a working clone used to publish releases.
pub struct TestMirror {
    pub bare: TestGit,
    pub work: TestGit,
}

impl TestMirror {
    /// Create `<root>/mirror.git` and `<root>/publisher`, with one commit
    /// containing `files` tagged `tag`.
    pub fn create(root: &Path, files: &[(&str, &str)], tag: &str) -> Result<Self> {
        let bare = TestGit::new(root.join("mirror.git"));
        bare.init_bare()?;

        let work = TestGit::new(root.join("publisher"));
        work.init()?;
        super::write_tree(work.repo_path(), files);
        work.commit_all("initial release")?;
        work.tag(tag)?;
        work.remote_add("origin", &bare.repo_path().display().to_string())?;
        work.push("origin")?;

        Ok(Self {
            bare,
            work,
        })
    }

    /// Commit `files` on top of the current release and tag it.
    pub fn publish(&self, files: &[(&str, &str)], tag: &str) -> Result<()> {
        super::write_tree(self.work.repo_path(), files);
        self.work.commit_all(&format!("release {tag}"))?;
        self.work.tag(tag)?;
        self.work.push("origin")
    }

    pub fn url(&self) -> String {
        self.bare.repo_path().display().to_string()
    }
}

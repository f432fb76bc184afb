//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chatbot_updater::mirror::{Mirror, MirrorRegistry, MirrorSelector};
use chatbot_updater::service::UpdateService;
use chatbot_updater::test_utils::{MockTransport, RecordingNotifier, sample_app_tree};
use chatbot_updater::upgrade::{RetryPolicy, StateStore, Timeouts, UpdateExecutor};
use chatbot_updater::utils::ExcludeSet;
use chatbot_updater::version::{VersionResolver, VersionTag};
use tempfile::TempDir;

pub const GITHUB: &str = "https://github.example/bot/bot.git";
pub const GITEE: &str = "https://gitee.example/bot/bot.git";

pub type MockService = UpdateService<MockTransport, RecordingNotifier>;

/// Short timeouts so failure paths finish quickly.
pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        fast_path_ms: 50,
        probe_ms: 100,
        race_deadline_ms: 150,
        fallback_ms: 50,
        tag_fetch_secs: 1,
        pull_secs: 5,
    }
}

/// A temporary deployment: an application tree plus state and backup
/// locations outside it.
pub struct TestEnv {
    temp: TempDir,
    app_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let app_dir = temp.path().join("app");
        sample_app_tree(&app_dir);
        Self {
            temp,
            app_dir,
        }
    }

    /// Environment whose application directory does not exist yet.
    pub fn empty() -> Self {
        let temp = TempDir::new().unwrap();
        let app_dir = temp.path().join("app");
        Self {
            temp,
            app_dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    pub fn state_file(&self) -> PathBuf {
        self.temp.path().join("state").join("update_state.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.temp.path().join("backups")
    }

    /// Write a configuration pointing at this environment, with `extra`
    /// appended verbatim, and return its path.
    pub fn write_config(&self, extra: &str) -> PathBuf {
        let content = format!(
            "app_dir = \"{}\"\nstate_file = \"{}\"\nbackup_dir = \"{}\"\ncurrent_version = \"1.0.0\"\n{}",
            toml_path(&self.app_dir),
            toml_path(&self.state_file()),
            toml_path(&self.backup_dir()),
            extra
        );
        let path = self.temp.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    /// The compiled binary with a clean environment.
    pub fn updater(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("chatbot-updater").unwrap();
        cmd.env_remove("RUST_LOG").env_remove("CHATBOT_UPDATER_CONFIG").current_dir(self.root());
        cmd
    }

    /// A service over `transport` with GitHub then Gitee registered.
    pub async fn mock_service(
        &self,
        transport: MockTransport,
        current: &str,
    ) -> (Arc<MockTransport>, MockService) {
        let transport = Arc::new(transport);
        let registry =
            MirrorRegistry::new(vec![Mirror::new("GitHub", GITHUB), Mirror::new("Gitee", GITEE)])
                .unwrap()
                .with_fallback_order(&["Gitee", "GitHub"])
                .unwrap();

        let selector = MirrorSelector::new(Arc::clone(&transport), registry, fast_timeouts());
        let resolver = VersionResolver::new(
            Arc::clone(&transport),
            VersionTag::parse(current).unwrap(),
            RetryPolicy {
                attempts: 2,
                backoff_ms: 1,
            },
            Duration::from_millis(200),
        );
        let excludes = ExcludeSet::new(&["__pycache__", "*.pyc"]).unwrap();
        let executor =
            UpdateExecutor::new(Arc::clone(&transport), &self.app_dir, self.backup_dir(), excludes)
                .with_restore_delay(Duration::from_millis(1));
        let state = Arc::new(StateStore::open(self.state_file()).await);

        let service = UpdateService::new(
            selector,
            resolver,
            executor,
            state,
            RecordingNotifier::default(),
            "10001",
        );
        (transport, service)
    }
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Read every file under `root` (skipping `.git`) into sorted pairs.
pub fn snapshot_files(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().display().to_string();
            (relative.replace('\\', "/"), std::fs::read(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

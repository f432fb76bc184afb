//! `GitCli` against local repositories standing in for mirrors.

use std::sync::Arc;
use std::time::Duration;

use chatbot_updater::git::{GitCli, RemoteTransport};
use chatbot_updater::mirror::{Mirror, MirrorRegistry, MirrorSelector};
use chatbot_updater::service::UpdateService;
use chatbot_updater::test_utils::{RecordingNotifier, TestGit, TestMirror, write_tree};
use chatbot_updater::upgrade::{ApplyStatus, RetryPolicy, StateStore, UpdateExecutor};
use chatbot_updater::utils::ExcludeSet;
use chatbot_updater::version::{VersionResolver, detect_current_version};
use tempfile::TempDir;

use crate::common::fast_timeouts;

const TIMEOUT: Duration = Duration::from_secs(30);

fn release_v1() -> Vec<(&'static str, &'static str)> {
    vec![("main.py", "print('v1.0.0')\n"), ("core/bot.py", "VERSION = '1.0.0'\n")]
}

#[tokio::test]
async fn test_list_tags_from_bare_mirror() {
    let temp = TempDir::new().unwrap();
    let mirror = TestMirror::create(temp.path(), &release_v1(), "v1.0.0").unwrap();
    mirror.publish(&[("main.py", "print('v1.1.0')\n")], "v1.1.0").unwrap();

    let mut tags = GitCli::new().list_tags(&mirror.url(), TIMEOUT).await.unwrap();
    tags.sort();
    assert_eq!(tags, vec!["v1.0.0", "v1.1.0"]);
}

#[tokio::test]
async fn test_list_tags_from_missing_mirror_fails() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nowhere.git").display().to_string();
    assert!(GitCli::new().list_tags(&missing, TIMEOUT).await.is_err());
}

#[tokio::test]
async fn test_pull_fast_forwards_clone() {
    let temp = TempDir::new().unwrap();
    let mirror = TestMirror::create(temp.path(), &release_v1(), "v1.0.0").unwrap();
    let app = TestGit::clone_to(&mirror.url(), &temp.path().join("app")).unwrap();
    let before = app.rev_parse_head().unwrap();

    mirror.publish(&[("core/bot.py", "VERSION = '1.1.0'\n")], "v1.1.0").unwrap();
    let output = GitCli::new().pull(app.repo_path(), &mirror.url(), TIMEOUT).await.unwrap();
    assert!(!output.summary.is_empty());

    assert_ne!(app.rev_parse_head().unwrap(), before);
    assert_eq!(
        std::fs::read_to_string(app.repo_path().join("core/bot.py")).unwrap(),
        "VERSION = '1.1.0'\n"
    );
}

#[tokio::test]
async fn test_pull_bootstraps_repository_in_plain_directory() {
    let temp = TempDir::new().unwrap();
    let mirror = TestMirror::create(temp.path(), &release_v1(), "v1.0.0").unwrap();
    let app_dir = temp.path().join("deployed");
    std::fs::create_dir_all(&app_dir).unwrap();

    GitCli::new().pull(&app_dir, &mirror.url(), TIMEOUT).await.unwrap();

    assert!(app_dir.join(".git").is_dir());
    assert_eq!(std::fs::read_to_string(app_dir.join("main.py")).unwrap(), "print('v1.0.0')\n");
}

#[tokio::test]
async fn test_current_version_from_git_describe() {
    let temp = TempDir::new().unwrap();
    let mirror = TestMirror::create(temp.path(), &release_v1(), "v1.0.0").unwrap();
    mirror.publish(&[("main.py", "print('v1.2')\n")], "v1.2").unwrap();
    let app = TestGit::clone_to(&mirror.url(), &temp.path().join("app")).unwrap();

    let version = detect_current_version(None, app.repo_path()).await;
    assert_eq!(version.to_string(), "1.2");

    let overridden = detect_current_version(Some("v3.0.0"), app.repo_path()).await;
    assert_eq!(overridden.to_string(), "3.0.0");
}

async fn git_service(
    temp: &TempDir,
    mirror_url: &str,
    app_dir: &std::path::Path,
) -> UpdateService<GitCli, RecordingNotifier> {
    let transport = Arc::new(GitCli::new());
    let registry = MirrorRegistry::new(vec![Mirror::new("local", mirror_url)]).unwrap();
    let current = detect_current_version(None, app_dir).await;

    UpdateService::new(
        MirrorSelector::new(Arc::clone(&transport), registry, fast_timeouts_for_git()),
        VersionResolver::new(Arc::clone(&transport), current, RetryPolicy::default(), TIMEOUT),
        UpdateExecutor::new(
            transport,
            app_dir,
            temp.path().join("backups"),
            ExcludeSet::new(&["__pycache__"]).unwrap(),
        )
        .with_pull_timeout(TIMEOUT),
        Arc::new(StateStore::open(temp.path().join("state.json")).await),
        RecordingNotifier::default(),
        "10001",
    )
}

/// Spawning git takes longer than the mock timeouts allow.
fn fast_timeouts_for_git() -> chatbot_updater::upgrade::Timeouts {
    chatbot_updater::upgrade::Timeouts {
        fast_path_ms: 10_000,
        probe_ms: 10_000,
        race_deadline_ms: 15_000,
        fallback_ms: 10_000,
        ..fast_timeouts()
    }
}

#[tokio::test]
async fn test_check_and_apply_against_local_mirror() {
    let temp = TempDir::new().unwrap();
    let mirror = TestMirror::create(temp.path(), &release_v1(), "v1.0.0").unwrap();
    let app = TestGit::clone_to(&mirror.url(), &temp.path().join("app")).unwrap();
    mirror.publish(&[("core/bot.py", "VERSION = '1.1.0'\n")], "v1.1.0").unwrap();

    let service = git_service(&temp, &mirror.url(), app.repo_path()).await;

    let report = service.check_for_update().await.unwrap();
    assert_eq!(report.current_version.to_string(), "1.0.0");
    assert_eq!(report.latest_version.to_string(), "1.1.0");
    assert!(report.needs_update);

    let outcome = service.apply_update().await.unwrap();
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.status, ApplyStatus::Committed);
    assert_eq!(
        std::fs::read_to_string(app.repo_path().join("core/bot.py")).unwrap(),
        "VERSION = '1.1.0'\n"
    );
}

#[tokio::test]
async fn test_conflicting_local_change_is_rolled_back() {
    let temp = TempDir::new().unwrap();
    let mirror = TestMirror::create(temp.path(), &release_v1(), "v1.0.0").unwrap();
    let app = TestGit::clone_to(&mirror.url(), &temp.path().join("app")).unwrap();
    mirror.publish(&[("core/bot.py", "VERSION = '1.1.0'\n")], "v1.1.0").unwrap();

    // Uncommitted edit to a file the release changes: git refuses to merge
    write_tree(app.repo_path(), &[("core/bot.py", "VERSION = 'local hotfix'\n")]);
    let head = app.rev_parse_head().unwrap();

    let service = git_service(&temp, &mirror.url(), app.repo_path()).await;
    let outcome = service.apply_update().await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.status, ApplyStatus::RolledBack);
    assert_eq!(app.rev_parse_head().unwrap(), head);
    assert_eq!(
        std::fs::read_to_string(app.repo_path().join("core/bot.py")).unwrap(),
        "VERSION = 'local hotfix'\n"
    );
}

use chatbot_updater::test_utils::{MockTransport, ProbeScript, PullScript};
use chatbot_updater::upgrade::{ApplyStatus, ExecutorState};
use chatbot_updater::utils::ExcludeSet;
use chatbot_updater::utils::fs::tree_digest;

use crate::common::{GITEE, GITHUB, TestEnv, snapshot_files};

fn failing_pull(script: PullScript) -> MockTransport {
    MockTransport::new()
        .with_mirror(GITHUB, ProbeScript::tags(["v1.0.0", "v1.1.0"]))
        .with_mirror(GITEE, ProbeScript::tags(["v1.0.0", "v1.1.0"]))
        .with_pull(script)
}

#[tokio::test]
async fn test_failed_pull_restores_tree_byte_for_byte() {
    let env = TestEnv::new();
    let (_, service) = env
        .mock_service(
            failing_pull(PullScript::CorruptThenFail {
                files: vec![
                    ("main.py".to_string(), "half-merged".to_string()),
                    ("new_module.py".to_string(), "pass".to_string()),
                ],
                stderr: "error: Your local changes would be overwritten by merge".to_string(),
            }),
            "1.0.0",
        )
        .await;

    let digest_excludes = ExcludeSet::new(&["__pycache__", "*.pyc"]).unwrap();
    let before_digest = tree_digest(env.app_dir(), &digest_excludes).unwrap();
    let before_files = snapshot_files(env.app_dir());

    let outcome = service.apply_update().await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.status, ApplyStatus::RolledBack);
    assert!(outcome.message.contains("previous version was restored"), "{}", outcome.message);

    assert_eq!(tree_digest(env.app_dir(), &digest_excludes).unwrap(), before_digest);
    assert_eq!(snapshot_files(env.app_dir()), before_files);
    assert!(!env.app_dir().join("new_module.py").exists());

    // Lock released
    assert_eq!(service.executor().state(), ExecutorState::Idle);
    assert!(!service.executor().is_busy());
}

#[tokio::test]
async fn test_version_control_internals_survive_rollback() {
    let env = TestEnv::new();
    let (_, service) = env
        .mock_service(
            failing_pull(PullScript::CorruptThenFail {
                files: vec![(".git/FETCH_HEAD".to_string(), "abc".to_string())],
                stderr: "fatal: refusing to merge unrelated histories".to_string(),
            }),
            "1.0.0",
        )
        .await;

    let outcome = service.apply_update().await.unwrap();
    assert_eq!(outcome.status, ApplyStatus::RolledBack);

    // .git is neither backed up nor cleared, so the pull's write remains
    assert!(env.app_dir().join(".git/HEAD").exists());
    assert!(env.app_dir().join(".git/FETCH_HEAD").exists());
}

#[tokio::test]
async fn test_failure_message_carries_pull_diagnostic() {
    let env = TestEnv::new();
    let (_, service) = env
        .mock_service(
            failing_pull(PullScript::Fail("fatal: unable to access: Connection timed out".to_string())),
            "1.0.0",
        )
        .await;

    let replies = service.handle(chatbot_updater::service::OperatorCommand::ConfirmUpdate).await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Update failed"), "{}", replies[0]);
    assert!(replies[0].contains("Connection timed out"), "{}", replies[0]);
    assert!(service.selector().cached().is_none());
}

#[tokio::test]
async fn test_missing_application_dir_fails_without_backup() {
    let env = TestEnv::empty();
    let (transport, service) = env
        .mock_service(failing_pull(PullScript::Fail("fatal: not a git repository".to_string())), "1.0.0")
        .await;

    let outcome = service.apply_update().await.unwrap();
    assert_eq!(outcome.status, ApplyStatus::FailedWithoutBackup);
    assert!(outcome.backup_warning.is_some());
    assert!(outcome.message.contains("Warning:"), "{}", outcome.message);
    assert_eq!(transport.pull_calls(), 1);
}

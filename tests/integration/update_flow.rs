use std::sync::Arc;

use chatbot_updater::core::UpdateError;
use chatbot_updater::service::OperatorCommand;
use chatbot_updater::test_utils::{MockTransport, ProbeScript, PullScript};

use crate::common::{GITEE, GITHUB, TestEnv};

#[tokio::test]
async fn test_newer_tag_is_reported() {
    let env = TestEnv::new();
    let transport = MockTransport::new()
        .with_mirror(GITHUB, ProbeScript::tags(["v2.3.0", "v2.4.0", "not-a-version"]))
        .with_mirror(GITEE, ProbeScript::tags(["v2.3.0", "v2.4.0", "not-a-version"]));
    let (_, service) = env.mock_service(transport, "2.3.0").await;

    let report = service.check_for_update().await.unwrap();
    assert_eq!(report.current_version.to_string(), "2.3.0");
    assert_eq!(report.latest_version.to_string(), "2.4.0");
    assert!(report.needs_update);
}

#[tokio::test]
async fn test_unreachable_mirrors_degrade_to_default() {
    let env = TestEnv::new();
    let transport = MockTransport::new()
        .with_mirror(GITHUB, ProbeScript::failing())
        .with_mirror(GITEE, ProbeScript::failing());
    let (transport, service) = env.mock_service(transport, "1.0.0").await;

    let mirror = service.selector().select().await;
    assert_eq!(mirror.url, GITHUB);
    // Race plus serial fallback touched both mirrors
    assert!(transport.list_calls(GITHUB) >= 2);
    assert!(transport.list_calls(GITEE) >= 2);

    let err = service.resolver().resolve(&mirror.url).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::TagFetchFailure { .. })
    ));
}

#[tokio::test]
async fn test_slow_primary_loses_to_fallback_mirror() {
    let env = TestEnv::new();
    let transport = MockTransport::new()
        .with_mirror(
            GITHUB,
            ProbeScript::tags(["v1.0.0"]).with_latency(std::time::Duration::from_secs(5)),
        )
        .with_mirror(GITEE, ProbeScript::tags(["v1.0.0", "v1.1.0"]));
    let (_, service) = env.mock_service(transport, "1.0.0").await;

    assert_eq!(service.selector().select().await.name, "Gitee");
    let report = service.check_for_update().await.unwrap();
    assert_eq!(report.latest_version.to_string(), "1.1.0");
}

#[tokio::test]
async fn test_failed_check_replies_retry_later() {
    let env = TestEnv::new();
    let transport = MockTransport::new()
        .with_mirror(GITHUB, ProbeScript::failing())
        .with_mirror(GITEE, ProbeScript::failing());
    let (_, service) = env.mock_service(transport, "1.0.0").await;

    let replies = service.handle(OperatorCommand::CheckForUpdate).await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("please retry later"), "{}", replies[0]);
    assert!(!replies[0].contains("no release"), "{}", replies[0]);
    assert!(service.state().snapshot().await.last_check_time > 0);
    assert!(service.selector().cached().is_none());
}

#[tokio::test]
async fn test_check_then_confirm_applies_update() {
    let env = TestEnv::new();
    let transport = MockTransport::new()
        .with_mirror(GITHUB, ProbeScript::tags(["v1.0.0", "v1.2.0"]))
        .with_mirror(GITEE, ProbeScript::tags(["v1.0.0", "v1.2.0"]))
        .with_pull(PullScript::Succeed(vec![(
            "core/bot.py".to_string(),
            "VERSION = '1.2.0'\n".to_string(),
        )]));
    let (transport, service) = env.mock_service(transport, "1.0.0").await;

    let replies = service.handle_text("check-for-update").await.unwrap();
    assert_eq!(replies.len(), 2);
    assert!(replies[1].contains("confirm-update"));

    let replies = service.handle_text("/confirm-update").await.unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Update applied successfully"), "{}", replies[0]);
    assert_eq!(transport.pull_calls(), 1);
    assert_eq!(
        std::fs::read_to_string(env.app_dir().join("core/bot.py")).unwrap(),
        "VERSION = '1.2.0'\n"
    );
    assert!(service.pending_offer().is_none());
}

#[tokio::test]
async fn test_second_confirm_during_apply_is_rejected() {
    let env = TestEnv::new();
    let transport = MockTransport::new()
        .with_mirror(GITHUB, ProbeScript::tags(["v1.0.0", "v1.2.0"]))
        .with_mirror(GITEE, ProbeScript::tags(["v1.0.0", "v1.2.0"]))
        .with_pull(PullScript::Succeed(Vec::new()));
    let (transport, service) = env.mock_service(transport, "1.0.0").await;
    let service = Arc::new(service);
    let gate = transport.hold_pulls();

    let first = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.handle(OperatorCommand::ConfirmUpdate).await }
    });
    transport.wait_for_pull().await;

    for _ in 0..3 {
        assert_eq!(
            service.handle(OperatorCommand::ConfirmUpdate).await,
            vec!["Update already in progress.".to_string()]
        );
    }

    gate.notify_one();
    let replies = first.await.unwrap();
    assert!(replies[0].starts_with("Update applied successfully"));
    assert_eq!(transport.pull_calls(), 1);

    // Lock released: a later confirm runs again
    let gate = transport.hold_pulls();
    gate.notify_one();
    let replies = service.handle(OperatorCommand::ConfirmUpdate).await;
    assert!(replies[0].starts_with("Update applied successfully"));
    assert_eq!(transport.pull_calls(), 2);
}

#[tokio::test]
async fn test_unknown_command_suggests_closest() {
    let env = TestEnv::new();
    let (_, service) = env.mock_service(MockTransport::new(), "1.0.0").await;

    let err = service.handle_text("confirm-updat").await.unwrap_err();
    match err {
        UpdateError::UnknownCommand {
            input,
            suggestion,
        } => {
            assert_eq!(input, "confirm-updat");
            assert_eq!(suggestion.as_deref(), Some("confirm-update"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

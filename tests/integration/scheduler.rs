use std::sync::Arc;

use chatbot_updater::test_utils::{MockTransport, ProbeScript};
use chatbot_updater::upgrade::{ScheduleConfig, StateStore, TickOutcome, UpdateScheduler};
use chrono::Utc;

use crate::common::{GITEE, GITHUB, TestEnv};

fn schedule() -> ScheduleConfig {
    ScheduleConfig {
        check_interval_secs: 8 * 3600,
        wake_interval_secs: 3600,
    }
}

fn newer_release() -> MockTransport {
    MockTransport::new()
        .with_mirror(GITHUB, ProbeScript::tags(["v1.0.0", "v1.0.1"]))
        .with_mirror(GITEE, ProbeScript::tags(["v1.0.0", "v1.0.1"]))
}

#[tokio::test]
async fn test_due_check_notifies_operator_once() {
    let env = TestEnv::new();
    let (_, service) = env.mock_service(newer_release(), "1.0.0").await;
    let service = Arc::new(service);
    service.set_auto_update(true).await;

    let scheduler = UpdateScheduler::new(Arc::clone(&service), service.state(), schedule());
    let now = Utc::now().timestamp();

    assert_eq!(
        scheduler.tick(now).await,
        TickOutcome::Notified {
            latest: "1.0.1".to_string()
        }
    );
    // Just checked: the next wake-up is not due
    assert_eq!(scheduler.tick(now + 3600).await, TickOutcome::NotDue);
    assert!(matches!(scheduler.tick(now + 9 * 3600).await, TickOutcome::Notified { .. }));

    let state = service.state().snapshot().await;
    assert!(state.last_check_time >= now);
}

#[tokio::test]
async fn test_scheduled_check_never_applies() {
    let env = TestEnv::new();
    let (transport, service) = env.mock_service(newer_release(), "1.0.0").await;
    let service = Arc::new(service);
    service.set_auto_update(true).await;

    let scheduler = UpdateScheduler::new(Arc::clone(&service), service.state(), schedule());
    scheduler.tick(Utc::now().timestamp()).await;

    assert_eq!(transport.pull_calls(), 0);
    assert!(service.pending_offer().is_some());
}

#[tokio::test]
async fn test_failed_check_still_persists_check_time() {
    let env = TestEnv::new();
    let transport = MockTransport::new()
        .with_mirror(GITHUB, ProbeScript::failing())
        .with_mirror(GITEE, ProbeScript::failing());
    let (_, service) = env.mock_service(transport, "1.0.0").await;
    let service = Arc::new(service);

    let scheduler = UpdateScheduler::new(Arc::clone(&service), service.state(), schedule());
    let now = Utc::now().timestamp();
    assert!(matches!(scheduler.tick(now).await, TickOutcome::Failed { .. }));

    let reopened = StateStore::open(env.state_file()).await;
    assert!(reopened.snapshot().await.last_check_time >= now);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let env = TestEnv::new();
    {
        let (_, service) = env.mock_service(newer_release(), "1.0.0").await;
        service.set_auto_update(true).await;
        service.check_for_update().await.unwrap();
    }

    let raw = std::fs::read_to_string(env.state_file()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["auto_update_enabled"], serde_json::Value::Bool(true));
    assert!(json["last_check_time"].as_i64().unwrap() > 0);

    let (_, service) = env.mock_service(newer_release(), "1.0.0").await;
    let state = service.state().snapshot().await;
    assert!(state.auto_update_enabled);
    assert!(state.last_check_time > 0);
}

#[tokio::test]
async fn test_corrupt_state_file_falls_back_to_defaults() {
    let env = TestEnv::new();
    std::fs::create_dir_all(env.state_file().parent().unwrap()).unwrap();
    std::fs::write(env.state_file(), "{ not json").unwrap();

    let store = StateStore::open(env.state_file()).await;
    let state = store.snapshot().await;
    assert!(!state.auto_update_enabled);
    assert_eq!(state.last_check_time, 0);

    // The next write replaces the corrupt file entirely
    store.set_auto_update(true).await;
    let raw = std::fs::read_to_string(env.state_file()).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
}

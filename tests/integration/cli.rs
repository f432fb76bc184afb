use predicates::prelude::*;
use serial_test::serial;

use chatbot_updater::config::{CONFIG_ENV, UpdaterConfig};

use crate::common::TestEnv;

#[test]
fn test_help_lists_commands() {
    let env = TestEnv::new();
    env.updater()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("auto"))
        .stdout(predicate::str::contains("mirrors"));
}

#[test]
fn test_auto_enable_and_disable_persist_state() {
    let env = TestEnv::new();
    let config = env.write_config("");

    env.updater()
        .arg("--config")
        .arg(&config)
        .args(["auto", "enable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Automatic update checks enabled."));

    let raw = std::fs::read_to_string(env.state_file()).unwrap();
    let state: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(state["auto_update_enabled"], serde_json::Value::Bool(true));
    assert_eq!(state["last_check_time"], serde_json::json!(0));

    env.updater()
        .arg("--config")
        .arg(&config)
        .args(["auto", "disable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));

    let raw = std::fs::read_to_string(env.state_file()).unwrap();
    let state: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(state["auto_update_enabled"], serde_json::Value::Bool(false));
}

#[test]
fn test_config_from_environment_variable() {
    let env = TestEnv::new();
    let config = env.write_config("");

    env.updater().env(CONFIG_ENV, &config).args(["auto", "enable"]).assert().success();
    assert!(env.state_file().exists());
}

#[test]
fn test_missing_config_file_fails() {
    let env = TestEnv::new();
    env.updater()
        .args(["--config", "does-not-exist.toml", "auto", "enable"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let env = TestEnv::new();
    let config = env.write_config("[timeouts]\nprobe_ms = 5000\nrace_deadline_ms = 100\n");

    env.updater()
        .arg("--config")
        .arg(&config)
        .args(["auto", "enable"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("race_deadline_ms"))
        .stderr(predicate::str::contains("suggestion"));
    assert!(!env.state_file().exists());
}

#[test]
fn test_unknown_toggle_is_a_usage_error() {
    let env = TestEnv::new();
    let config = env.write_config("");
    env.updater()
        .arg("--config")
        .arg(&config)
        .args(["auto", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("possible values"));
}

#[tokio::test]
#[serial]
async fn test_load_honours_environment_variable() {
    let env = TestEnv::new();
    let config = env.write_config("keep_backups = 7\noperator = \"42\"\n");

    // SAFETY: serialized with every other test that touches the environment
    unsafe { std::env::set_var(CONFIG_ENV, &config) };
    let loaded = UpdaterConfig::load(None).await;
    unsafe { std::env::remove_var(CONFIG_ENV) };

    let loaded = loaded.unwrap();
    assert_eq!(loaded.keep_backups, 7);
    assert_eq!(loaded.operator, "42");
    assert_eq!(loaded.app_dir().unwrap(), env.app_dir());
}

#[tokio::test]
#[serial]
async fn test_explicit_path_wins_over_environment_variable() {
    let env = TestEnv::new();
    let from_env = env.write_config("keep_backups = 7\n");
    let explicit = env.root().join("explicit.toml");
    std::fs::write(&explicit, "keep_backups = 2\n").unwrap();

    // SAFETY: serialized with every other test that touches the environment
    unsafe { std::env::set_var(CONFIG_ENV, &from_env) };
    let loaded = UpdaterConfig::load(Some(explicit)).await;
    unsafe { std::env::remove_var(CONFIG_ENV) };

    assert_eq!(loaded.unwrap().keep_backups, 2);
}

//! Supervisor integration: drive a scripted child process through the full
//! lifecycle using only the public API.

#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mcshoster_core::config::AppConfig;
use mcshoster_core::supervisor::{
    LaunchConfig, LineSource, ProcessState, ServerSupervisor, SERVER_JAR_NAME,
};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn sh_config(dir: &Path, script: &str) -> LaunchConfig {
    std::fs::write(dir.join(SERVER_JAR_NAME), b"fake jar").unwrap();
    let mut cfg = LaunchConfig::new(dir);
    cfg.runtime = "sh".to_string();
    cfg.java_args = vec!["-c".to_string(), script.to_string()];
    cfg
}

async fn wait_for(sup: &ServerSupervisor, target: ProcessState) {
    let mut rx = sup.watch_state();
    timeout(WAIT, rx.wait_for(|s| *s == target))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed");
}

#[tokio::test]
async fn console_polling_catches_up_after_the_fact() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let sup = ServerSupervisor::new();

    let script = r#"echo 'Starting server'; echo 'Done (1.234s)!'; read line; exit 0"#;
    sup.start(&sh_config(dir.path(), script)).await.unwrap();
    wait_for(&sup, ProcessState::Running).await;

    // poll until both lines arrived; no subscription was needed up front
    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + WAIT;
    while seen.len() < 2 && tokio::time::Instant::now() < deadline {
        seen = sup.recent_console(100).await;
        seen.retain(|l| l.source == LineSource::Stdout);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let contents: Vec<&str> = seen.iter().map(|l| l.content.as_str()).collect();
    assert!(contents.contains(&"Done (1.234s)!"), "{:?}", contents);

    sup.send_command("quit").await.unwrap();
    wait_for(&sup, ProcessState::Stopped).await;

    // incremental polling: nothing new after the last seen id
    let all = sup.recent_console(100).await;
    let last_id = all.last().unwrap().id;
    assert!(sup.console_since(last_id).await.is_empty());
}

#[tokio::test]
async fn crash_then_manual_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let sup = ServerSupervisor::new();

    sup.start(&sh_config(dir.path(), "echo dying; exit 3"))
        .await
        .unwrap();
    wait_for(&sup, ProcessState::Crashed).await;

    // no automatic restart happened; the caller decides to start again
    assert_eq!(sup.state(), ProcessState::Crashed);
    sup.start(&sh_config(dir.path(), "read line; exit 0"))
        .await
        .unwrap();
    wait_for(&sup, ProcessState::Running).await;

    sup.stop().await.unwrap();
    wait_for(&sup, ProcessState::Stopped).await;
}

#[tokio::test]
async fn app_config_drives_launch() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("mcshoster.json");

    let mut app = AppConfig::default();
    app.server_dir = dir.path().to_path_buf();
    app.runtime = "sh".to_string();
    app.java_args = vec!["-c".to_string(), "read line; exit 0".to_string()];
    app.save(&config_path).unwrap();

    // reload at the explicit boundary and derive the launch config
    let reloaded = AppConfig::load(&config_path);
    std::fs::write(reloaded.server_dir.join(SERVER_JAR_NAME), b"fake").unwrap();

    let sup = ServerSupervisor::new();
    sup.start(&reloaded.launch_config()).await.unwrap();
    wait_for(&sup, ProcessState::Running).await;
    sup.stop().await.unwrap();
    wait_for(&sup, ProcessState::Stopped).await;
}

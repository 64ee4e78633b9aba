//! Scheduler integration: ticks firing real backups and advisory restarts
//! against a live supervisor.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use mcshoster_core::backup::BackupManager;
use mcshoster_core::scheduler::{ScheduledAction, Scheduler};
use mcshoster_core::supervisor::ServerSupervisor;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn at(h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 8, 30)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

fn backup_count(manager: &BackupManager) -> usize {
    manager.list().unwrap().len()
}

#[tokio::test]
async fn scheduled_backup_fires_once_per_minute() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(dir.path());
    fs::create_dir_all(manager.world_dir()).unwrap();
    fs::write(manager.world_dir().join("level.dat"), b"level").unwrap();

    let scheduler = Scheduler::new(Arc::new(ServerSupervisor::new()), manager.clone());
    scheduler.configure(ScheduledAction::Backup, true, 3).unwrap();

    // off-hour and off-minute ticks do nothing
    scheduler.tick(at(2, 0, 0)).await;
    scheduler.tick(at(3, 1, 0)).await;
    assert_eq!(backup_count(&manager), 0);

    // the qualifying minute fires exactly once, even with a drifted
    // duplicate tick
    scheduler.tick(at(3, 0, 2)).await;
    scheduler.tick(at(3, 0, 45)).await;
    assert_eq!(backup_count(&manager), 1);

    // archives are second-resolution timestamps; space the next firing out
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let next_day = NaiveDate::from_ymd_opt(2026, 8, 31)
        .unwrap()
        .and_hms_opt(3, 0, 0)
        .unwrap();
    scheduler.tick(next_day).await;
    assert_eq!(backup_count(&manager), 2);
}

#[tokio::test]
async fn failed_backup_keeps_scheduler_alive() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    // no world directory: every snapshot fails
    let manager = BackupManager::new(dir.path());
    let scheduler = Scheduler::new(Arc::new(ServerSupervisor::new()), manager.clone());
    scheduler.configure(ScheduledAction::Backup, true, 3).unwrap();

    scheduler.tick(at(3, 0, 0)).await;
    assert_eq!(backup_count(&manager), 0);

    // scheduler still works: create the world, next day's tick succeeds
    fs::create_dir_all(manager.world_dir()).unwrap();
    let next_day = NaiveDate::from_ymd_opt(2026, 8, 31)
        .unwrap()
        .and_hms_opt(3, 0, 0)
        .unwrap();
    scheduler.tick(next_day).await;
    assert_eq!(backup_count(&manager), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn scheduled_restart_stops_running_server() {
    use mcshoster_core::supervisor::{LaunchConfig, ProcessState, SERVER_JAR_NAME};
    use tokio::time::timeout;

    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(SERVER_JAR_NAME), b"fake").unwrap();

    let supervisor = Arc::new(ServerSupervisor::new());
    let mut cfg = LaunchConfig::new(dir.path());
    cfg.runtime = "sh".to_string();
    cfg.java_args = vec![
        "-c".to_string(),
        "while read line; do [ \"$line\" = stop ] && exit 0; done".to_string(),
    ];
    supervisor.start(&cfg).await.unwrap();

    let mut state = supervisor.watch_state();
    timeout(Duration::from_secs(10), state.wait_for(|s| *s == ProcessState::Running))
        .await
        .unwrap()
        .unwrap();

    let scheduler = Scheduler::new(supervisor.clone(), BackupManager::new(dir.path()));
    scheduler.configure(ScheduledAction::Restart, true, 4).unwrap();
    scheduler.tick(at(4, 0, 0)).await;

    // restart is advisory: the scheduler only sends a graceful stop
    timeout(Duration::from_secs(10), state.wait_for(|s| *s == ProcessState::Stopped))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn scheduled_restart_with_no_process_is_harmless() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let scheduler = Scheduler::new(
        Arc::new(ServerSupervisor::new()),
        BackupManager::new(dir.path()),
    );
    scheduler.configure(ScheduledAction::Restart, true, 4).unwrap();
    scheduler.tick(at(4, 0, 0)).await;
}

//! Scheduled jobs — daily recurring restart and backup, computed against
//! wall-clock time.
//!
//! A tick fires an action when its hour matches and the minute is zero, but
//! only once per qualifying minute: each action records the minute it last
//! fired, so an irregular tick cadence cannot double-fire. Failures from a
//! fired action are logged and never escape the tick boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backup::BackupManager;
use crate::supervisor::ServerSupervisor;

/// Tick cadence of the background loop. The firing condition is
/// minute-granular, so anything at or below one minute works.
const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduledAction {
    Restart,
    Backup,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSchedule {
    pub enabled: bool,
    /// Target hour of day, 0-23
    pub hour: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub restart: ActionSchedule,
    pub backup: ActionSchedule,
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid hour {0}, expected 0-23")]
    InvalidHour(u32),
}

pub struct Scheduler {
    config: Mutex<ScheduleConfig>,
    /// Minute each action last fired in, so a duplicate tick within the
    /// same minute is a no-op
    last_fired: Mutex<HashMap<ScheduledAction, NaiveDateTime>>,
    supervisor: Arc<ServerSupervisor>,
    backups: BackupManager,
}

impl Scheduler {
    pub fn new(supervisor: Arc<ServerSupervisor>, backups: BackupManager) -> Self {
        Self {
            config: Mutex::new(ScheduleConfig::default()),
            last_fired: Mutex::new(HashMap::new()),
            supervisor,
            backups,
        }
    }

    /// Update one action's schedule. Takes effect on the next tick; no
    /// retroactive firing for the current tick.
    pub fn configure(
        &self,
        action: ScheduledAction,
        enabled: bool,
        hour: u32,
    ) -> Result<(), ScheduleError> {
        if hour > 23 {
            return Err(ScheduleError::InvalidHour(hour));
        }
        let mut config = lock(&self.config);
        let entry = match action {
            ScheduledAction::Restart => &mut config.restart,
            ScheduledAction::Backup => &mut config.backup,
        };
        entry.enabled = enabled;
        entry.hour = hour;
        tracing::info!(
            "Schedule updated: {:?} enabled={} hour={}",
            action,
            enabled,
            hour
        );
        Ok(())
    }

    /// Replace the whole schedule, e.g. when applying a reloaded app config.
    pub fn set_config(&self, config: ScheduleConfig) {
        *lock(&self.config) = config;
    }

    pub fn config(&self) -> ScheduleConfig {
        *lock(&self.config)
    }

    /// Next wall-clock instant the action will fire, or None when disabled.
    pub fn next_run(&self, action: ScheduledAction) -> Option<NaiveDateTime> {
        let config = self.config();
        let schedule = match action {
            ScheduledAction::Restart => config.restart,
            ScheduledAction::Backup => config.backup,
        };
        if !schedule.enabled {
            return None;
        }
        next_occurrence(Local::now().naive_local(), schedule.hour)
    }

    /// Actions due at `now`, applying the last-fired-minute guard.
    fn due_actions(&self, now: NaiveDateTime) -> Vec<ScheduledAction> {
        let config = self.config();
        let minute_key = match now.date().and_hms_opt(now.hour(), now.minute(), 0) {
            Some(key) => key,
            None => return Vec::new(),
        };

        let mut last_fired = lock(&self.last_fired);
        let mut due = Vec::new();
        for (action, schedule) in [
            (ScheduledAction::Restart, config.restart),
            (ScheduledAction::Backup, config.backup),
        ] {
            if !schedule.enabled || now.hour() != schedule.hour || now.minute() != 0 {
                continue;
            }
            if last_fired.get(&action) == Some(&minute_key) {
                continue;
            }
            last_fired.insert(action, minute_key);
            due.push(action);
        }
        due
    }

    /// Evaluate the schedule at `now` and fire any due actions. One failing
    /// action never prevents the other or stops future ticks.
    pub async fn tick(&self, now: NaiveDateTime) {
        for action in self.due_actions(now) {
            match action {
                ScheduledAction::Backup => {
                    tracing::info!("Scheduled backup firing");
                    let backups = self.backups.clone();
                    let result =
                        tokio::task::spawn_blocking(move || backups.snapshot()).await;
                    match result {
                        Ok(Ok(handle)) => {
                            tracing::info!("Scheduled backup created: {}", handle.file_name())
                        }
                        Ok(Err(e)) => tracing::error!("Scheduled backup failed: {}", e),
                        Err(e) => tracing::error!("Scheduled backup task panicked: {}", e),
                    }
                }
                ScheduledAction::Restart => {
                    // Advisory: send a graceful stop and report it. Bringing
                    // the process back up is the front end's call, since the
                    // launch configuration may have changed meanwhile.
                    match self.supervisor.stop().await {
                        Ok(()) => tracing::info!(
                            "Scheduled restart requested: stop sent, restart on Stopped"
                        ),
                        Err(e) => {
                            tracing::warn!("Scheduled restart skipped: {}", e)
                        }
                    }
                }
            }
        }
    }

    /// Background loop: one tick per minute, ticks never overlap. A slow
    /// tick (e.g. while snapshotting) delays the next one instead of
    /// running concurrently with it.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick(Local::now().naive_local()).await;
        }
    }
}

/// `today at hour:00:00` if strictly in the future, else the same time
/// tomorrow. Rolls over month and year boundaries; an exact hit on
/// hour:00:00 yields the instant 24h later, never "now" itself.
pub fn next_occurrence(now: NaiveDateTime, hour: u32) -> Option<NaiveDateTime> {
    let today = now.date().and_hms_opt(hour, 0, 0)?;
    if today > now {
        Some(today)
    } else {
        today.checked_add_signed(Duration::days(1))
    }
}

/// Recover from a poisoned lock; schedule state stays usable even if a
/// holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

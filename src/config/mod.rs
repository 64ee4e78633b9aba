//! Application configuration — a single owned struct, loaded and saved at
//! explicit lifecycle points (startup, apply, shutdown). Components receive
//! what they need from it at construction; nothing mutates it ambiently.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::scheduler::ScheduleConfig;
use crate::supervisor::LaunchConfig;

pub const CONFIG_FILE_NAME: &str = "mcshoster.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where server.jar and world files live
    pub server_dir: PathBuf,
    pub java_args: Vec<String>,
    pub runtime: String,
    /// UI preference: prefix console lines with a timestamp
    pub show_timestamps: bool,
    pub schedule: ScheduleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_dir: PathBuf::from("MinecraftServer"),
            java_args: vec!["-Xms1G".to_string(), "-Xmx1G".to_string()],
            runtime: "java".to_string(),
            show_timestamps: false,
            schedule: ScheduleConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file; a missing or unparsable file yields defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        "Invalid config file {}, using defaults: {}",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist as pretty JSON, backing the previous file up to `.bak`.
    pub fn save(&self, path: &Path) -> Result<()> {
        crate::store::write_json(path, self)
    }

    /// Derive the immutable per-launch configuration.
    pub fn launch_config(&self) -> LaunchConfig {
        LaunchConfig {
            server_dir: self.server_dir.clone(),
            java_args: self.java_args.clone(),
            runtime: self.runtime.clone(),
            timestamps: self.show_timestamps,
        }
    }
}

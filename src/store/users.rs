//! Operator and whitelist entries — JSON array-of-objects files in the
//! server directory, edited with duplicate suppression.

use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const OPS_FILE_NAME: &str = "ops.json";
pub const WHITELIST_FILE_NAME: &str = "whitelist.json";

const DEFAULT_OP_LEVEL: u8 = 4;
const UUID_PATTERN: &str = r"^[0-9a-fA-F]{8}-([0-9a-fA-F]{4}-){3}[0-9a-fA-F]{12}$";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default = "default_op_level")]
    pub level: u8,
    #[serde(rename = "bypassesPlayerLimit", default)]
    pub bypasses_player_limit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

fn default_op_level() -> u8 {
    DEFAULT_OP_LEVEL
}

pub fn validate_uuid(uuid: &str) -> bool {
    Regex::new(UUID_PATTERN)
        .map(|re| re.is_match(uuid))
        .unwrap_or(false)
}

fn ops_path(server_dir: &Path) -> PathBuf {
    server_dir.join(OPS_FILE_NAME)
}

fn whitelist_path(server_dir: &Path) -> PathBuf {
    server_dir.join(WHITELIST_FILE_NAME)
}

pub fn load_ops(server_dir: &Path) -> Result<Vec<OpEntry>> {
    super::read_json_or(&ops_path(server_dir), Vec::new())
}

/// Add an operator entry unless the name (or uuid, when given) is already
/// present.
pub fn add_op(
    server_dir: &Path,
    name: &str,
    uuid: Option<&str>,
    level: Option<u8>,
) -> Result<()> {
    let path = ops_path(server_dir);
    let mut ops = load_ops(server_dir)?;
    let duplicate = ops.iter().any(|e| {
        e.name == name || (uuid.is_some() && e.uuid.as_deref() == uuid)
    });
    if duplicate {
        return Ok(());
    }
    ops.push(OpEntry {
        name: name.to_string(),
        uuid: uuid.map(str::to_string),
        level: level.unwrap_or(DEFAULT_OP_LEVEL),
        bypasses_player_limit: false,
    });
    super::write_json(&path, &ops)?;
    tracing::info!("OP added: {}", name);
    Ok(())
}

pub fn remove_op(server_dir: &Path, name: &str) -> Result<()> {
    let path = ops_path(server_dir);
    let mut ops = load_ops(server_dir)?;
    ops.retain(|e| e.name != name);
    super::write_json(&path, &ops)?;
    tracing::info!("OP removed: {}", name);
    Ok(())
}

pub fn load_whitelist(server_dir: &Path) -> Result<Vec<WhitelistEntry>> {
    super::read_json_or(&whitelist_path(server_dir), Vec::new())
}

pub fn add_whitelist(server_dir: &Path, name: &str, uuid: Option<&str>) -> Result<()> {
    let path = whitelist_path(server_dir);
    let mut entries = load_whitelist(server_dir)?;
    if entries.iter().any(|e| e.name == name) {
        return Ok(());
    }
    entries.push(WhitelistEntry {
        name: name.to_string(),
        uuid: uuid.map(str::to_string),
    });
    super::write_json(&path, &entries)?;
    tracing::info!("Whitelisted: {}", name);
    Ok(())
}

pub fn remove_whitelist(server_dir: &Path, name: &str) -> Result<()> {
    let path = whitelist_path(server_dir);
    let mut entries = load_whitelist(server_dir)?;
    entries.retain(|e| e.name != name);
    super::write_json(&path, &entries)?;
    tracing::info!("Whitelist removed: {}", name);
    Ok(())
}

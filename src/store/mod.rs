//! File persistence helpers — the `key=value` properties file, JSON files
//! with load-default-if-absent semantics, and the EULA acceptance file.
//! Every write backs the previous file up to `<name>.bak` first.

pub mod users;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const EULA_FILE_NAME: &str = "eula.txt";
pub const PROPERTIES_FILE_NAME: &str = "server.properties";

/// Parse a line-oriented `key=value` file. Blank lines and `#` comments are
/// skipped; a missing file yields an empty map.
pub fn read_properties(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut props = BTreeMap::new();
    if !path.exists() {
        return Ok(props);
    }
    let content = fs::read_to_string(path)?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.insert(key.to_string(), value.to_string());
        }
    }
    Ok(props)
}

pub fn write_properties(path: &Path, props: &BTreeMap<String, String>) -> Result<()> {
    backup_existing(path)?;
    let mut content = String::new();
    for (key, value) in props {
        content.push_str(key);
        content.push('=');
        content.push_str(value);
        content.push('\n');
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Read a JSON file, or return `default` when the file does not exist.
pub fn read_json_or<T: DeserializeOwned>(path: &Path, default: T) -> Result<T> {
    if !path.exists() {
        return Ok(default);
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    backup_existing(path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    Ok(())
}

/// Write `eula.txt` with the given acceptance value.
pub fn set_eula(server_dir: &Path, accept: bool) -> Result<()> {
    fs::create_dir_all(server_dir)?;
    let value = if accept { "true" } else { "false" };
    fs::write(server_dir.join(EULA_FILE_NAME), format!("eula={}\n", value))?;
    tracing::info!("EULA set to {}", value);
    Ok(())
}

/// Whether `eula.txt` exists and contains `eula=true`.
pub fn eula_accepted(server_dir: &Path) -> bool {
    fs::read_to_string(server_dir.join(EULA_FILE_NAME))
        .map(|content| {
            content
                .lines()
                .any(|line| line.trim().eq_ignore_ascii_case("eula=true"))
        })
        .unwrap_or(false)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

fn backup_existing(path: &Path) -> Result<()> {
    if path.exists() {
        fs::copy(path, backup_path(path))?;
    }
    Ok(())
}

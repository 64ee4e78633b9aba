//! Plugin jar management — list, add, remove, and toggle Bukkit-style
//! plugin jars between `plugins/` and `plugins-disabled/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

pub const PLUGINS_DIR_NAME: &str = "plugins";
pub const DISABLED_DIR_NAME: &str = "plugins-disabled";

pub fn plugins_dir(server_dir: &Path) -> PathBuf {
    server_dir.join(PLUGINS_DIR_NAME)
}

pub fn disabled_dir(server_dir: &Path) -> PathBuf {
    server_dir.join(DISABLED_DIR_NAME)
}

fn list_jars(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let pattern = dir.join("*.jar");
    let mut jars: Vec<PathBuf> = glob(&pattern.to_string_lossy())
        .context("invalid plugin glob pattern")?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Skipping unreadable plugin entry: {}", e);
                None
            }
        })
        .collect();
    jars.sort();
    Ok(jars)
}

/// Installed plugin jars, sorted by filename.
pub fn list_plugins(server_dir: &Path) -> Result<Vec<PathBuf>> {
    list_jars(&plugins_dir(server_dir))
}

/// Disabled plugin jars, sorted by filename.
pub fn list_disabled(server_dir: &Path) -> Result<Vec<PathBuf>> {
    list_jars(&disabled_dir(server_dir))
}

/// Copy a jar into the plugins directory.
pub fn add_plugin(server_dir: &Path, jar_source: &Path) -> Result<()> {
    let file_name = jar_source
        .file_name()
        .context("plugin source has no file name")?;
    let target_dir = plugins_dir(server_dir);
    fs::create_dir_all(&target_dir)?;
    fs::copy(jar_source, target_dir.join(file_name))?;
    tracing::info!("Plugin added: {}", file_name.to_string_lossy());
    Ok(())
}

/// Delete a jar from the plugins directory. Missing jars are a no-op.
pub fn remove_plugin(server_dir: &Path, plugin_name: &str) -> Result<()> {
    let target = plugins_dir(server_dir).join(plugin_name);
    if target.exists() {
        fs::remove_file(&target)?;
        tracing::info!("Plugin removed: {}", plugin_name);
    }
    Ok(())
}

/// Move a jar from `plugins/` to `plugins-disabled/`.
pub fn disable_plugin(server_dir: &Path, plugin_name: &str) -> Result<()> {
    let source = plugins_dir(server_dir).join(plugin_name);
    if !source.exists() {
        return Ok(());
    }
    let target_dir = disabled_dir(server_dir);
    fs::create_dir_all(&target_dir)?;
    fs::rename(&source, target_dir.join(plugin_name))?;
    tracing::info!("Plugin disabled: {}", plugin_name);
    Ok(())
}

/// Move a jar from `plugins-disabled/` back to `plugins/`.
pub fn enable_plugin(server_dir: &Path, plugin_name: &str) -> Result<()> {
    let source = disabled_dir(server_dir).join(plugin_name);
    if !source.exists() {
        return Ok(());
    }
    let target_dir = plugins_dir(server_dir);
    fs::create_dir_all(&target_dir)?;
    fs::rename(&source, target_dir.join(plugin_name))?;
    tracing::info!("Plugin enabled: {}", plugin_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar_names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn list_empty_when_no_plugins_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_plugins(dir.path()).unwrap().is_empty());
        assert!(list_disabled(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn add_and_list_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let b = dir.path().join("bravo.jar");
        let a = dir.path().join("alpha.jar");
        fs::write(&b, b"jar").unwrap();
        fs::write(&a, b"jar").unwrap();

        add_plugin(dir.path(), &b).unwrap();
        add_plugin(dir.path(), &a).unwrap();

        let listed = list_plugins(dir.path()).unwrap();
        assert_eq!(jar_names(&listed), ["alpha.jar", "bravo.jar"]);
    }

    #[test]
    fn non_jar_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let plugins = plugins_dir(dir.path());
        fs::create_dir_all(&plugins).unwrap();
        fs::write(plugins.join("worldedit.jar"), b"jar").unwrap();
        fs::write(plugins.join("readme.txt"), b"text").unwrap();

        let listed = list_plugins(dir.path()).unwrap();
        assert_eq!(jar_names(&listed), ["worldedit.jar"]);
    }

    #[test]
    fn disable_enable_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("worldedit.jar");
        fs::write(&source, b"jar").unwrap();
        add_plugin(dir.path(), &source).unwrap();

        disable_plugin(dir.path(), "worldedit.jar").unwrap();
        assert!(list_plugins(dir.path()).unwrap().is_empty());
        assert_eq!(
            jar_names(&list_disabled(dir.path()).unwrap()),
            ["worldedit.jar"]
        );

        enable_plugin(dir.path(), "worldedit.jar").unwrap();
        assert_eq!(
            jar_names(&list_plugins(dir.path()).unwrap()),
            ["worldedit.jar"]
        );
        assert!(list_disabled(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn remove_missing_plugin_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        remove_plugin(dir.path(), "ghost.jar").unwrap();
        disable_plugin(dir.path(), "ghost.jar").unwrap();
        enable_plugin(dir.path(), "ghost.jar").unwrap();
    }
}

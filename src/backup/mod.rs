//! World backups — snapshot the world directory into timestamped zip
//! archives and restore them without ever deleting the previous world.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

pub const WORLD_DIR_NAME: &str = "world";
pub const BACKUPS_DIR_NAME: &str = "backups";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("world folder not found: {}", .0.display())]
    WorldMissing(PathBuf),

    #[error("backup I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("backup archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("backup archive not found: {}", .0.display())]
    ArchiveMissing(PathBuf),

    #[error("restore I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("restore archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// An immutable archive file named by creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BackupHandle {
    path: PathBuf,
}

impl BackupHandle {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    server_dir: PathBuf,
}

impl BackupManager {
    pub fn new(server_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_dir: server_dir.into(),
        }
    }

    pub fn world_dir(&self) -> PathBuf {
        self.server_dir.join(WORLD_DIR_NAME)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.server_dir.join(BACKUPS_DIR_NAME)
    }

    /// Zip the default world directory into the backups directory.
    /// Synchronous and potentially slow; run off any latency-sensitive
    /// thread.
    pub fn snapshot(&self) -> Result<BackupHandle, BackupError> {
        self.snapshot_dir(&self.world_dir())
    }

    /// Zip an arbitrary world directory. Entry paths are relative to the
    /// world folder's parent, so the archive root is the folder's own name.
    pub fn snapshot_dir(&self, world: &Path) -> Result<BackupHandle, BackupError> {
        if !world.exists() {
            return Err(BackupError::WorldMissing(world.to_path_buf()));
        }
        let backups = self.backups_dir();
        fs::create_dir_all(&backups)?;

        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let zip_path = backups.join(format!("world_{}.zip", timestamp));

        let file = File::create(&zip_path)?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        let base = world.parent().unwrap_or(world);
        add_dir_recursive(&mut writer, world, base, options)?;
        writer.finish()?;

        tracing::info!("World backup created: {}", zip_path.display());
        Ok(BackupHandle::from_path(zip_path))
    }

    /// All archives in the backups directory, ascending by filename, which
    /// equals chronological order given the fixed timestamp format.
    pub fn list(&self) -> Result<Vec<BackupHandle>, BackupError> {
        let backups = self.backups_dir();
        if !backups.exists() {
            return Ok(Vec::new());
        }
        let mut handles = Vec::new();
        for entry in fs::read_dir(&backups)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|e| e == "zip").unwrap_or(false) {
                handles.push(BackupHandle::from_path(path));
            }
        }
        handles.sort();
        Ok(handles)
    }

    /// Extract an archive over the world location. An existing world
    /// directory is renamed `world_old_<timestamp>` first, never deleted,
    /// so the prior state stays recoverable.
    pub fn restore(&self, backup: &BackupHandle) -> Result<(), RestoreError> {
        if !backup.path().exists() {
            return Err(RestoreError::ArchiveMissing(backup.path().to_path_buf()));
        }

        let world = self.world_dir();
        let parent = world
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.server_dir.clone());

        if world.exists() {
            let timestamp = Local::now().format(TIMESTAMP_FORMAT);
            let aside = parent.join(format!("world_old_{}", timestamp));
            fs::rename(&world, &aside)?;
            tracing::info!("Existing world moved aside: {}", aside.display());
        }

        let file = File::open(backup.path())?;
        let mut archive = ZipArchive::new(file)?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            // reject entries that would escape the target directory
            let rel = match entry.enclosed_name() {
                Some(rel) => rel.to_path_buf(),
                None => continue,
            };
            let out_path = parent.join(rel);
            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
            } else {
                if let Some(dir) = out_path.parent() {
                    fs::create_dir_all(dir)?;
                }
                let mut out = File::create(&out_path)?;
                io::copy(&mut entry, &mut out)?;
            }
        }

        tracing::info!("World restored from: {}", backup.file_name());
        Ok(())
    }
}

fn add_dir_recursive(
    writer: &mut ZipWriter<File>,
    dir: &Path,
    base: &Path,
    options: FileOptions,
) -> Result<(), BackupError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            add_dir_recursive(writer, &path, base, options)?;
        } else {
            let rel = path.strip_prefix(base).unwrap_or(&path);
            // zip entry names always use forward slashes
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            writer.start_file(name, options)?;
            let mut file = File::open(&path)?;
            io::copy(&mut file, writer)?;
        }
    }
    Ok(())
}

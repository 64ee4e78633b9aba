//! First-run setup — Mojang version manifest lookups, server jar
//! placement, and the one-time bootstrap run that generates the server's
//! default configuration files.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::store::PROPERTIES_FILE_NAME;
use crate::store::EULA_FILE_NAME;
use crate::supervisor::{LaunchConfig, SERVER_JAR_NAME};

pub const MOJANG_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// The bootstrap run is a heuristic, not a protocol: give the server this
/// long to produce its config files before giving up.
const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(45);

/// Console text that signals the config files were generated.
const EULA_PROMPTS: [&str; 2] = [
    "You need to agree to the EULA",
    "Failed to load eula.txt",
];

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("version '{0}' not found in Mojang manifest")]
    VersionNotFound(String),

    #[error("no server download available for version '{0}'")]
    ServerUrlMissing(String),

    #[error("server jar not found: {}", .0.display())]
    JarMissing(PathBuf),

    #[error("failed to run bootstrap process: {0}")]
    BootstrapSpawn(#[source] std::io::Error),

    #[error("manifest request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("setup I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry of the Mojang version manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Deserialize)]
struct VersionManifest {
    versions: Vec<VersionInfo>,
}

#[derive(Deserialize)]
struct VersionMeta {
    #[serde(default)]
    downloads: Downloads,
}

#[derive(Deserialize, Default)]
struct Downloads {
    server: Option<DownloadEntry>,
}

#[derive(Deserialize)]
struct DownloadEntry {
    url: String,
}

/// Fetch the list of released versions `{id, type, url}`.
pub async fn fetch_versions(client: &reqwest::Client) -> Result<Vec<VersionInfo>, SetupError> {
    let manifest: VersionManifest = client
        .get(MOJANG_MANIFEST_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(manifest.versions)
}

/// Resolve the server jar download URL for a version id.
pub async fn server_download_url(
    client: &reqwest::Client,
    version_id: &str,
) -> Result<String, SetupError> {
    let versions = fetch_versions(client).await?;
    let version = versions
        .iter()
        .find(|v| v.id == version_id)
        .ok_or_else(|| SetupError::VersionNotFound(version_id.to_string()))?;

    let meta: VersionMeta = client
        .get(&version.url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    meta.downloads
        .server
        .map(|entry| entry.url)
        .ok_or_else(|| SetupError::ServerUrlMissing(version_id.to_string()))
}

/// Download the official server jar for `version_id` into `server_dir`.
pub async fn download_server_jar(
    client: &reqwest::Client,
    server_dir: &Path,
    version_id: &str,
) -> Result<PathBuf, SetupError> {
    let url = server_download_url(client, version_id).await?;
    let bytes = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    std::fs::create_dir_all(server_dir)?;
    let jar_path = server_dir.join(SERVER_JAR_NAME);
    std::fs::write(&jar_path, &bytes)?;
    tracing::info!(
        "Downloaded server jar for version {} ({} bytes)",
        version_id,
        bytes.len()
    );
    Ok(jar_path)
}

/// Copy a user-supplied jar into place as `server.jar`.
pub fn place_custom_jar(server_dir: &Path, source: &Path) -> Result<PathBuf, SetupError> {
    if !source.exists() {
        return Err(SetupError::JarMissing(source.to_path_buf()));
    }
    std::fs::create_dir_all(server_dir)?;
    let target = server_dir.join(SERVER_JAR_NAME);
    std::fs::copy(source, &target)?;
    tracing::info!("Placed custom server jar from {}", source.display());
    Ok(target)
}

#[derive(Debug)]
pub struct BootstrapOutcome {
    /// Whether the expected config files were generated
    pub generated: bool,
    /// Captured console output of the bootstrap run
    pub output: String,
}

/// Run the server once solely to generate its default config files
/// (`eula.txt`, `server.properties`).
///
/// Completion is detected by either the EULA prompt appearing in the
/// output or both expected files existing on disk; the child is then
/// terminated. Gives up after a fixed 45-second deadline.
pub async fn bootstrap(config: &LaunchConfig) -> Result<BootstrapOutcome, SetupError> {
    let jar = config.server_jar();
    if !jar.exists() {
        return Err(SetupError::JarMissing(jar));
    }

    let mut args = config.java_args.clone();
    args.push("-jar".to_string());
    args.push(jar.to_string_lossy().into_owned());
    args.push("nogui".to_string());

    let mut child = Command::new(&config.runtime)
        .args(&args)
        .current_dir(&config.server_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(SetupError::BootstrapSpawn)?;

    let (line_tx, mut line_rx) = mpsc::channel::<String>(256);
    if let Some(stdout) = child.stdout.take() {
        let tx = line_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let tx = line_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(line_tx);

    let eula = config.server_dir.join(EULA_FILE_NAME);
    let properties = config.server_dir.join(PROPERTIES_FILE_NAME);
    let deadline = Instant::now() + BOOTSTRAP_TIMEOUT;

    let mut output = String::new();
    let mut generated = false;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::warn!("Bootstrap deadline reached, terminating server");
            break;
        }
        match tokio::time::timeout(remaining, line_rx.recv()).await {
            Ok(Some(line)) => {
                let prompted = EULA_PROMPTS.iter().any(|p| line.contains(p));
                output.push_str(&line);
                output.push('\n');
                if prompted || (eula.exists() && properties.exists()) {
                    generated = true;
                    break;
                }
            }
            // both readers hit end-of-stream: the server exited on its own
            Ok(None) => break,
            Err(_) => {
                tracing::warn!("Bootstrap deadline reached, terminating server");
                break;
            }
        }
    }

    let _ = child.start_kill();
    let _ = child.wait().await;

    // the server may have written the files right before exiting
    if !generated {
        generated = eula.exists() && properties.exists();
    }

    tracing::info!(
        "Bootstrap {}",
        if generated {
            "completed"
        } else {
            "did not generate expected files"
        }
    );
    Ok(BootstrapOutcome { generated, output })
}

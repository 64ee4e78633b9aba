//! Supervisor error types — callers get explicit failure values instead of
//! errors raised past the component boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to launch the server process.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("server jar not found: {}", .0.display())]
    ExecutableMissing(PathBuf),

    #[error("failed to spawn server process: {0}")]
    SpawnFailed(#[source] std::io::Error),
}

/// A command or stop was attempted with no live process.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no server process is running")]
pub struct NotRunningError;

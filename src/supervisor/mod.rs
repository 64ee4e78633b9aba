//! Server supervisor — spawns the server jar, drains its console output,
//! forwards typed commands to stdin, and publishes lifecycle events.
//!
//! One supervisor owns at most one live child process:
//! - `start()` is a silent no-op while Starting/Running, so a new drain
//!   loop can never race a previous one
//! - stdin writes go through a single writer task, so concurrent callers
//!   cannot interleave partial command lines
//! - the drain task is the only writer of output events and of the final
//!   Stopped/Crashed state, which is published after the last buffered line

pub mod console;
pub mod error;
pub mod events;
pub mod state_machine;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc, watch, Mutex};

use console::ConsoleBuffer;
use events::EventHub;
use state_machine::StateMachine;

pub use error::{NotRunningError, StartError};
pub use events::{LineSource, OutputLine, ServerEvent};
pub use state_machine::ProcessState;

pub const SERVER_JAR_NAME: &str = "server.jar";

/// The server's own console command for a cooperative shutdown.
pub const STOP_COMMAND: &str = "stop";

const DEFAULT_JAVA_ARGS: [&str; 2] = ["-Xms1G", "-Xmx1G"];

/// Everything needed to launch the server process. Immutable per launch.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Directory containing `server.jar`; also the child's working directory
    pub server_dir: PathBuf,
    /// Runtime flags, e.g. minimum/maximum heap
    pub java_args: Vec<String>,
    /// Runtime interpreter resolved on PATH
    pub runtime: String,
    /// Prefix each console line with `[HH:MM:SS]`
    pub timestamps: bool,
}

impl LaunchConfig {
    pub fn new(server_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_dir: server_dir.into(),
            java_args: DEFAULT_JAVA_ARGS.iter().map(|s| s.to_string()).collect(),
            runtime: "java".to_string(),
            timestamps: false,
        }
    }

    pub fn server_jar(&self) -> PathBuf {
        self.server_dir.join(SERVER_JAR_NAME)
    }

    /// Full argument list: `<java_args...> -jar <jar> nogui`
    fn command_args(&self) -> Vec<String> {
        let mut args = self.java_args.clone();
        args.push("-jar".to_string());
        args.push(self.server_jar().to_string_lossy().into_owned());
        args.push("nogui".to_string());
        args
    }
}

/// State shared between the supervisor handle and its background tasks.
struct Shared {
    machine: Mutex<StateMachine>,
    state_tx: watch::Sender<ProcessState>,
    events: EventHub,
    console: Mutex<ConsoleBuffer>,
    /// Channel to the stdin writer task of the current child, if any
    stdin_tx: Mutex<Option<mpsc::Sender<String>>>,
}

impl Shared {
    /// Apply a state transition and publish it. Invalid transitions are
    /// logged and dropped; they indicate a race with process exit, not a
    /// caller error.
    async fn transition(&self, to: ProcessState) {
        let mut machine = self.machine.lock().await;
        match machine.transition(to) {
            Ok(()) => {
                let _ = self.state_tx.send(to);
                self.events.publish(ServerEvent::State(to));
            }
            Err(e) => tracing::warn!("Dropped state transition: {}", e),
        }
    }

    /// Atomically move to Starting unless a process is already live.
    /// Returns the previous state for rollback, or None for the no-op case.
    async fn try_begin_start(&self) -> Option<ProcessState> {
        let mut machine = self.machine.lock().await;
        let prev = machine.state;
        if machine.transition(ProcessState::Starting).is_err() {
            // already Starting/Running (or Stopping with a live child)
            return None;
        }
        let _ = self.state_tx.send(ProcessState::Starting);
        self.events.publish(ServerEvent::State(ProcessState::Starting));
        Some(prev)
    }
}

pub struct ServerSupervisor {
    shared: Arc<Shared>,
    state_rx: watch::Receiver<ProcessState>,
}

impl ServerSupervisor {
    pub fn new() -> Self {
        let (state_tx, state_rx) = watch::channel(ProcessState::NotStarted);
        Self {
            shared: Arc::new(Shared {
                machine: Mutex::new(StateMachine::new()),
                state_tx,
                events: EventHub::new(),
                console: Mutex::new(ConsoleBuffer::new()),
                stdin_tx: Mutex::new(None),
            }),
            state_rx,
        }
    }

    /// Current state snapshot. Safe to read concurrently with the drain loop.
    pub fn state(&self) -> ProcessState {
        *self.state_rx.borrow()
    }

    /// Watch receiver for awaiting state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ProcessState> {
        self.state_rx.clone()
    }

    /// Subscribe to output and state events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.shared.events.subscribe()
    }

    /// The most recent `count` console lines.
    pub async fn recent_console(&self, count: usize) -> Vec<OutputLine> {
        self.shared.console.lock().await.get_recent(count)
    }

    /// All console lines with id > `since_id`.
    pub async fn console_since(&self, since_id: u64) -> Vec<OutputLine> {
        self.shared.console.lock().await.get_since(since_id)
    }

    /// Launch the server process. No-op while Starting/Running.
    pub async fn start(&self, config: &LaunchConfig) -> Result<(), StartError> {
        if matches!(self.state(), ProcessState::Starting | ProcessState::Running) {
            return Ok(());
        }
        let jar = config.server_jar();
        if !jar.exists() {
            return Err(StartError::ExecutableMissing(jar));
        }
        self.launch(
            &config.runtime,
            &config.command_args(),
            &config.server_dir,
            config.timestamps,
        )
        .await
    }

    /// Write `text` plus a newline to the child's stdin and echo it to
    /// subscribers. Fails when no live process exists.
    pub async fn send_command(&self, text: &str) -> Result<(), NotRunningError> {
        if !matches!(
            self.state(),
            ProcessState::Running | ProcessState::Stopping
        ) {
            return Err(NotRunningError);
        }
        let tx = self
            .shared
            .stdin_tx
            .lock()
            .await
            .clone()
            .ok_or(NotRunningError)?;
        tx.send(text.to_string())
            .await
            .map_err(|_| NotRunningError)?;
        tracing::info!("Sent command: {}", text);

        let line = self
            .shared
            .console
            .lock()
            .await
            .push(LineSource::Echo, text.to_string());
        self.shared.events.publish(ServerEvent::Output(line));
        Ok(())
    }

    /// Request a cooperative shutdown by sending the server's `stop`
    /// command. Completion is observed asynchronously when the drain loop
    /// reaches end-of-stream; there is no forced kill and no timeout.
    pub async fn stop(&self) -> Result<(), NotRunningError> {
        match self.state() {
            ProcessState::Stopping => return Ok(()),
            ProcessState::Running => {}
            _ => return Err(NotRunningError),
        }
        self.send_command(STOP_COMMAND).await?;
        self.shared.transition(ProcessState::Stopping).await;
        Ok(())
    }

    async fn launch(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
        timestamps: bool,
    ) -> Result<(), StartError> {
        let rollback = match self.shared.try_begin_start().await {
            Some(prev) => prev,
            None => return Ok(()),
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.shared.transition(rollback).await;
                return Err(StartError::SpawnFailed(e));
            }
        };

        tracing::info!(
            "Server started: {} {} (pid {:?})",
            program,
            args.join(" "),
            child.id()
        );

        let (line_tx, mut line_rx) = mpsc::channel::<(LineSource, String)>(256);
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(256);

        // ── stdout / stderr readers ──────────────────────────
        if let Some(stdout) = child.stdout.take() {
            let tx = line_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send((LineSource::Stdout, line)).await.is_err() {
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
                    if tx.send((LineSource::Stderr, line)).await.is_err() {
                        break;
                    }
                }
            });
        }
        // The drain loop ends when both readers hit end-of-stream.
        drop(line_tx);

        // ── stdin writer ─────────────────────────────────────
        if let Some(mut stdin_handle) = child.stdin.take() {
            tokio::spawn(async move {
                while let Some(cmd) = stdin_rx.recv().await {
                    let data = if cmd.ends_with('\n') {
                        cmd
                    } else {
                        format!("{}\n", cmd)
                    };
                    if stdin_handle.write_all(data.as_bytes()).await.is_err() {
                        break;
                    }
                    if stdin_handle.flush().await.is_err() {
                        break;
                    }
                }
            });
        }

        *self.shared.stdin_tx.lock().await = Some(stdin_tx);
        self.shared.transition(ProcessState::Running).await;

        // ── drain loop ───────────────────────────────────────
        let shared = self.shared.clone();
        tokio::spawn(async move {
            while let Some((source, content)) = line_rx.recv().await {
                let content = if timestamps {
                    format!("[{}] {}", Local::now().format("%H:%M:%S"), content)
                } else {
                    content
                };
                let line = shared.console.lock().await.push(source, content);
                shared.events.publish(ServerEvent::Output(line));
            }

            let status = child.wait().await;
            shared.stdin_tx.lock().await.take();

            let was_stopping =
                { shared.machine.lock().await.state == ProcessState::Stopping };
            let final_state = if was_stopping {
                ProcessState::Stopped
            } else {
                match &status {
                    Ok(s) if s.success() => ProcessState::Stopped,
                    _ => ProcessState::Crashed,
                }
            };
            match &status {
                Ok(s) => tracing::info!("Server process exited with {}", s),
                Err(e) => tracing::warn!("Failed to wait for server process: {}", e),
            }
            shared.transition(final_state).await;
        });

        Ok(())
    }
}

impl Default for ServerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

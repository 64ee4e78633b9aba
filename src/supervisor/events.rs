//! Event hub — broadcast channel carrying console output and state changes
//! to any number of front-end subscribers.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::state_machine::ProcessState;

/// Default capacity of the broadcast channel. A lagging subscriber loses
/// the oldest events; the console ring buffer lets it catch up.
const EVENT_CHANNEL_CAPACITY: usize = 2048;

/// A single line of console output from the managed server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputLine {
    /// Sequential ID for polling (`console_since(id)`)
    pub id: u64,
    /// Unix timestamp (seconds)
    pub timestamp: u64,
    /// Where the line came from
    pub source: LineSource,
    /// Raw text content
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineSource {
    Stdout,
    Stderr,
    /// A command the caller sent, echoed back so a front end can render
    /// user input inline with server output
    Echo,
}

/// Notification published by the supervisor.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Output(OutputLine),
    State(ProcessState),
}

/// Thread-safe publish/subscribe hub for [`ServerEvent`]s.
pub struct EventHub {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    /// Send an event to all current subscribers. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let hub = EventHub::new();
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();

        hub.publish(ServerEvent::State(ProcessState::Running));

        assert!(matches!(
            rx1.recv().await.unwrap(),
            ServerEvent::State(ProcessState::Running)
        ));
        assert!(matches!(
            rx2.recv().await.unwrap(),
            ServerEvent::State(ProcessState::Running)
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let hub = EventHub::new();
        hub.publish(ServerEvent::State(ProcessState::Stopped));
    }
}

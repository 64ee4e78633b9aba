use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of the managed server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
    Crashed,
}

#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("invalid transition: {0:?} -> {1:?}")]
    InvalidTransition(ProcessState, ProcessState),
}

pub struct StateMachine {
    pub state: ProcessState,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: ProcessState::NotStarted,
        }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_transition(&self, to: &ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (&self.state, to),
            // start() from a cold, stopped, or crashed supervisor
            (NotStarted, Starting)
                | (Stopped, Starting)
                | (Crashed, Starting)
                | (Starting, Running)
                // spawn failure rolls back to the state start() was called in
                | (Starting, NotStarted)
                | (Starting, Stopped)
                | (Starting, Crashed)
                | (Running, Stopping)
                | (Running, Stopped)
                | (Running, Crashed)
                | (Stopping, Stopped)
                | (Stopping, Crashed)
        )
    }

    pub fn transition(&mut self, to: ProcessState) -> Result<(), TransitionError> {
        if self.can_transition(&to) {
            tracing::info!("State transition: {:?} -> {:?}", self.state, to);
            self.state = to;
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition(self.state, to))
        }
    }
}

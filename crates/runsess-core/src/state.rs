//! Session lifecycle states.
//!
//! Exactly one supervisor instance owns a `SessionState` at a time. The
//! transitions are driven by the supervisor:
//!
//! ```text
//! NotStarted -> Building -> Running -> ShutdownRequested
//!   -> Terminating -> Killed -> Completed
//! ```
//!
//! with `Failed` reachable from `Building` (build failure) and `Running`
//! spawn failure, and `Completed` reachable from any shutdown tier once the
//! engine is confirmed reaped.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one supervised session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Session created, nothing launched yet.
    NotStarted,
    /// Build collaborator running.
    Building,
    /// Engine, monitor and feeder are up; waiting out the run duration.
    Running,
    /// Duration elapsed or engine exited on its own; teardown begins.
    ShutdownRequested,
    /// Cooperative sentinel did not suffice; graceful terminate sent.
    Terminating,
    /// Graceful terminate did not suffice; forced kill sent.
    Killed,
    /// Engine reaped, helpers reaped, sentinel removed.
    Completed,
    /// Build or engine spawn failure. Terminal.
    Failed,
}

impl SessionState {
    /// Whether this state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NotStarted"),
            Self::Building => write!(f, "Building"),
            Self::Running => write!(f, "Running"),
            Self::ShutdownRequested => write!(f, "ShutdownRequested"),
            Self::Terminating => write!(f, "Terminating"),
            Self::Killed => write!(f, "Killed"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Terminal result of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Final state (always terminal).
    pub state: SessionState,
    /// Engine exit code, if the engine ran and reported one.
    pub engine_exit: Option<i32>,
}

impl SessionOutcome {
    /// A completed session.
    #[must_use]
    pub fn completed(engine_exit: Option<i32>) -> Self {
        Self {
            state: SessionState::Completed,
            engine_exit,
        }
    }

    /// A failed session.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            state: SessionState::Failed,
            engine_exit: None,
        }
    }

    /// Whether the session succeeded (the engine ran and was reaped).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == SessionState::Completed
    }
}

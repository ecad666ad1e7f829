//! Session state management
//!
//! Defines the state machine for the session controller lifecycle and
//! provides thread-safe state tracking with change notification.

use std::sync::Arc;
use tokio::sync::watch;

/// Session controller states
///
/// `Idle -> Starting -> Running -> Terminating -> Terminated`. A worker that
/// finishes before `Running` is published moves `Starting` straight to
/// `Terminating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Engine constructed, not connected yet
    #[default]
    Idle,

    /// Connect worker and cancellation watcher are being launched
    Starting,

    /// Both activities are running
    Running,

    /// First terminal outcome received, not yet delivered
    Terminating,

    /// Outcome delivered; terminal
    Terminated,
}

impl SessionState {
    /// Check whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Running)
                | (Starting, Terminating)
                | (Running, Terminating)
                | (Terminating, Terminated)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Running => write!(f, "running"),
            SessionState::Terminating => write!(f, "terminating"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Thread-safe session state wrapper
///
/// Backed by a watch channel so any number of observers can follow state
/// changes without touching the single-slot outcome channel.
#[derive(Debug, Clone)]
pub struct SharedSessionState(Arc<watch::Sender<SessionState>>);

impl SharedSessionState {
    /// Create a new shared state in `Idle`
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self(Arc::new(tx))
    }

    /// Get the current state
    pub fn get(&self) -> SessionState {
        *self.0.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.0.subscribe()
    }

    /// Move to `next` if that is a legal transition from the current state
    ///
    /// Returns whether the transition happened. Check and update are atomic.
    pub fn transition(&self, next: SessionState) -> bool {
        self.0.send_if_modified(|current| {
            if current.can_transition_to(next) {
                tracing::debug!("Session state {} -> {}", current, next);
                *current = next;
                true
            } else {
                false
            }
        })
    }
}

impl Default for SharedSessionState {
    fn default() -> Self {
        Self::new()
    }
}

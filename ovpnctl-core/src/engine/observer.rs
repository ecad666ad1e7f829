//! Notification sink for engine log lines and events
//!
//! Engines deliver notifications from their own threads, fire-and-forget.
//! Nothing here applies backpressure to the engine.

use tokio::sync::mpsc;

/// One log line emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogInfo {
    pub text: String,
}

impl LogInfo {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Named engine event with free-form info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    /// Event name, e.g. `CONNECTED`, `RECONNECTING`, `AUTH_FAILED`
    pub name: String,
    pub info: String,
    /// Event reports an error condition
    pub error: bool,
    /// Error is fatal to the session
    pub fatal: bool,
}

impl EngineEvent {
    pub fn new(name: impl Into<String>, info: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            info: info.into(),
            error: false,
            fatal: false,
        }
    }

    pub fn error(name: impl Into<String>, info: impl Into<String>, fatal: bool) -> Self {
        Self {
            error: true,
            fatal,
            ..Self::new(name, info)
        }
    }
}

/// Receives engine notifications
///
/// Both methods default to doing nothing so observers only implement
/// what they care about.
pub trait EngineObserver: Send + Sync {
    fn on_log(&self, _log: &LogInfo) {}

    fn on_event(&self, _event: &EngineEvent) {}
}

/// Writes notifications to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_log(&self, log: &LogInfo) {
        tracing::info!(target: "ovpnctl::engine", "log: {}", log.text.trim_end());
    }

    fn on_event(&self, event: &EngineEvent) {
        if event.error {
            tracing::warn!(
                target: "ovpnctl::engine",
                fatal = event.fatal,
                "event name: {} info: {}",
                event.name,
                event.info
            );
        } else {
            tracing::info!(target: "ovpnctl::engine", "event name: {} info: {}", event.name, event.info);
        }
    }
}

/// Notification forwarded through a [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Log(LogInfo),
    Event(EngineEvent),
}

/// Forwards notifications into an unbounded channel
///
/// Sends to a dropped receiver are ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelObserver {
    /// Create an observer together with the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EngineObserver for ChannelObserver {
    fn on_log(&self, log: &LogInfo) {
        let _ = self.sender.send(Notification::Log(log.clone()));
    }

    fn on_event(&self, event: &EngineEvent) {
        let _ = self.sender.send(Notification::Event(event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_forwards_in_order() {
        let (observer, mut rx) = ChannelObserver::channel();

        observer.on_log(&LogInfo::new("hello"));
        observer.on_event(&EngineEvent::new("CONNECTED", "10.8.0.2"));

        assert_eq!(rx.try_recv().unwrap(), Notification::Log(LogInfo::new("hello")));
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::Event(EngineEvent::new("CONNECTED", "10.8.0.2"))
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_observer_ignores_closed_receiver() {
        let (observer, rx) = ChannelObserver::channel();
        drop(rx);

        // Must not panic
        observer.on_log(&LogInfo::new("late line"));
        observer.on_event(&EngineEvent::error("AUTH_FAILED", "", true));
    }

    #[test]
    fn test_error_event_flags() {
        let event = EngineEvent::error("AUTH_FAILED", "bad password", true);
        assert!(event.error);
        assert!(event.fatal);
        assert_eq!(event.name, "AUTH_FAILED");
    }
}

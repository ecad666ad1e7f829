//! Session controller
//!
//! Turns the engine's blocking, callback-driven surface into a supervised
//! session with exactly one observable outcome.
//!
//! `start` launches two activities:
//!
//! - the connect worker, which runs the blocking `Engine::connect` on the
//!   blocking thread pool and is the only writer of the outcome channel;
//! - the cancellation watcher, which sleeps on the caller's
//!   [`CancellationToken`], the session-finished token and the controller's
//!   release token. The caller's token or a dropped controller makes it call
//!   `Engine::stop` and nothing else.
//!
//! Cancellation therefore always flows stop -> connect returns -> single
//! write, and the outcome channel never has two writers.

use crate::config::{Credentials, Settings};
use crate::engine::{Engine, EngineFactory, EngineHandle, EngineObserver};
use crate::error::VpnError;
use crate::session::state::{SessionState, SharedSessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

type Outcome = Result<(), VpnError>;

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Supervises one engine session
///
/// Owns the engine handle and the single-slot outcome channel. One
/// controller runs at most one session; reconnecting from scratch takes a
/// fresh controller and engine.
pub struct SessionController<E: Engine> {
    handle: EngineHandle<E>,
    state: SharedSessionState,
    /// Receiving end of the outcome channel, present between start and the first completed wait
    outcome_rx: Option<oneshot::Receiver<Outcome>>,
    /// Outcome cached by the first completed wait
    outcome: Option<Outcome>,
    /// Cancelled once the session has ended
    finished: CancellationToken,
    /// Cancelled when the controller goes away, stopping a live session
    released: CancellationToken,
    _release_guard: DropGuard,
    worker: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl<E: Engine> SessionController<E> {
    /// Wrap an engine in a new idle controller
    pub fn new(engine: E) -> Self {
        let released = CancellationToken::new();

        Self {
            handle: EngineHandle::new(engine),
            state: SharedSessionState::new(),
            outcome_rx: None,
            outcome: None,
            finished: CancellationToken::new(),
            released: released.clone(),
            _release_guard: released.drop_guard(),
            worker: None,
            watcher: None,
        }
    }

    /// Create the engine through `factory`, bound to `observer`
    pub fn from_factory<F>(factory: &F, observer: Arc<dyn EngineObserver>) -> Result<Self, VpnError>
    where
        F: EngineFactory<Engine = E>,
    {
        Ok(Self::new(factory.create(observer)?))
    }

    /// Borrow the wrapped engine
    pub fn engine(&self) -> &E {
        self.handle.engine()
    }

    /// Get the current session state
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Subscribe to session state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn require_idle(&self, operation: &str) -> Result<(), VpnError> {
        let state = self.state.get();
        if state == SessionState::Idle {
            Ok(())
        } else {
            Err(VpnError::InvalidStateTransition {
                from: state.to_string(),
                to: operation.to_string(),
            })
        }
    }

    /// Hand settings to the engine's evaluation step
    ///
    /// Takes the settings by value: once evaluated they can no longer be
    /// changed. A rejection carries the engine's message verbatim.
    pub fn evaluate(&self, settings: Settings) -> Result<(), VpnError> {
        self.require_idle("evaluate")?;
        let status = self.handle.engine().evaluate(&settings);
        if status.is_error {
            warn!("Engine rejected configuration: {}", status.message);
        }
        status.into_result(|message| VpnError::ConfigRejected { message })
    }

    /// Hand credentials to the engine
    pub fn provide_credentials(&self, credentials: Credentials) -> Result<(), VpnError> {
        self.require_idle("provide_credentials")?;
        let status = self.handle.engine().provide_credentials(&credentials);
        if status.is_error {
            warn!("Engine rejected credentials: {}", status.message);
        }
        status.into_result(|message| VpnError::CredentialsRejected { message })
    }

    /// Start the session
    ///
    /// Must be called from within a tokio runtime and only once per
    /// controller. `cancel` stays owned by the caller; firing it asks the
    /// engine to stop, and the outcome still arrives through [`Self::wait`].
    #[tracing::instrument(skip(self, cancel))]
    pub fn start(&mut self, cancel: CancellationToken) -> Result<(), VpnError> {
        let runtime = Handle::try_current().map_err(|_| VpnError::NoRuntime)?;

        if !self.state.transition(SessionState::Starting) {
            return Err(VpnError::InvalidStateTransition {
                from: self.state.get().to_string(),
                to: SessionState::Starting.to_string(),
            });
        }

        let (outcome_tx, outcome_rx) = oneshot::channel();
        self.outcome_rx = Some(outcome_rx);

        let engine = self.handle.share();
        let state = self.state.clone();
        let finished = self.finished.clone();
        self.worker = Some(runtime.spawn_blocking(move || {
            debug!("Connect worker running");
            let status = engine.connect();
            let outcome = status.into_result(|message| VpnError::SessionFailed { message });

            match &outcome {
                Ok(()) => info!("Session ended cleanly"),
                Err(e) => warn!("Session ended with error: {}", e),
            }

            state.transition(SessionState::Terminating);
            finished.cancel();

            if outcome_tx.send(outcome).is_err() {
                debug!("Outcome receiver dropped before the session ended");
            }
        }));

        let engine = self.handle.share();
        let finished = self.finished.clone();
        let released = self.released.clone();
        self.watcher = Some(runtime.spawn(async move {
            tokio::select! {
                // A finished session needs no stop
                biased;
                _ = finished.cancelled() => {
                    debug!("Cancellation watcher released");
                }
                _ = cancel.cancelled() => {
                    info!("Cancellation requested, stopping engine");
                    engine.stop();
                }
                _ = released.cancelled() => {
                    warn!("Controller dropped with a live session, stopping engine");
                    engine.stop();
                }
            }
        }));

        self.state.transition(SessionState::Running);
        info!("Session started");
        Ok(())
    }

    fn finish(&mut self, outcome: Outcome) -> Outcome {
        self.outcome_rx = None;
        // The worker normally moved to Terminating already; a lost worker did not
        self.state.transition(SessionState::Terminating);
        self.state.transition(SessionState::Terminated);
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn received(result: Result<Outcome, oneshot::error::RecvError>) -> Outcome {
        result.unwrap_or_else(|_| {
            Err(VpnError::WorkerLost {
                reason: "outcome channel closed without a value".to_string(),
            })
        })
    }

    /// Wait for the session's terminal outcome
    ///
    /// The first call consumes the outcome channel; later calls return the
    /// same outcome immediately. Before `start` this returns
    /// [`VpnError::NotStarted`] instead of waiting forever.
    pub async fn wait(&mut self) -> Outcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let received = {
            let rx = self.outcome_rx.as_mut().ok_or(VpnError::NotStarted)?;
            rx.await
        };
        let outcome = Self::received(received);
        self.finish(outcome)
    }

    /// Like [`Self::wait`], but gives up after `timeout`
    ///
    /// On timeout the outcome stays pending and a later wait can still
    /// collect it.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Outcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let received = {
            let rx = self.outcome_rx.as_mut().ok_or(VpnError::NotStarted)?;
            tokio::time::timeout(timeout, rx).await
        };

        match received {
            Ok(result) => {
                let outcome = Self::received(result);
                self.finish(outcome)
            }
            Err(_) => Err(VpnError::WaitTimeout {
                millis: saturating_millis(timeout),
            }),
        }
    }

    fn forward(&self, operation: &str, call: impl FnOnce(&E)) -> bool {
        let state = self.state.get();
        if state != SessionState::Running {
            debug!("Ignoring {} while session is {}", operation, state);
            return false;
        }
        call(self.handle.engine());
        true
    }

    /// Ask the engine to stop; returns whether the call was forwarded
    pub fn stop(&self) -> bool {
        self.forward("stop", |engine| engine.stop())
    }

    /// Pause the running session
    pub fn pause(&self, reason: &str) -> bool {
        self.forward("pause", |engine| engine.pause(reason))
    }

    pub fn resume(&self) -> bool {
        self.forward("resume", |engine| engine.resume())
    }

    /// Reconnect the running session after `seconds`
    ///
    /// Mid-session recovery only; the controller state does not change.
    pub fn reconnect(&self, seconds: u32) -> bool {
        self.forward("reconnect", |engine| engine.reconnect(seconds))
    }

    /// Release the engine
    ///
    /// If the session was started, this first waits for its outcome, so
    /// cancel or stop the session before disposing a long-running one.
    /// Both controller tasks are joined before the engine is disposed.
    pub async fn dispose(mut self) {
        if self.outcome_rx.is_some() {
            let _ = self.wait().await;
        }
        // Releases the watcher of a session whose worker was lost
        self.finished.cancel();

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!("Connect worker failed: {}", e);
            }
        }
        if let Some(watcher) = self.watcher.take() {
            if let Err(e) = watcher.await {
                warn!("Cancellation watcher failed: {}", e);
            }
        }

        let SessionController { handle, .. } = self;
        handle.dispose();
        info!("Session controller disposed");
    }
}

//! Instrumented stub engine shared by the integration tests

#![allow(dead_code)]

use ovpnctl_core::config::{Credentials, Settings};
use ovpnctl_core::engine::{Engine, EngineFactory, EngineObserver, LogInfo, Status};
use ovpnctl_core::error::VpnError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// What the stub's `connect` does
#[derive(Debug, Clone)]
pub enum ConnectBehavior {
    /// Sleep, then return the status
    SleepThen(Duration, Status),
    /// Block until `stop` is called, then return the status
    BlockUntilStop(Status),
    /// Panic inside the worker
    Panic,
}

/// Call counters, kept alive after the engine is disposed
#[derive(Debug, Default)]
pub struct Calls {
    pub evaluate: AtomicUsize,
    pub provide_credentials: AtomicUsize,
    pub connect_returns: AtomicUsize,
    pub stop: AtomicUsize,
    pub pause: AtomicUsize,
    pub resume: AtomicUsize,
    pub reconnect: AtomicUsize,
    pub dispose: AtomicUsize,
    pub last_pause_reason: Mutex<Option<String>>,
    pub last_reconnect_secs: Mutex<Option<u32>>,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct StubEngine {
    behavior: ConnectBehavior,
    evaluate_status: Status,
    credentials_status: Status,
    observer: Option<Arc<dyn EngineObserver>>,
    stopped: Mutex<bool>,
    stop_signal: Condvar,
    pub calls: Arc<Calls>,
}

impl StubEngine {
    pub fn new(behavior: ConnectBehavior) -> Self {
        Self {
            behavior,
            evaluate_status: Status::ok(),
            credentials_status: Status::ok(),
            observer: None,
            stopped: Mutex::new(false),
            stop_signal: Condvar::new(),
            calls: Arc::new(Calls::default()),
        }
    }

    /// Connect succeeds after `millis`
    pub fn succeeding_after(millis: u64) -> Self {
        Self::new(ConnectBehavior::SleepThen(
            Duration::from_millis(millis),
            Status::ok(),
        ))
    }

    /// Connect blocks until stopped, then reports `message` as an error
    pub fn blocking_until_stop(message: &str) -> Self {
        Self::new(ConnectBehavior::BlockUntilStop(Status::error(message)))
    }

    pub fn with_evaluate_status(mut self, status: Status) -> Self {
        self.evaluate_status = status;
        self
    }

    pub fn with_credentials_status(mut self, status: Status) -> Self {
        self.credentials_status = status;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }
}

impl Engine for StubEngine {
    fn evaluate(&self, _settings: &Settings) -> Status {
        self.calls.evaluate.fetch_add(1, Ordering::SeqCst);
        self.evaluate_status.clone()
    }

    fn provide_credentials(&self, _credentials: &Credentials) -> Status {
        self.calls.provide_credentials.fetch_add(1, Ordering::SeqCst);
        self.credentials_status.clone()
    }

    fn connect(&self) -> Status {
        if let Some(observer) = &self.observer {
            observer.on_log(&LogInfo::new("stub: connecting"));
        }

        let status = match &self.behavior {
            ConnectBehavior::SleepThen(delay, status) => {
                std::thread::sleep(*delay);
                status.clone()
            }
            ConnectBehavior::BlockUntilStop(status) => {
                let guard = self.stopped.lock().unwrap();
                let _stopped = self
                    .stop_signal
                    .wait_while(guard, |stopped| !*stopped)
                    .unwrap();
                status.clone()
            }
            ConnectBehavior::Panic => panic!("stub engine connect panicked"),
        };

        self.calls.connect_returns.fetch_add(1, Ordering::SeqCst);
        status
    }

    fn stop(&self) {
        self.calls.stop.fetch_add(1, Ordering::SeqCst);
        *self.stopped.lock().unwrap() = true;
        self.stop_signal.notify_all();
    }

    fn pause(&self, reason: &str) {
        self.calls.pause.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_pause_reason.lock().unwrap() = Some(reason.to_string());
    }

    fn resume(&self) {
        self.calls.resume.fetch_add(1, Ordering::SeqCst);
    }

    fn reconnect(&self, seconds: u32) {
        self.calls.reconnect.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_reconnect_secs.lock().unwrap() = Some(seconds);
    }

    fn dispose(&self) {
        self.calls.dispose.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory producing stub engines bound to the given observer
pub struct StubFactory {
    pub behavior: ConnectBehavior,
}

impl EngineFactory for StubFactory {
    type Engine = StubEngine;

    fn create(&self, observer: Arc<dyn EngineObserver>) -> Result<StubEngine, VpnError> {
        Ok(StubEngine::new(self.behavior.clone()).with_observer(observer))
    }
}

//! VPN engine capability set
//!
//! The engine is the component that actually speaks the VPN protocol.
//! This crate never reimplements it; it only drives it through the
//! [`Engine`] trait and listens to it through an
//! [`observer::EngineObserver`].

use crate::config::{Credentials, Settings};
use crate::error::VpnError;
use std::fmt;
use std::sync::Arc;

pub mod observer;
pub mod openvpn_process;
pub mod output_parser;

pub use observer::{ChannelObserver, EngineEvent, EngineObserver, LogInfo, Notification, TracingObserver};
pub use openvpn_process::{OpenVpnProcessEngine, OpenVpnProcessFactory};
pub use output_parser::OutputParser;

/// Result of an engine call: an error flag plus a human readable message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    pub is_error: bool,
    pub message: String,
}

impl Status {
    /// Successful status with no message
    pub fn ok() -> Self {
        Self::default()
    }

    /// Successful status carrying an informational message
    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            is_error: false,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            message: message.into(),
        }
    }

    /// Convert into a `Result`, wrapping the message with `wrap` on error
    pub fn into_result<F>(self, wrap: F) -> Result<(), VpnError>
    where
        F: FnOnce(String) -> VpnError,
    {
        if self.is_error {
            Err(wrap(self.message))
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_error {
            write!(f, "error: {}", self.message)
        } else if self.message.is_empty() {
            write!(f, "ok")
        } else {
            write!(f, "ok: {}", self.message)
        }
    }
}

/// Operations a VPN client engine exposes
///
/// `connect` blocks for the whole session. The control calls (`stop`,
/// `pause`, `resume`, `reconnect`) must be safe to call from another
/// thread while `connect` is running; the controller does not lock
/// around them.
pub trait Engine: Send + Sync + 'static {
    /// Validate and apply settings
    fn evaluate(&self, settings: &Settings) -> Status;

    /// Validate and apply credentials
    fn provide_credentials(&self, credentials: &Credentials) -> Status;

    /// Run the session; returns once it ends for any reason
    fn connect(&self) -> Status;

    fn stop(&self);

    /// Pause the session, e.g. to avoid reconnection storms while the network is down
    fn pause(&self, reason: &str);

    fn resume(&self);

    /// Reconnect after `seconds`
    fn reconnect(&self, seconds: u32);

    /// Release native resources. Called exactly once, after `connect` returned.
    fn dispose(&self);
}

/// Creates engines bound to a notification sink
pub trait EngineFactory {
    type Engine: Engine;

    fn create(&self, observer: Arc<dyn EngineObserver>) -> Result<Self::Engine, VpnError>;
}

/// Exclusive owner of an engine instance
///
/// Not `Clone`. [`EngineHandle::dispose`] consumes the handle, so an
/// engine can be disposed at most once and never used afterwards.
pub struct EngineHandle<E: Engine> {
    engine: Arc<E>,
    disposed: bool,
}

impl<E: Engine> EngineHandle<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            disposed: false,
        }
    }

    /// Borrow the engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Share the engine with a controller-owned worker
    pub(crate) fn share(&self) -> Arc<E> {
        Arc::clone(&self.engine)
    }

    /// Release the engine's native resources
    ///
    /// Callers must make sure no worker still holds a shared reference.
    pub fn dispose(mut self) {
        let outstanding = Arc::strong_count(&self.engine) - 1;
        if outstanding > 0 {
            tracing::warn!(
                "Disposing engine while {} shared reference(s) are still alive",
                outstanding
            );
        }
        self.engine.dispose();
        self.disposed = true;
        tracing::debug!("Engine disposed");
    }
}

impl<E: Engine> Drop for EngineHandle<E> {
    fn drop(&mut self) {
        if !self.disposed {
            tracing::warn!("Engine handle dropped without dispose(); native resources not released");
        }
    }
}

impl<E: Engine> fmt::Debug for EngineHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("disposed", &self.disposed)
            .finish()
    }
}

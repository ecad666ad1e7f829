//! Session supervision module
//!
//! Runs the engine's blocking connect under supervision and reports a
//! single terminal outcome.

pub mod controller;
pub mod state;

// Public re-exports
pub use controller::SessionController;
pub use state::{SessionState, SharedSessionState};

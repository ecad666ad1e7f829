//! Error types for the ovpnctl session supervisor
//!
//! This module defines all error types used throughout the application,
//! providing consistent error handling and user-friendly error messages.

use thiserror::Error;

/// Main error type for the ovpnctl application
#[derive(Error, Debug)]
pub enum OvpnError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors related to the VPN session lifecycle
    #[error("VPN error: {0}")]
    Vpn(#[from] VpnError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// VPN session errors
///
/// `Clone` so the controller can hand the same terminal outcome to every
/// `wait` call after the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VpnError {
    /// Engine rejected the settings during evaluation
    #[error("config evaluation failed: [{message}]")]
    ConfigRejected { message: String },

    /// Engine rejected the credentials
    #[error("credentials rejected: [{message}]")]
    CredentialsRejected { message: String },

    /// The blocking connect call returned an error status
    #[error("session failed during connect: [{message}]")]
    SessionFailed { message: String },

    #[error("Invalid session state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Session has not been started")]
    NotStarted,

    #[error("No tokio runtime available to run the session")]
    NoRuntime,

    #[error("Timed out after {millis} ms waiting for the session outcome")]
    WaitTimeout { millis: u64 },

    /// The connect worker went away without reporting an outcome
    #[error("Connect worker exited without an outcome: {reason}")]
    WorkerLost { reason: String },

    #[error("Failed to spawn openvpn process: {reason}")]
    ProcessSpawnError { reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, OvpnError>;

//! Type definitions and wrappers for secure data handling
//!
//! This module provides type-safe wrappers for sensitive data using the
//! secrecy crate to prevent accidental exposure in logs or debug output.

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

/// Wrapper for passwords handed to the VPN engine
///
/// Covers the account password as well as proxy and private key
/// passwords. The value never shows up in `Debug` output and is never
/// serialized back into a configuration file.
#[derive(Clone, Debug, Deserialize)]
#[serde(transparent)]
pub struct Password(Secret<String>);

impl Password {
    /// Create a new Password from a plain string
    pub fn new(password: impl Into<String>) -> Self {
        Self(Secret::new(password.into()))
    }

    /// Expose the password value (use with caution!)
    ///
    /// This should only be called when handing the value to the engine.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Check whether the password is empty
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl From<String> for Password {
    fn from(password: String) -> Self {
        Self::new(password)
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Self {
        Self::new(password)
    }
}

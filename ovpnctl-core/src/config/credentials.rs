//! Credentials builder
//!
//! Authentication material consumed by the engine's credential step.

use crate::types::Password;
use serde::Deserialize;

/// Authentication material for a VPN session
///
/// Same contract as [`crate::config::Settings`]: one field per setter,
/// last write wins, unset fields stay `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<Password>,
    pub http_proxy_user: Option<String>,
    pub http_proxy_pass: Option<Password>,
    /// Response to a static or dynamic challenge
    pub response: Option<String>,
    pub dynamic_challenge_cookie: Option<String>,
    pub cache_password: Option<bool>,
    /// Let the server replace the password with a session ID
    pub replace_password_with_session_id: Option<bool>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_http_proxy_user(mut self, user: impl Into<String>) -> Self {
        self.http_proxy_user = Some(user.into());
        self
    }

    pub fn with_http_proxy_pass(mut self, password: impl Into<Password>) -> Self {
        self.http_proxy_pass = Some(password.into());
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_dynamic_challenge_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.dynamic_challenge_cookie = Some(cookie.into());
        self
    }

    pub fn with_cache_password(mut self, enable: bool) -> Self {
        self.cache_password = Some(enable);
        self
    }

    pub fn with_replace_password_with_session_id(mut self, enable: bool) -> Self {
        self.replace_password_with_session_id = Some(enable);
        self
    }

    /// Check whether a username/password pair is present
    pub fn has_user_pass(&self) -> bool {
        self.username.as_deref().map(|u| !u.is_empty()).unwrap_or(false)
    }
}

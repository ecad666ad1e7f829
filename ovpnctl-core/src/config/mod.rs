//! Configuration module
//!
//! Builders for the engine settings and credentials, plus TOML file I/O
//! for persisted profiles.
//!
//! Every builder method sets exactly one field. Methods apply in call
//! order, so the last call for a field wins. Fields that are never set
//! stay `None` and the engine keeps its own default for them.

use crate::types::Password;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod credentials;
pub mod toml_config;

pub use credentials::Credentials;

/// Compression negotiation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Allow compression in both directions
    Yes,
    /// Disable compression
    No,
    /// Only decompress traffic from the server
    Asym,
}

impl CompressionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMode::Yes => "yes",
            CompressionMode::No => "no",
            CompressionMode::Asym => "asym",
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(CompressionMode::Yes),
            "no" => Ok(CompressionMode::No),
            "asym" => Ok(CompressionMode::Asym),
            other => Err(format!(
                "Invalid compression mode '{}': expected yes, no or asym",
                other
            )),
        }
    }
}

/// Key/value pair reported to the server as peer info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Engine settings consumed by the config evaluation step
///
/// Secret fields (`private_key_password`, `proxy_password`) are accepted
/// when loading a profile but are never written back out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Raw profile content (the `.ovpn` file body)
    pub content: Option<String>,
    /// SSL library debug verbosity (1 or 2 for more output)
    pub ssl_debug_level: Option<i32>,
    pub compression_mode: Option<CompressionMode>,
    /// Connection timeout in seconds
    pub conn_timeout: Option<i32>,
    pub legacy_algorithms: Option<bool>,
    pub non_preferred_dc_algorithms: Option<bool>,
    pub disable_client_cert: Option<bool>,
    /// Engine housekeeping tick in milliseconds
    pub clock_tick_ms: Option<u32>,
    pub retry_on_auth_failed: Option<bool>,
    pub allow_local_dns_resolvers: Option<bool>,
    pub allow_local_lan_access: Option<bool>,
    pub allow_unused_addr_families: Option<String>,
    pub alt_proxy: Option<bool>,
    pub autologin_sessions: Option<bool>,
    /// Data channel offload
    pub dco: Option<bool>,
    pub echo: Option<bool>,
    pub external_pki_alias: Option<String>,
    pub generate_tun_builder_capture_event: Option<bool>,
    pub google_dns_fallback: Option<bool>,
    pub gremlin_config: Option<String>,
    pub gui_version: Option<String>,
    pub hw_addr_override: Option<String>,
    pub info: Option<bool>,
    pub peer_info: Option<Vec<KeyValue>>,
    pub platform_version: Option<String>,
    pub port_override: Option<String>,
    #[serde(skip_serializing)]
    pub private_key_password: Option<Password>,
    pub proto_override: Option<String>,
    pub proto_version_override: Option<i32>,
    pub proxy_allow_cleartext_auth: Option<bool>,
    pub proxy_host: Option<String>,
    #[serde(skip_serializing)]
    pub proxy_password: Option<Password>,
    pub proxy_port: Option<String>,
    pub proxy_username: Option<String>,
    pub server_override: Option<String>,
    pub sso_methods: Option<String>,
    pub synchronous_dns_lookup: Option<bool>,
    pub tls_cert_profile_override: Option<String>,
    pub tls_cipher_list: Option<String>,
    pub tls_ciphersuites_list: Option<String>,
    pub tls_version_min_override: Option<String>,
    pub tun_persist: Option<bool>,
    pub wintun: Option<bool>,
    pub default_key_direction: Option<i32>,
}

impl Settings {
    /// Create empty settings (every field left at the engine default)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw profile content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the SSL debug level (1, 2)
    pub fn with_ssl_debug_level(mut self, level: i32) -> Self {
        self.ssl_debug_level = Some(level);
        self
    }

    /// Set the compression mode (yes|no|asym)
    pub fn with_compression_mode(mut self, mode: CompressionMode) -> Self {
        self.compression_mode = Some(mode);
        self
    }

    /// Set the connection timeout in seconds
    pub fn with_conn_timeout(mut self, seconds: i32) -> Self {
        self.conn_timeout = Some(seconds);
        self
    }

    pub fn with_legacy_algorithms(mut self, enable: bool) -> Self {
        self.legacy_algorithms = Some(enable);
        self
    }

    pub fn with_non_preferred_dc_algorithms(mut self, enable: bool) -> Self {
        self.non_preferred_dc_algorithms = Some(enable);
        self
    }

    pub fn with_disable_client_cert(mut self, enable: bool) -> Self {
        self.disable_client_cert = Some(enable);
        self
    }

    pub fn with_clock_tick_ms(mut self, millis: u32) -> Self {
        self.clock_tick_ms = Some(millis);
        self
    }

    pub fn with_retry_on_auth_failed(mut self, enable: bool) -> Self {
        self.retry_on_auth_failed = Some(enable);
        self
    }

    pub fn with_allow_local_dns_resolvers(mut self, enable: bool) -> Self {
        self.allow_local_dns_resolvers = Some(enable);
        self
    }

    pub fn with_allow_local_lan_access(mut self, enable: bool) -> Self {
        self.allow_local_lan_access = Some(enable);
        self
    }

    pub fn with_allow_unused_addr_families(mut self, families: impl Into<String>) -> Self {
        self.allow_unused_addr_families = Some(families.into());
        self
    }

    pub fn with_alt_proxy(mut self, enable: bool) -> Self {
        self.alt_proxy = Some(enable);
        self
    }

    pub fn with_autologin_sessions(mut self, enable: bool) -> Self {
        self.autologin_sessions = Some(enable);
        self
    }

    pub fn with_dco(mut self, enable: bool) -> Self {
        self.dco = Some(enable);
        self
    }

    pub fn with_echo(mut self, enable: bool) -> Self {
        self.echo = Some(enable);
        self
    }

    pub fn with_external_pki_alias(mut self, alias: impl Into<String>) -> Self {
        self.external_pki_alias = Some(alias.into());
        self
    }

    pub fn with_generate_tun_builder_capture_event(mut self, enable: bool) -> Self {
        self.generate_tun_builder_capture_event = Some(enable);
        self
    }

    pub fn with_google_dns_fallback(mut self, enable: bool) -> Self {
        self.google_dns_fallback = Some(enable);
        self
    }

    pub fn with_gremlin_config(mut self, config: impl Into<String>) -> Self {
        self.gremlin_config = Some(config.into());
        self
    }

    pub fn with_gui_version(mut self, version: impl Into<String>) -> Self {
        self.gui_version = Some(version.into());
        self
    }

    pub fn with_hw_addr_override(mut self, addr: impl Into<String>) -> Self {
        self.hw_addr_override = Some(addr.into());
        self
    }

    pub fn with_info(mut self, enable: bool) -> Self {
        self.info = Some(enable);
        self
    }

    /// Replace the peer info list
    pub fn with_peer_info(mut self, peer_info: Vec<KeyValue>) -> Self {
        self.peer_info = Some(peer_info);
        self
    }

    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = Some(version.into());
        self
    }

    pub fn with_port_override(mut self, port: impl Into<String>) -> Self {
        self.port_override = Some(port.into());
        self
    }

    pub fn with_private_key_password(mut self, password: impl Into<Password>) -> Self {
        self.private_key_password = Some(password.into());
        self
    }

    pub fn with_proto_override(mut self, proto: impl Into<String>) -> Self {
        self.proto_override = Some(proto.into());
        self
    }

    pub fn with_proto_version_override(mut self, version: i32) -> Self {
        self.proto_version_override = Some(version);
        self
    }

    pub fn with_proxy_allow_cleartext_auth(mut self, enable: bool) -> Self {
        self.proxy_allow_cleartext_auth = Some(enable);
        self
    }

    pub fn with_proxy_host(mut self, host: impl Into<String>) -> Self {
        self.proxy_host = Some(host.into());
        self
    }

    pub fn with_proxy_password(mut self, password: impl Into<Password>) -> Self {
        self.proxy_password = Some(password.into());
        self
    }

    pub fn with_proxy_port(mut self, port: impl Into<String>) -> Self {
        self.proxy_port = Some(port.into());
        self
    }

    pub fn with_proxy_username(mut self, username: impl Into<String>) -> Self {
        self.proxy_username = Some(username.into());
        self
    }

    pub fn with_server_override(mut self, server: impl Into<String>) -> Self {
        self.server_override = Some(server.into());
        self
    }

    pub fn with_sso_methods(mut self, methods: impl Into<String>) -> Self {
        self.sso_methods = Some(methods.into());
        self
    }

    pub fn with_synchronous_dns_lookup(mut self, enable: bool) -> Self {
        self.synchronous_dns_lookup = Some(enable);
        self
    }

    pub fn with_tls_cert_profile_override(mut self, profile: impl Into<String>) -> Self {
        self.tls_cert_profile_override = Some(profile.into());
        self
    }

    pub fn with_tls_cipher_list(mut self, ciphers: impl Into<String>) -> Self {
        self.tls_cipher_list = Some(ciphers.into());
        self
    }

    pub fn with_tls_ciphersuites_list(mut self, suites: impl Into<String>) -> Self {
        self.tls_ciphersuites_list = Some(suites.into());
        self
    }

    pub fn with_tls_version_min_override(mut self, version: impl Into<String>) -> Self {
        self.tls_version_min_override = Some(version.into());
        self
    }

    pub fn with_tun_persist(mut self, enable: bool) -> Self {
        self.tun_persist = Some(enable);
        self
    }

    pub fn with_wintun(mut self, enable: bool) -> Self {
        self.wintun = Some(enable);
        self
    }

    /// Override the key direction for static/tls-auth keys (0, 1, or -1 for bidirectional)
    pub fn with_default_key_direction(mut self, direction: i32) -> Self {
        self.default_key_direction = Some(direction);
        self
    }

    /// Check whether profile content has been supplied
    pub fn has_content(&self) -> bool {
        self.content
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}

//! TOML configuration file I/O
//!
//! Handles loading and saving session profiles to/from TOML files
//! in the user's configuration directory.

use crate::config::{Credentials, Settings};
use crate::error::{ConfigError, OvpnError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Non-secret credential fields kept in the config file
///
/// Passwords are supplied at run time and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    pub http_proxy_user: Option<String>,
    pub cache_password: Option<bool>,
}

impl CredentialsConfig {
    /// Build engine credentials from the stored fields
    pub fn to_credentials(&self) -> Credentials {
        let mut creds = Credentials::new();
        if let Some(username) = &self.username {
            creds = creds.with_username(username.clone());
        }
        if let Some(user) = &self.http_proxy_user {
            creds = creds.with_http_proxy_user(user.clone());
        }
        if let Some(cache) = self.cache_password {
            creds = creds.with_cache_password(cache);
        }
        creds
    }
}

/// Controller timing knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// How long to wait for the engine to wind down after a stop request
    pub stop_grace_secs: u64,

    /// Stop the session automatically after this many seconds
    pub session_duration_secs: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            stop_grace_secs: 10,
            session_duration_secs: None,
        }
    }
}

impl ControllerConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    pub fn session_duration(&self) -> Option<Duration> {
        self.session_duration_secs.map(Duration::from_secs)
    }
}

/// Complete TOML configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Path to an `.ovpn` profile, read when `settings.content` is unset
    pub profile_path: Option<PathBuf>,

    /// Engine settings
    pub settings: Settings,

    /// Credential settings (non-secret part)
    pub credentials: CredentialsConfig,

    /// Controller settings
    pub controller: ControllerConfig,
}

impl ProfileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profile_path.is_none() && !self.settings.has_content() {
            return Err(ConfigError::MissingField {
                field: "profile_path".to_string(),
            });
        }

        if let Some(username) = &self.credentials.username {
            if username.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: "Username cannot be empty".to_string(),
                });
            }
        }

        if self.controller.stop_grace_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "stop_grace_secs cannot be zero".to_string(),
            });
        }

        Ok(())
    }

    /// Resolve the engine settings, reading the profile file if needed
    pub fn resolve_settings(&self) -> Result<Settings, OvpnError> {
        let settings = self.settings.clone();
        if settings.has_content() {
            return Ok(settings);
        }

        let path = self.profile_path.as_ref().ok_or_else(|| ConfigError::MissingField {
            field: "profile_path".to_string(),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::LoadFailed {
                path: path.to_string_lossy().to_string(),
            },
            _ => ConfigError::IoError {
                message: format!("Failed to read profile {}: {}", path.display(), e),
            },
        })?;

        debug!("Read {} bytes of profile content from {:?}", content.len(), path);
        Ok(settings.with_content(content))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, OvpnError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => OvpnError::Config(ConfigError::LoadFailed {
                path: path.to_string_lossy().to_string(),
            }),
            _ => OvpnError::Config(ConfigError::IoError {
                message: format!("Failed to read config file: {}", e),
            }),
        })?;

        let config: ProfileConfig = toml::from_str(&contents).map_err(|e| {
            OvpnError::Config(ConfigError::ValidationError {
                message: format!("Failed to parse config file: {}", e),
            })
        })?;

        config.validate()?;

        info!(
            "Loaded profile config from {:?} (profile_path={:?}, stop_grace={}s)",
            path, config.profile_path, config.controller.stop_grace_secs
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), OvpnError> {
        self.validate()?;

        let contents = toml::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OvpnError::Config(ConfigError::IoError {
                    message: format!("Failed to create config directory: {}", e),
                })
            })?;
        }

        std::fs::write(path, contents).map_err(|_e| {
            OvpnError::Config(ConfigError::SaveFailed {
                path: path.to_string_lossy().to_string(),
            })
        })?;

        info!("Saved profile config to {:?}", path);
        Ok(())
    }
}

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/ovpnctl, or OVPNCTL_CONFIG_DIR if set.
/// Under sudo the invoking user's home is used.
pub fn get_config_dir() -> Result<PathBuf, OvpnError> {
    if let Ok(config_dir) = std::env::var("OVPNCTL_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        std::env::var("SUDO_HOME").unwrap_or_else(|_| format!("/home/{}", sudo_user))
    } else {
        std::env::var("HOME").map_err(|_| {
            OvpnError::Config(ConfigError::IoError {
                message: "HOME environment variable not set".to_string(),
            })
        })?
    };

    Ok(PathBuf::from(home).join(".config").join("ovpnctl"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, OvpnError> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from `path`, or from the default location when `None`
pub fn load_config(path: Option<&Path>) -> Result<ProfileConfig, OvpnError> {
    match path {
        Some(path) => ProfileConfig::from_file(path),
        None => ProfileConfig::from_file(&get_config_path()?),
    }
}

//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands and the
//! profile loading they share.

pub mod check;
pub mod config;
pub mod connect;

use clap::Args;
use ovpnctl_core::config::toml_config::{get_config_path, load_config, ControllerConfig, ProfileConfig};
use ovpnctl_core::config::{Credentials, Settings};
use ovpnctl_core::engine::openvpn_process::DEFAULT_OPENVPN_BINARY;
use ovpnctl_core::error::OvpnError;
use std::path::PathBuf;
use tracing::debug;

/// Environment variable holding the account password
pub const PASSWORD_ENV: &str = "OVPNCTL_PASSWORD";

/// Options selecting the profile and credentials
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Configuration file (defaults to ~/.config/ovpnctl/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// .ovpn profile, overrides profile_path from the configuration
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Username, overrides the configured one
    #[arg(long)]
    pub username: Option<String>,

    /// openvpn executable to run
    #[arg(long, default_value = DEFAULT_OPENVPN_BINARY)]
    pub openvpn: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Stop the session after this many seconds
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Connection timeout handed to the engine
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(i32).range(0..))]
    pub timeout: Option<i32>,
}

/// Everything a command needs to drive an engine
pub struct PreparedSession {
    pub settings: Settings,
    pub credentials: Credentials,
    pub controller: ControllerConfig,
    pub binary: PathBuf,
}

fn load_profile_config(args: &ProfileArgs) -> Result<ProfileConfig, OvpnError> {
    match (&args.config, &args.profile) {
        (Some(path), _) => load_config(Some(path)),
        // A profile on the command line makes the config file optional
        (None, Some(_)) => {
            let path = get_config_path()?;
            if path.exists() {
                load_config(Some(&path))
            } else {
                debug!("No configuration at {:?}, using defaults", path);
                Ok(ProfileConfig::default())
            }
        }
        (None, None) => load_config(None),
    }
}

/// Load configuration, apply command-line overrides and read the profile
pub fn prepare(args: &ProfileArgs) -> Result<PreparedSession, OvpnError> {
    let mut config = load_profile_config(args)?;

    if let Some(profile) = &args.profile {
        config.profile_path = Some(profile.clone());
        config.settings.content = None;
    }
    if let Some(username) = &args.username {
        config.credentials.username = Some(username.clone());
    }
    config.validate()?;

    let settings = config.resolve_settings()?;

    let mut credentials = config.credentials.to_credentials();
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        credentials = credentials.with_password(password);
    }

    Ok(PreparedSession {
        settings,
        credentials,
        controller: config.controller,
        binary: args.openvpn.clone(),
    })
}

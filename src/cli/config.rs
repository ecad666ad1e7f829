//! Configuration commands

use colored::Colorize;
use ovpnctl_core::config::toml_config::{get_config_path, load_config, CredentialsConfig, ProfileConfig};
use ovpnctl_core::error::{ConfigError, OvpnError};
use std::path::Path;

fn show_option<T: std::fmt::Display>(label: &str, value: Option<T>) {
    match value {
        Some(value) => println!("  {:<22} {}", label, value),
        None => println!("  {:<22} {}", label, "(engine default)".dimmed()),
    }
}

/// Print the effective configuration
pub fn run_config_show(path: Option<&Path>) -> Result<(), OvpnError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };
    let config = load_config(Some(&path))?;

    println!("{} {}", "Configuration:".bold(), path.display());
    println!();
    println!("{}", "Profile".bold());
    match &config.profile_path {
        Some(profile) => println!("  {:<22} {}", "profile_path", profile.display()),
        None => println!("  {:<22} {}", "profile_path", "(inline content)".dimmed()),
    }

    let settings = &config.settings;
    show_option("compression_mode", settings.compression_mode);
    show_option("conn_timeout", settings.conn_timeout);
    show_option("server_override", settings.server_override.as_deref());
    show_option("port_override", settings.port_override.as_deref());
    show_option("proto_override", settings.proto_override.as_deref());
    show_option("proxy_host", settings.proxy_host.as_deref());
    show_option("dco", settings.dco);

    println!();
    println!("{}", "Credentials".bold());
    show_option("username", config.credentials.username.as_deref());
    show_option("cache_password", config.credentials.cache_password);

    println!();
    println!("{}", "Controller".bold());
    println!("  {:<22} {}s", "stop_grace_secs", config.controller.stop_grace_secs);
    show_option("session_duration_secs", config.controller.session_duration_secs);

    Ok(())
}

/// Write a new configuration file
pub fn run_config_init(
    profile: &Path,
    username: Option<String>,
    path: Option<&Path>,
    force: bool,
) -> Result<(), OvpnError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };

    if path.exists() && !force {
        return Err(ConfigError::ValidationError {
            message: format!("{} already exists (use --force to overwrite)", path.display()),
        }
        .into());
    }

    let config = ProfileConfig {
        profile_path: Some(profile.to_path_buf()),
        credentials: CredentialsConfig {
            username,
            ..Default::default()
        },
        ..Default::default()
    };
    config.to_file(&path)?;

    println!("{} Configuration written to {}", "✓".green(), path.display());
    Ok(())
}

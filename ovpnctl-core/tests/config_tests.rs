//! Tests for TOML profile configuration loading

use ovpnctl_core::config::toml_config::{get_config_path, load_config, ProfileConfig};
use ovpnctl_core::config::CompressionMode;
use ovpnctl_core::error::{ConfigError, OvpnError};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const SAMPLE_CONFIG: &str = r#"
profile_path = "/etc/openvpn/client/work.ovpn"

[settings]
compression_mode = "asym"
conn_timeout = 30
dco = false
server_override = "vpn2.example.com"

[credentials]
username = "alice"
cache_password = false

[controller]
stop_grace_secs = 5
session_duration_secs = 3600
"#;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, SAMPLE_CONFIG);

    let config = load_config(Some(&path)).unwrap();

    assert_eq!(
        config.profile_path.as_deref(),
        Some(std::path::Path::new("/etc/openvpn/client/work.ovpn"))
    );
    assert_eq!(config.settings.compression_mode, Some(CompressionMode::Asym));
    assert_eq!(config.settings.conn_timeout, Some(30));
    assert_eq!(config.settings.dco, Some(false));
    assert_eq!(config.settings.server_override.as_deref(), Some("vpn2.example.com"));
    assert_eq!(config.controller.stop_grace(), Duration::from_secs(5));
    assert_eq!(config.controller.session_duration(), Some(Duration::from_secs(3600)));

    let credentials = config.credentials.to_credentials();
    assert_eq!(credentials.username.as_deref(), Some("alice"));
    assert_eq!(credentials.cache_password, Some(false));
    assert!(credentials.password.is_none(), "Passwords never come from the file");
}

#[test]
fn test_controller_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "profile_path = \"/tmp/client.ovpn\"\n");

    let config = ProfileConfig::from_file(&path).unwrap();
    assert_eq!(config.controller.stop_grace(), Duration::from_secs(10));
    assert_eq!(config.controller.session_duration(), None);
    assert!(config.settings.compression_mode.is_none());
}

#[test]
fn test_resolve_settings_reads_profile_file() {
    let dir = TempDir::new().unwrap();
    let profile = dir.path().join("client.ovpn");
    fs::write(&profile, "client\nremote vpn.example.com 1194\n").unwrap();

    let config = ProfileConfig {
        profile_path: Some(profile),
        ..Default::default()
    };

    let settings = config.resolve_settings().unwrap();
    assert!(settings.has_content());
    assert!(settings.content.unwrap().contains("remote vpn.example.com"));
}

#[test]
fn test_inline_content_takes_precedence() {
    let config = ProfileConfig {
        profile_path: Some("/nonexistent/client.ovpn".into()),
        settings: ovpnctl_core::config::Settings::new().with_content("client\n"),
        ..Default::default()
    };

    let settings = config.resolve_settings().unwrap();
    assert_eq!(settings.content.as_deref(), Some("client\n"));
}

#[test]
fn test_missing_profile_file() {
    let config = ProfileConfig {
        profile_path: Some("/nonexistent/ovpnctl/client.ovpn".into()),
        ..Default::default()
    };

    let result = config.resolve_settings();
    assert!(matches!(
        result,
        Err(OvpnError::Config(ConfigError::LoadFailed { .. }))
    ));
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let result = load_config(Some(&dir.path().join("absent.toml")));

    assert!(matches!(
        result,
        Err(OvpnError::Config(ConfigError::LoadFailed { .. }))
    ));
}

#[test]
fn test_invalid_toml_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "profile_path = [unterminated");

    let result = ProfileConfig::from_file(&path);
    assert!(matches!(
        result,
        Err(OvpnError::Config(ConfigError::ValidationError { .. }))
    ));
}

#[test]
fn test_invalid_compression_mode_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "profile_path = \"/tmp/a.ovpn\"\n[settings]\ncompression_mode = \"sometimes\"\n",
    );

    assert!(ProfileConfig::from_file(&path).is_err());
}

#[test]
fn test_zero_stop_grace_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "profile_path = \"/tmp/a.ovpn\"\n[controller]\nstop_grace_secs = 0\n",
    );

    let err = ProfileConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("stop_grace_secs"));
}

#[test]
fn test_blank_username_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "profile_path = \"/tmp/a.ovpn\"\n[credentials]\nusername = \"  \"\n",
    );

    assert!(ProfileConfig::from_file(&path).is_err());
}

#[test]
fn test_secrets_are_not_written_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let config = ProfileConfig {
        profile_path: Some("/tmp/a.ovpn".into()),
        settings: ovpnctl_core::config::Settings::new()
            .with_proxy_host("proxy.example.com")
            .with_proxy_password("proxy-secret"),
        ..Default::default()
    };
    config.to_file(&path).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("proxy.example.com"));
    assert!(!written.contains("proxy-secret"));
}

#[test]
fn test_config_dir_override() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("OVPNCTL_CONFIG_DIR", dir.path());

    let path = get_config_path().unwrap();
    std::env::remove_var("OVPNCTL_CONFIG_DIR");

    assert_eq!(path, dir.path().join("config.toml"));
}

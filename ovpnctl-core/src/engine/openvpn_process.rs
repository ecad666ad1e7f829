//! Engine adapter driving an external `openvpn` binary
//!
//! Manages the openvpn process lifecycle from spawn to exit. All protocol
//! work happens inside openvpn; this adapter writes the profile and
//! secrets to a private temporary directory, maps settings onto command
//! line flags, forwards output to the observer and translates control
//! calls into signals.

use crate::config::{Credentials, Settings};
use crate::engine::{Engine, EngineFactory, EngineObserver, LogInfo, OutputParser, Status};
use crate::error::VpnError;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;

/// Default openvpn binary name, resolved through PATH
pub const DEFAULT_OPENVPN_BINARY: &str = "openvpn";

/// Files handed to openvpn for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFiles {
    pub profile: PathBuf,
    pub auth: Option<PathBuf>,
    pub proxy_auth: Option<PathBuf>,
    pub askpass: Option<PathBuf>,
}

/// Engine adapter for the openvpn command line client
pub struct OpenVpnProcessEngine {
    binary: PathBuf,
    observer: Arc<dyn EngineObserver>,
    parser: OutputParser,
    settings: Mutex<Option<Settings>>,
    credentials: Mutex<Option<Credentials>>,
    /// PID of the running openvpn process
    child_pid: Arc<Mutex<Option<u32>>>,
    stop_requested: AtomicBool,
    /// Pending soft restart; dropping the sender cancels it
    pending_restart: Mutex<Option<mpsc::Sender<()>>>,
    /// Private directory holding the profile and secret files
    workdir: Mutex<Option<TempDir>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn send_signal(pid: u32, signal: Signal) -> bool {
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => {
            tracing::debug!("Sent {:?} to openvpn process {}", signal, pid);
            true
        }
        Err(e) => {
            tracing::warn!("Failed to send {:?} to openvpn process {}: {}", signal, pid, e);
            false
        }
    }
}

fn write_private_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())?;
    file.flush()
}

/// Settings the openvpn command line cannot express
pub fn unsupported_fields(settings: &Settings) -> Vec<&'static str> {
    let mut fields = Vec::new();
    let checks: [(&'static str, bool); 14] = [
        ("non_preferred_dc_algorithms", settings.non_preferred_dc_algorithms.is_some()),
        ("disable_client_cert", settings.disable_client_cert.is_some()),
        ("clock_tick_ms", settings.clock_tick_ms.is_some()),
        ("retry_on_auth_failed", settings.retry_on_auth_failed.is_some()),
        ("allow_local_dns_resolvers", settings.allow_local_dns_resolvers.is_some()),
        ("allow_local_lan_access", settings.allow_local_lan_access.is_some()),
        ("alt_proxy", settings.alt_proxy.is_some()),
        ("external_pki_alias", settings.external_pki_alias.is_some()),
        ("gremlin_config", settings.gremlin_config.is_some()),
        ("google_dns_fallback", settings.google_dns_fallback.is_some()),
        ("hw_addr_override", settings.hw_addr_override.is_some()),
        ("sso_methods", settings.sso_methods.is_some()),
        ("tls_cert_profile_override", settings.tls_cert_profile_override.is_some()),
        ("wintun", settings.wintun.is_some()),
    ];
    for (name, set) in checks {
        if set {
            fields.push(name);
        }
    }
    fields
}

/// Map settings and session files onto openvpn command line arguments
pub fn build_args(settings: &Settings, credentials: Option<&Credentials>, files: &SessionFiles) -> Vec<String> {
    let mut args = vec!["--config".to_string(), files.profile.to_string_lossy().to_string()];

    if let Some(auth) = &files.auth {
        args.push("--auth-user-pass".to_string());
        args.push(auth.to_string_lossy().to_string());
    }

    if credentials.and_then(|c| c.cache_password) == Some(false) {
        args.push("--auth-nocache".to_string());
    }

    if let Some(askpass) = &files.askpass {
        args.push("--askpass".to_string());
        args.push(askpass.to_string_lossy().to_string());
    }

    if let Some(timeout) = settings.conn_timeout {
        args.push("--connect-timeout".to_string());
        args.push(timeout.to_string());
    }

    if let Some(mode) = settings.compression_mode {
        args.push("--allow-compression".to_string());
        args.push(mode.as_str().to_string());
    }

    if let Some(level) = settings.ssl_debug_level {
        // openvpn's default verbosity is 3; SSL debug levels stack on top
        args.push("--verb".to_string());
        args.push((3 + level.clamp(0, 8)).to_string());
    }

    if let Some(host) = &settings.proxy_host {
        args.push("--http-proxy".to_string());
        args.push(host.clone());
        args.push(settings.proxy_port.clone().unwrap_or_else(|| "8080".to_string()));
        if let Some(proxy_auth) = &files.proxy_auth {
            args.push(proxy_auth.to_string_lossy().to_string());
            args.push("basic".to_string());
        }
    }

    match (&settings.server_override, &settings.port_override) {
        (Some(server), Some(port)) => {
            args.push("--remote".to_string());
            args.push(server.clone());
            args.push(port.clone());
        }
        (Some(server), None) => {
            args.push("--remote".to_string());
            args.push(server.clone());
        }
        (None, Some(port)) => {
            args.push("--port".to_string());
            args.push(port.clone());
        }
        (None, None) => {}
    }

    if let Some(proto) = &settings.proto_override {
        args.push("--proto".to_string());
        args.push(proto.clone());
    }

    if let Some(ciphers) = &settings.tls_cipher_list {
        args.push("--tls-cipher".to_string());
        args.push(ciphers.clone());
    }

    if let Some(suites) = &settings.tls_ciphersuites_list {
        args.push("--tls-ciphersuites".to_string());
        args.push(suites.clone());
    }

    if let Some(version) = &settings.tls_version_min_override {
        args.push("--tls-version-min".to_string());
        args.push(version.clone());
    }

    if let Some(direction @ (0 | 1)) = settings.default_key_direction {
        args.push("--key-direction".to_string());
        args.push(direction.to_string());
    }

    if settings.tun_persist == Some(true) {
        args.push("--persist-tun".to_string());
    }

    if settings.dco == Some(false) {
        args.push("--disable-dco".to_string());
    }

    if settings.legacy_algorithms == Some(true) {
        args.push("--providers".to_string());
        args.push("legacy".to_string());
        args.push("default".to_string());
    }

    args
}

impl OpenVpnProcessEngine {
    /// Create an engine that runs `binary`
    pub fn new(binary: impl Into<PathBuf>, observer: Arc<dyn EngineObserver>) -> Self {
        Self {
            binary: binary.into(),
            observer,
            parser: OutputParser::new(),
            settings: Mutex::new(None),
            credentials: Mutex::new(None),
            child_pid: Arc::new(Mutex::new(None)),
            stop_requested: AtomicBool::new(false),
            pending_restart: Mutex::new(None),
            workdir: Mutex::new(None),
        }
    }

    /// Get the PID of the running openvpn process
    pub fn pid(&self) -> Option<u32> {
        *lock(&self.child_pid)
    }

    /// Whether a soft restart has been scheduled and not cancelled
    pub fn has_pending_restart(&self) -> bool {
        lock(&self.pending_restart).is_some()
    }

    fn cancel_pending_restart(&self) {
        if lock(&self.pending_restart).take().is_some() {
            tracing::debug!("Cancelling pending soft restart");
        }
    }

    /// Write the profile and secret files into a fresh private directory
    fn prepare_files(&self, settings: &Settings, credentials: Option<&Credentials>) -> Result<SessionFiles, VpnError> {
        let spawn_err = |what: &str, e: std::io::Error| VpnError::ProcessSpawnError {
            reason: format!("Failed to write {}: {}", what, e),
        };

        let dir = tempfile::Builder::new()
            .prefix("ovpnctl-")
            .tempdir()
            .map_err(|e| spawn_err("session directory", e))?;

        let mut files = SessionFiles {
            profile: dir.path().join("profile.ovpn"),
            ..Default::default()
        };
        write_private_file(&files.profile, settings.content.as_deref().unwrap_or_default())
            .map_err(|e| spawn_err("profile", e))?;

        if let Some(creds) = credentials.filter(|c| c.has_user_pass()) {
            let path = dir.path().join("auth.txt");
            let contents = format!(
                "{}\n{}\n",
                creds.username.as_deref().unwrap_or_default(),
                creds.password.as_ref().map(|p| p.expose()).unwrap_or_default()
            );
            write_private_file(&path, &contents).map_err(|e| spawn_err("auth file", e))?;
            files.auth = Some(path);
        }

        let proxy_user = credentials
            .and_then(|c| c.http_proxy_user.clone())
            .or_else(|| settings.proxy_username.clone());
        if let Some(user) = proxy_user {
            let password = credentials
                .and_then(|c| c.http_proxy_pass.clone())
                .or_else(|| settings.proxy_password.clone());
            let path = dir.path().join("proxy-auth.txt");
            let contents = format!(
                "{}\n{}\n",
                user,
                password.as_ref().map(|p| p.expose()).unwrap_or_default()
            );
            write_private_file(&path, &contents).map_err(|e| spawn_err("proxy auth file", e))?;
            files.proxy_auth = Some(path);
        }

        if let Some(password) = &settings.private_key_password {
            let path = dir.path().join("askpass.txt");
            write_private_file(&path, &format!("{}\n", password.expose()))
                .map_err(|e| spawn_err("askpass file", e))?;
            files.askpass = Some(path);
        }

        *lock(&self.workdir) = Some(dir);
        Ok(files)
    }

    /// Spawn openvpn and pump its output until it exits
    fn run_session(&self, settings: &Settings, credentials: Option<&Credentials>) -> Result<Status, VpnError> {
        let files = self.prepare_files(settings, credentials)?;
        let args = build_args(settings, credentials, &files);

        tracing::debug!("Spawning {:?} with {} argument(s)", self.binary, args.len());
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VpnError::ProcessSpawnError {
                reason: format!("Failed to spawn {}: {}", self.binary.display(), e),
            })?;

        let pid = child.id();
        *lock(&self.child_pid) = Some(pid);
        tracing::info!("openvpn process spawned with PID {}", pid);

        // A stop that raced the spawn must still end the session
        if self.stop_requested.load(Ordering::SeqCst) {
            send_signal(pid, Signal::SIGTERM);
        }

        let stderr_pump = child.stderr.take().map(|stderr| {
            let observer = Arc::clone(&self.observer);
            std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    observer.on_log(&LogInfo::new(line));
                }
            })
        });

        let mut fatal: Option<String> = None;
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                self.observer.on_log(&LogInfo::new(line.as_str()));
                if let Some(event) = self.parser.parse_line(&line) {
                    if event.fatal && fatal.is_none() {
                        fatal = Some(if event.name == "AUTH_FAILED" {
                            event.name.clone()
                        } else {
                            format!("{}: {}", event.name, event.info)
                        });
                    }
                    self.observer.on_event(&event);
                }
            }
        }

        let exit = child.wait().map_err(|e| VpnError::ProcessSpawnError {
            reason: format!("Failed to wait for openvpn: {}", e),
        })?;
        *lock(&self.child_pid) = None;

        if let Some(handle) = stderr_pump {
            let _ = handle.join();
        }

        tracing::info!("openvpn process {} exited with {}", pid, exit);

        // A fatal event outranks a stop that arrived during teardown
        let status = if let Some(reason) = fatal {
            Status::error(reason)
        } else if self.stop_requested.load(Ordering::SeqCst) {
            Status::ok_with("session stopped")
        } else if !exit.success() {
            Status::error(format!("openvpn exited with {}", exit))
        } else {
            Status::ok()
        };
        Ok(status)
    }
}

impl Engine for OpenVpnProcessEngine {
    fn evaluate(&self, settings: &Settings) -> Status {
        if !settings.has_content() {
            return Status::error("profile content is empty");
        }
        if let Some(timeout) = settings.conn_timeout {
            if timeout < 0 {
                return Status::error(format!("invalid connection timeout: {}", timeout));
            }
        }

        let ignored = unsupported_fields(settings);
        if !ignored.is_empty() {
            tracing::debug!("Settings not supported by openvpn, ignoring: {}", ignored.join(", "));
        }

        *lock(&self.settings) = Some(settings.clone());
        Status::ok()
    }

    fn provide_credentials(&self, credentials: &Credentials) -> Status {
        if credentials.password.is_some() && !credentials.has_user_pass() {
            return Status::error("password supplied without a username");
        }
        if credentials.response.is_some() || credentials.dynamic_challenge_cookie.is_some() {
            tracing::debug!("Challenge/response credentials are not supported by openvpn, ignoring");
        }

        *lock(&self.credentials) = Some(credentials.clone());
        Status::ok()
    }

    fn connect(&self) -> Status {
        let settings = match lock(&self.settings).clone() {
            Some(settings) => settings,
            None => return Status::error("configuration has not been evaluated"),
        };
        let credentials = lock(&self.credentials).clone();

        match self.run_session(&settings, credentials.as_ref()) {
            Ok(status) => status,
            Err(e) => Status::error(e.to_string()),
        }
    }

    fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.cancel_pending_restart();
        match self.pid() {
            Some(pid) => {
                tracing::info!("Stopping openvpn process {}", pid);
                send_signal(pid, Signal::SIGTERM);
            }
            None => tracing::debug!("Stop requested before openvpn was spawned"),
        }
    }

    fn pause(&self, reason: &str) {
        tracing::warn!("openvpn has no pause primitive, ignoring pause ({})", reason);
    }

    fn resume(&self) {
        tracing::warn!("openvpn has no resume primitive, ignoring resume");
    }

    /// Schedule a SIGUSR1 soft restart after `seconds`
    ///
    /// The timer thread wakes early and exits when the restart is
    /// superseded by another `reconnect` or cancelled by `stop`/`dispose`.
    fn reconnect(&self, seconds: u32) {
        let Some(pid) = self.pid() else {
            tracing::debug!("Reconnect requested with no running openvpn process");
            return;
        };

        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        // Replacing the sender cancels any earlier pending restart
        *lock(&self.pending_restart) = Some(cancel_tx);

        let child_pid = Arc::clone(&self.child_pid);
        std::thread::spawn(move || {
            match cancel_rx.recv_timeout(Duration::from_secs(u64::from(seconds))) {
                Err(RecvTimeoutError::Timeout) => {
                    // Skip if the process we meant to restart is gone
                    if *lock(&child_pid) == Some(pid) {
                        send_signal(pid, Signal::SIGUSR1);
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("Pending soft restart of openvpn process {} cancelled", pid);
                }
            }
        });
        tracing::info!("Soft restart of openvpn process {} scheduled in {}s", pid, seconds);
    }

    fn dispose(&self) {
        self.cancel_pending_restart();
        if let Some(dir) = lock(&self.workdir).take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!("Failed to remove session directory {:?}: {}", path, e);
            }
        }
    }
}

/// Creates [`OpenVpnProcessEngine`]s for a given binary
#[derive(Debug, Clone)]
pub struct OpenVpnProcessFactory {
    binary: PathBuf,
}

impl OpenVpnProcessFactory {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for OpenVpnProcessFactory {
    fn default() -> Self {
        Self::new(DEFAULT_OPENVPN_BINARY)
    }
}

impl EngineFactory for OpenVpnProcessFactory {
    type Engine = OpenVpnProcessEngine;

    fn create(&self, observer: Arc<dyn EngineObserver>) -> Result<Self::Engine, VpnError> {
        Ok(OpenVpnProcessEngine::new(self.binary.clone(), observer))
    }
}

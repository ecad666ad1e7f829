//! Tests for the openvpn process engine against a fake openvpn executable

#![cfg(unix)]

use ovpnctl_core::config::{Credentials, Settings};
use ovpnctl_core::engine::{
    ChannelObserver, Engine, EngineFactory, Notification, OpenVpnProcessEngine,
    OpenVpnProcessFactory,
};
use ovpnctl_core::session::SessionController;
use ovpnctl_core::CancellationToken;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

// Writing an executable while another thread forks can fail with ETXTBSY
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

fn fake_openvpn(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("openvpn");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn engine_for(body: &str) -> (TempDir, OpenVpnProcessEngine, UnboundedReceiver<Notification>) {
    let dir = TempDir::new().unwrap();
    let binary = fake_openvpn(&dir, body);
    let (observer, notifications) = ChannelObserver::channel();
    let engine = OpenVpnProcessFactory::new(binary)
        .create(Arc::new(observer))
        .unwrap();
    (dir, engine, notifications)
}

fn drain(notifications: &mut UnboundedReceiver<Notification>) -> (Vec<String>, Vec<String>) {
    let mut logs = Vec::new();
    let mut events = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        match notification {
            Notification::Log(log) => logs.push(log.text),
            Notification::Event(event) => events.push(event.name),
        }
    }
    (logs, events)
}

fn profile() -> Settings {
    Settings::new().with_content("client\nremote vpn.example.com 1194\n")
}

#[test]
fn test_clean_exit_reports_success_and_events() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let (_dir, engine, mut notifications) = engine_for(
        "echo 'Peer Connection Initiated with [AF_INET]203.0.113.7:1194'\n\
         echo 'Initialization Sequence Completed'\n\
         exit 0",
    );

    assert!(!engine.evaluate(&profile()).is_error);
    let status = engine.connect();
    engine.dispose();

    assert!(!status.is_error, "unexpected error: {}", status.message);
    let (_logs, events) = drain(&mut notifications);
    assert_eq!(events, vec!["CONNECTING", "CONNECTED"]);
}

#[test]
fn test_auth_failure_is_reported() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let (_dir, engine, _notifications) = engine_for(
        "echo 'AUTH: Received control message: AUTH_FAILED'\n\
         echo 'SIGTERM[soft,auth-failure] received, process exiting'\n\
         exit 1",
    );

    engine.evaluate(&profile());
    engine.provide_credentials(&Credentials::new().with_username("u").with_password("p"));
    let status = engine.connect();
    engine.dispose();

    assert!(status.is_error);
    assert_eq!(status.message, "AUTH_FAILED");
}

#[test]
fn test_late_stop_does_not_mask_fatal_error() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    // Reports the failure, closes stdout, then lingers before exiting
    let (_dir, engine, _notifications) = engine_for(
        "echo 'AUTH: Received control message: AUTH_FAILED'\n\
         echo 'SIGTERM[soft,auth-failure] received, process exiting'\n\
         exec >&-\n\
         sleep 0.4\n\
         exit 1",
    );
    engine.evaluate(&profile());

    let status = std::thread::scope(|scope| {
        scope.spawn(|| {
            std::thread::sleep(Duration::from_millis(200));
            engine.stop();
        });
        engine.connect()
    });
    engine.dispose();

    assert!(status.is_error, "stop during teardown hid the failure: {:?}", status);
    assert_eq!(status.message, "AUTH_FAILED");
}

#[test]
fn test_stop_cancels_pending_restart() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let (_dir, engine, mut notifications) = engine_for(
        "trap 'echo \"SIGUSR1[soft,user] received, process restarting\"' USR1\n\
         trap 'exit 0' TERM\n\
         echo 'Initialization Sequence Completed'\n\
         while true; do sleep 0.05; done",
    );
    engine.evaluate(&profile());

    let status = std::thread::scope(|scope| {
        scope.spawn(|| {
            while engine.pid().is_none() {
                std::thread::sleep(Duration::from_millis(5));
            }
            // Give the shell time to install its traps
            std::thread::sleep(Duration::from_millis(100));

            engine.reconnect(0);
            std::thread::sleep(Duration::from_millis(300));

            engine.reconnect(3600);
            let scheduled = engine.has_pending_restart();
            engine.stop();
            assert!(scheduled);
            assert!(!engine.has_pending_restart());
        });
        engine.connect()
    });
    engine.dispose();

    assert!(!status.is_error);
    let (_logs, events) = drain(&mut notifications);
    assert_eq!(
        events.iter().filter(|name| *name == "RECONNECTING").count(),
        1,
        "Only the immediate restart fires: {:?}",
        events
    );
}

#[test]
fn test_nonzero_exit_is_an_error() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let (_dir, engine, _notifications) = engine_for("exit 3");

    engine.evaluate(&profile());
    let status = engine.connect();
    engine.dispose();

    assert!(status.is_error);
    assert!(status.message.starts_with("openvpn exited with"));
}

#[test]
fn test_auth_file_is_private() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let (_dir, engine, mut notifications) = engine_for(
        "while [ $# -gt 0 ]; do\n\
           if [ \"$1\" = \"--auth-user-pass\" ]; then stat -c 'mode=%a' \"$2\"; head -n 1 \"$2\"; fi\n\
           shift\n\
         done",
    );

    engine.evaluate(&profile());
    engine.provide_credentials(&Credentials::new().with_username("alice").with_password("p"));
    let status = engine.connect();
    engine.dispose();

    assert!(!status.is_error);
    let (logs, _events) = drain(&mut notifications);
    assert!(logs.contains(&"mode=600".to_string()), "logs: {:?}", logs);
    assert!(logs.contains(&"alice".to_string()));
}

#[test]
fn test_cancellation_through_controller_stops_process() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let (_dir, engine, _notifications) = engine_for(
        "trap 'echo \"SIGTERM[hard,] received, process exiting\"; exit 0' TERM\n\
         echo 'Initialization Sequence Completed'\n\
         while true; do sleep 0.05; done",
    );

    tokio_test::block_on(async move {
        let mut controller = SessionController::new(engine);
        controller.evaluate(profile()).unwrap();

        let cancel = CancellationToken::new();
        controller.start(cancel.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), controller.wait())
            .await
            .expect("openvpn should exit after SIGTERM");
        assert_eq!(outcome, Ok(()), "A requested stop is not a failure");

        controller.dispose().await;
    });
}

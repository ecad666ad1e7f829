//! Connect command
//!
//! Runs one supervised session. Ctrl-C and the optional session duration
//! both fire the same cancellation token; the session outcome is reported
//! once the engine has wound down.

use crate::cli::{prepare, ConnectArgs};
use colored::Colorize;
use ovpnctl_core::engine::{OpenVpnProcessFactory, TracingObserver};
use ovpnctl_core::error::{OvpnError, VpnError};
use ovpnctl_core::session::SessionController;
use ovpnctl_core::CancellationToken;
use std::sync::Arc;
use tracing::{error, info};

/// Run the connect command
pub async fn run_connect(args: &ConnectArgs) -> Result<(), OvpnError> {
    let session = prepare(&args.profile)?;

    let mut settings = session.settings;
    if let Some(timeout) = args.timeout {
        settings = settings.with_conn_timeout(timeout);
    }

    let factory = OpenVpnProcessFactory::new(&session.binary);
    let mut controller = SessionController::from_factory(&factory, Arc::new(TracingObserver))?;

    controller.evaluate(settings)?;
    controller.provide_credentials(session.credentials)?;

    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            ctrl_c.cancel();
        }
    });

    if let Some(duration) = args
        .duration
        .map(std::time::Duration::from_secs)
        .or_else(|| session.controller.session_duration())
    {
        let expiry = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            info!("Session duration of {}s reached", duration.as_secs());
            expiry.cancel();
        });
    }

    controller.start(cancel.clone())?;
    println!(
        "{} Session started with {} (press Ctrl-C to disconnect)",
        "●".green(),
        session.binary.display()
    );

    let finished = tokio::select! {
        outcome = controller.wait() => Some(outcome),
        _ = cancel.cancelled() => None,
    };

    let outcome = match finished {
        Some(outcome) => outcome,
        None => {
            let grace = session.controller.stop_grace();
            println!("{} Disconnecting...", "●".yellow());
            controller.wait_timeout(grace).await
        }
    };

    if let Err(VpnError::WaitTimeout { .. }) = &outcome {
        // The worker is still blocked in connect; dispose would wait for it
        error!(
            "openvpn (pid {:?}) did not exit within {}s",
            controller.engine().pid(),
            session.controller.stop_grace_secs
        );
        println!("{} openvpn did not stop in time", "✗".red());
        return outcome.map_err(OvpnError::from);
    }

    controller.dispose().await;

    match outcome {
        Ok(()) => {
            println!("{} Session ended", "✓".green());
            Ok(())
        }
        Err(e) => {
            println!("{} Session failed", "✗".red());
            Err(e.into())
        }
    }
}

//! Check command
//!
//! Evaluates the profile and credentials through the engine without
//! connecting.

use crate::cli::{prepare, ProfileArgs};
use colored::Colorize;
use ovpnctl_core::engine::openvpn_process::unsupported_fields;
use ovpnctl_core::engine::{OpenVpnProcessFactory, TracingObserver};
use ovpnctl_core::error::OvpnError;
use ovpnctl_core::session::SessionController;
use std::sync::Arc;

/// Run the check command
pub async fn run_check(args: &ProfileArgs) -> Result<(), OvpnError> {
    let session = prepare(args)?;

    // A missing binary only matters for connect
    match which::which(&session.binary) {
        Ok(path) => println!("{} openvpn binary: {}", "✓".green(), path.display()),
        Err(e) => println!(
            "{} openvpn binary {} not usable: {}",
            "!".yellow(),
            session.binary.display(),
            e
        ),
    }

    let ignored = unsupported_fields(&session.settings);
    if !ignored.is_empty() {
        println!(
            "{} Ignored by openvpn: {}",
            "!".yellow(),
            ignored.join(", ")
        );
    }

    let has_user_pass = session.credentials.has_user_pass();
    let factory = OpenVpnProcessFactory::new(&session.binary);
    let controller = SessionController::from_factory(&factory, Arc::new(TracingObserver))?;

    let result = controller
        .evaluate(session.settings)
        .and_then(|()| {
            println!("{} Profile accepted", "✓".green());
            controller.provide_credentials(session.credentials)
        });
    controller.dispose().await;
    result?;

    if has_user_pass {
        println!("{} Credentials accepted", "✓".green());
    } else {
        println!("{} No username configured", "-".dimmed());
    }
    Ok(())
}

//! ovpnctl - OpenVPN session supervisor
//!
//! Loads a client profile, runs the VPN engine under a session controller
//! and reports exactly one outcome per session.

use clap::{Parser, Subcommand};
use ovpnctl_core::error::{OvpnError, VpnError};
use ovpnctl_core::init_logging;
use std::path::PathBuf;

mod cli;

use cli::{ConnectArgs, ProfileArgs};

#[derive(Parser)]
#[command(name = "ovpnctl")]
#[command(about = "Supervise OpenVPN client sessions with cooperative cancellation")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and supervise a session until it ends or Ctrl-C is pressed
    Connect(ConnectArgs),
    /// Evaluate the profile and credentials without connecting
    Check(ProfileArgs),
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Configuration file (defaults to ~/.config/ovpnctl/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a new configuration file pointing at a profile
    Init {
        /// Path to the .ovpn profile
        profile: PathBuf,

        /// Username to store in the configuration
        #[arg(long)]
        username: Option<String>,

        /// Configuration file to write
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn exit_code(error: &OvpnError) -> i32 {
    match error {
        // Configuration errors (exit code 2)
        OvpnError::Config(_) | OvpnError::Toml(_) | OvpnError::TomlSerialize(_) => 2,
        // The engine refusing the profile or credentials is a setup problem too
        OvpnError::Vpn(VpnError::ConfigRejected { .. })
        | OvpnError::Vpn(VpnError::CredentialsRejected { .. }) => 2,
        // Session and runtime failures (exit code 1)
        OvpnError::Vpn(_) | OvpnError::Io(_) => 1,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let result = match cli.command {
        Commands::Connect(args) => cli::connect::run_connect(&args).await,
        Commands::Check(args) => cli::check::run_check(&args).await,
        Commands::Config { action } => match action {
            ConfigCommands::Show { config } => cli::config::run_config_show(config.as_deref()),
            ConfigCommands::Init {
                profile,
                username,
                config,
                force,
            } => cli::config::run_config_init(&profile, username, config.as_deref(), force),
        },
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

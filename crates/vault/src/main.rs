//! `vault`: operator entry point for the GOST primitives.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Load and validate [`Config`] from environment variables.
//! 3. Initialise structured logging on stderr.
//! 4. Run the subcommand. Commands that touch ciphertext provision the RSA
//!    keypair first (load from `RSA_KEY_FILE` or generate).
//!
//! On failure a JSON [`ErrorOutput`] is printed to stdout and the process
//! exits with [`ServiceError::exit_code`].

mod cli;
mod config;
mod keys;
mod selftest;
mod service;
mod telemetry;

use std::process::ExitCode;

use clap::Parser;
use common::protocol::ErrorOutput;
use common::ServiceError;
use tracing::{error, info};

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e:#}");
            return report(ServiceError::Internal(format!("configuration invalid: {e:#}")));
        }
    };

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    if let Err(e) = telemetry::init_telemetry(&cfg.log_level) {
        eprintln!("ERROR: {e:#}");
        return report(ServiceError::Internal(format!("{e:#}")));
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = cli.command.name(),
        "vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Command
    // -----------------------------------------------------------------------
    match cli::run(cli.command, cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), error = %e, "command failed");
            report(e)
        }
    }
}

fn report(e: ServiceError) -> ExitCode {
    let out = ErrorOutput::new(e.code(), e.to_string());
    match serde_json::to_string(&out) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{{\"code\":\"{}\"}}", e.code()),
    }
    ExitCode::from(e.exit_code())
}

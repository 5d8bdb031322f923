//! Taskdeck - a command-line client for the task API.
//!
//! Logs in, keeps the session between runs, and lists, creates, updates, and
//! deletes tasks. Expired access tokens are renewed transparently; when the
//! session cannot be renewed the user is asked to log in again.

mod cli;
mod commands;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use taskdeck_core::{ApiError, Config};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Log file name inside the cache directory
const LOG_FILE: &str = "taskdeck.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard must stay alive for the file writer to flush.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config ({}), using defaults", e);
            Config::default()
        }
    };
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = url;
    }

    let log_dir = config
        .cache_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let _guard = init_tracing(log_dir.as_deref());
    info!(api = %config.api_base_url, storage = ?config.storage, "Taskdeck starting");

    match run(cli, &mut config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &mut Config) -> Result<()> {
    let client = config.api_client()?;
    debug!(authenticated = client.is_authenticated(), "Session loaded");
    commands::run(cli.command, &client, config).await
}

/// Print an error the way a login form would show it.
fn report(e: &anyhow::Error) {
    match e.downcast_ref::<ApiError>() {
        Some(api_error) if api_error.requires_login() => {
            warn!(error = %api_error, "Session could not be renewed");
            eprintln!("{}", api_error.user_message());
            eprintln!("Run `taskdeck login` to continue.");
        }
        Some(api_error) => {
            error!(error = %api_error, "Request failed");
            eprintln!("Error: {}", api_error.user_message());
        }
        None => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
        }
    }
}

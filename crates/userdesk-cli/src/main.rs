//! userdesk - a terminal client for the user-management service.
//!
//! Signs in against the API, keeps the session across runs and drives the
//! profile and user administration endpoints. Every command is checked by
//! the navigation guard before it runs.

mod cli;
mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use userdesk_core::{ApiClient, Config};

/// Initialize the tracing subscriber for logging.
/// Returns the guard that flushes the file log, when one is configured.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "userdesk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
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
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Cli::parse();
    let log_guard = init_tracing(args.log_dir.as_deref());

    let mut config = Config::load()?;
    if let Some(ref url) = args.base_url {
        config.base_url = url.clone();
    }
    if let Some(ref storage) = args.storage {
        config.storage = storage.parse()?;
    }
    info!(base_url = %config.base_url, storage = ?config.storage, "userdesk starting");

    let client = ApiClient::new(&config)?;
    let mut events = client.subscribe();

    let result = commands::run(&client, &mut config, args.command).await;

    // Notices and session expiry raised while the command ran
    commands::report_events(&mut events);

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        // Flush the file log before exiting
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}

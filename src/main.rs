//! respcache server entry point.
//!
//! Sets up logging, the shared cache and the TCP listener, then hands every
//! accepted connection to its own task.

use respcache::commands::CommandHandler;
use respcache::config::{CliAction, Config};
use respcache::connection::{handle_connection, ConnectionStats};
use respcache::storage::Cache;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn print_help() {
    println!(
        r#"
respcache - A small in-memory cache speaking the Redis protocol

USAGE:
    respcache [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>    Port to listen on (default: 6379)
    -v, --version        Print version information
        --help           Print this help message

LOGGING:
    Set RUST_LOG to change verbosity, e.g. RUST_LOG=respcache=debug

CONNECTING:
    $ redis-cli -p 6379
    127.0.0.1:6379> SET name "Ariz" PX 5000
    OK
    127.0.0.1:6379> GET name
    "Ariz"
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            print_help();
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("respcache version {}", respcache::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Shared by every connection for the life of the process
    let cache = Arc::new(Cache::new());
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(
        version = respcache::VERSION,
        address = %config.bind_address(),
        "respcache ready to accept connections"
    );

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&cache), stats) => {}
        _ = shutdown => {}
    }

    info!(stats = ?cache.stats(), "Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, cache: Arc<Cache>, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&cache));
                let stats = Arc::clone(&stats);

                tokio::spawn(handle_connection(stream, addr, handler, stats));
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}

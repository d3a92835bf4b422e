//! Murmur relay binary.
//!
//! # Usage
//!
//! ```bash
//! murmur-relay --bind 127.0.0.1:8080
//! RUST_LOG=murmur_server=debug murmur-relay --max-envelope-bytes 16384
//! ```

use clap::Parser;
use murmur_server::{DEFAULT_MAX_ENVELOPE_BYTES, RelayConfig, Server};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Murmur relay server
#[derive(Parser, Debug)]
#[command(name = "murmur-relay")]
#[command(about = "Store-and-forward relay for Murmur encrypted envelopes")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Largest accepted envelope (nonce + ciphertext) in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_ENVELOPE_BYTES)]
    max_envelope_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Murmur relay starting");
    tracing::info!("Binding to {}", args.bind);

    let config =
        RelayConfig { bind_address: args.bind, max_envelope_bytes: args.max_envelope_bytes };

    let server = Server::bind(config).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}

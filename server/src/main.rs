use clap::Parser;
use env_logger::Env;
use log::info;
use server::catalog::Catalog;
use server::config::GameConfig;
use server::network::Server;
use shared::CLIENT_TIMEOUT_SECS;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Maximum number of simultaneous connections
    #[clap(short, long, default_value = "16")]
    max_clients: usize,
    /// Players required before a game can start
    #[clap(long, default_value_t = shared::MIN_PLAYERS)]
    min_players: usize,
    /// Rune balance every player starts with
    #[clap(long, default_value_t = shared::START_RUNES)]
    start_runes: u32,
    /// Fixed seed for board generation and every random roll
    #[clap(long)]
    seed: Option<u64>,
    /// JSON catalog replacing the built-in entity definitions
    #[clap(long)]
    catalog: Option<PathBuf>,
}

/// Parses command-line arguments, loads the catalog and serves games until
/// the listener fails or Ctrl+C is received.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => {
            info!("Loading catalog from {}", path.display());
            Catalog::load(path)?
        }
        None => Catalog::embedded()?,
    };

    let config = GameConfig {
        min_players: args.min_players,
        start_runes: args.start_runes,
        seed: args.seed,
        ..GameConfig::default()
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(
        &address,
        args.max_clients,
        Duration::from_secs(CLIENT_TIMEOUT_SECS),
        config,
        Arc::new(catalog),
    )
    .await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

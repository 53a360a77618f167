//! replica-router command line.
//!
//! ```text
//!   config (TOML + env)
//!        │
//!        ▼
//!   ┌──────────────┐   execute()   ┌──────────┐
//!   │ ReplicaRouter│──────────────▶│ primary  │◀── writes, forced reads,
//!   │              │               └──────────┘    fallback retries
//!   │   health ◀───┼── monitor ──┐ ┌──────────┐
//!   │   state      │             └▶│ replica  │◀── reads while healthy
//!   └──────────────┘               └──────────┘
//! ```
//!
//! Subcommands:
//! - `validate`: load and validate configuration only
//! - `check`: connect, run one replica health check, print it as JSON
//! - `monitor`: connect and log replica health until Ctrl+C

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use replica_router::config::{load_config, loader::config_from_env, RouterConfig};
use replica_router::observability::{logging, metrics};
use replica_router::{PgConnector, ReplicaRouter};

#[derive(Parser)]
#[command(name = "replica-router")]
#[command(about = "Primary/replica database routing diagnostics", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Falls back to environment variables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate configuration
    Validate,
    /// Run a single replica health check
    Check,
    /// Continuously monitor replica health
    Monitor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };

    logging::init_tracing(&config.observability.log_level);
    tracing::info!(
        replica_configured = config.database.replica_url.is_some(),
        use_read_replica = config.database.use_read_replica,
        max_replication_lag_ms = config.replica.max_replication_lag_ms,
        health_check_interval_ms = config.replica.health_check_interval_ms,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Validate => {
            println!("configuration OK");
        }
        Commands::Check => {
            // No background monitor: the forced check below is the only one.
            let connector = PgConnector::new(config.database.max_connections);
            let router = ReplicaRouter::open(&config, &connector).await?;
            let status = router.refresh_replica_health().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
            router.shutdown().await;
        }
        Commands::Monitor => monitor(&config).await?,
    }

    Ok(())
}

async fn monitor(config: &RouterConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = ReplicaRouter::from_config(config).await?;
    let mut ticker = tokio::time::interval(config.replica.thresholds().health_check_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = router.get_replica_health();
                tracing::info!(
                    healthy = status.healthy,
                    lag_ms = status.lag.map(|lag| lag.as_millis() as u64),
                    consecutive_failures = status.consecutive_failures,
                    last_check = %status.last_check,
                    "Replica health"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    router.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

//! Active-standby database connection router (daemon mode).
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                      ROUTER                      │
//!                    │                                                  │
//!   acquire_         │  ┌───────────────┐       ┌───────────────────┐  │
//!   connection() ────┼─▶│ FailoverState │──────▶│ primary pool      │──┼──▶ Primary DB
//!                    │  │   (ArcSwap)   │   or  ├───────────────────┤  │
//!                    │  └───────▲───────┘──────▶│ standby pool      │──┼──▶ Standby DB
//!                    │          │               └─────────▲─────────┘  │
//!                    │          │ swap                    │ probe      │
//!                    │  ┌───────┴─────────────────────────┴─────────┐  │
//!                    │  │        health monitor (every 5 s)         │  │
//!                    │  └───────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────┘
//! ```
//!
//! Runs the router with the TCP connector, reports its status periodically
//! and shuts down cleanly on SIGINT/SIGTERM.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use db_failover_router::config::loader::load_config;
use db_failover_router::lifecycle::signals::wait_for_signal;
use db_failover_router::observability::{logging, metrics};
use db_failover_router::{Router, TcpConnector};

#[derive(Parser)]
#[command(name = "db-failover-router")]
#[command(about = "Active-standby database connection router", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "router.toml")]
    config: PathBuf,

    /// Seconds between status reports.
    #[arg(long, default_value_t = 30)]
    status_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability.log_level)?;
    tracing::info!("db-failover-router v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        primary = %config.primary.address,
        standby = %config.standby.address,
        interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = Router::start(config, TcpConnector).await?;

    let mut report = tokio::time::interval(Duration::from_secs(cli.status_secs.max(1)));
    let signal = wait_for_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => break,
            _ = report.tick() => {
                let status = router.status();
                tracing::info!(
                    state = %status.state,
                    primary_in_use = status.primary.in_use,
                    primary_idle = status.primary.idle,
                    standby_in_use = status.standby.in_use,
                    standby_idle = status.standby.idle,
                    last_probe_healthy = status.last_check.as_ref().map(|c| c.healthy),
                    "Router status"
                );
            }
        }
    }

    router.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

//! request-shield service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Proxy / app          ┌──────────────────────────────────────────────┐
//!     POST /v1/validate ──▶│  http::server ──▶ Shield::validate            │
//!                          │                    │                          │
//!                          │   access lists ─▶ rate limit ─▶ reputation    │
//!                          │   ─▶ behavior ─▶ geo ─▶ content ─▶ Decision   │
//!     Decision JSON ◀──────│                                               │
//!                          │  admin (bearer)   maintenance (ticks)         │
//!                          └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use request_shield::config::{self, ShieldConfig};
use request_shield::lifecycle::{signals, Maintenance, Shutdown};
use request_shield::observability::{logging, metrics};
use request_shield::{HttpServer, Shield};

#[derive(Parser)]
#[command(name = "request-shield")]
#[command(about = "Request admission control and DDoS mitigation service", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    validate: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", config::loader::example_config());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => {
            let config = ShieldConfig::default();
            config::validate_config(&config).map_err(config::ConfigError::Validation)?;
            config
        }
    };

    if args.validate {
        println!("Configuration is valid");
        return Ok(());
    }

    logging::init(&config.observability)?;
    tracing::info!("request-shield v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        geo_blocking = config.response.enable_geo_blocking,
        admin = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let maintenance_config = config.maintenance.clone();
    let shield = Arc::new(Shield::from_config(config)?);

    let shutdown = Arc::new(Shutdown::new());
    let maintenance = tokio::spawn(
        Maintenance::new(shield.clone(), &maintenance_config).run(shutdown.subscribe()),
    );

    let server = HttpServer::new(shield);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait().await;
    shutdown.trigger();

    server_task.await??;
    maintenance.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

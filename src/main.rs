//! Site router.
//!
//! Serves many builds of one static site (production plus previews) out of a
//! single content-addressed bucket.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────────────────────────────────────────────────────┐
//!                  │                        SITE ROUTER                         │
//!                  │                                                            │
//!   Request        │  ┌────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐  │
//!   ───────────────┼─▶│  http  │──▶│ routing  │──▶│ manifest │──▶│  routing  │  │
//!   (host, path)   │  │ server │   │  tenant  │   │  cache   │   │   rules   │  │
//!                  │  └────────┘   └──────────┘   └────┬─────┘   └─────┬─────┘  │
//!                  │                                   │               │        │
//!                  │                                   ▼               ▼        │
//!   Response       │  ┌──────────┐                ┌─────────────────────────┐   │
//!   ◀──────────────┼──│ response │◀───────────────│  storage (fs / http)    │◀──┼── Bucket
//!   (blob, 304)    │  │ builder  │                │  manifests/, blobs/     │   │
//!                  │  └──────────┘                └─────────────────────────┘   │
//!                  │                                                            │
//!                  │  config (TOML, hot reload) · observability · lifecycle     │
//!                  └────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use site_router::config::{load_config, ConfigWatcher, RouterConfig};
use site_router::lifecycle::{signals, Shutdown};
use site_router::net::tls;
use site_router::observability::{logging, metrics};
use site_router::HttpServer;

#[derive(Parser)]
#[command(name = "site-router")]
#[command(about = "Edge router for content-addressed static-site builds", long_about = None)]
struct Args {
    /// Path to the TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("site-router v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        production_domain = %config.site.production_domain,
        store_timeout_secs = config.timeouts.store_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload only when running from a file
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let tls_config = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let serve = async {
        match tls_config {
            Some(tls_paths) => {
                let rustls = tls::load_tls_config(
                    Path::new(&tls_paths.cert_path),
                    Path::new(&tls_paths.key_path),
                )
                .await?;
                server.run_tls(rustls, config_updates, server_shutdown).await
            }
            None => {
                let listener = TcpListener::bind(&bind_address).await?;
                tracing::info!(address = %listener.local_addr()?, "Listening for connections");
                server.run(listener, config_updates, server_shutdown).await
            }
        }
    };

    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => result?,
        _ = signals::shutdown_on_signal(&shutdown) => {
            tracing::info!("Waiting for in-flight requests");
            serve.await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use site_router::config::{load_config, RouterConfig};
use site_router::manifest::{ManifestCache, SystemClock};
use site_router::routing::{resolve_with_rule, TenantResolver};
use site_router::storage::Storage;

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Inspect how the site router resolves hosts and paths", long_about = None)]
struct Cli {
    /// Router config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the build id a hostname routes to
    Tenant {
        #[arg(long)]
        host: String,
    },
    /// Resolve a host and path to a manifest entry
    Resolve {
        #[arg(long)]
        host: String,
        #[arg(long, default_value = "/")]
        path: String,
    },
    /// Summarize a build's manifest
    Manifest {
        #[arg(long)]
        build: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };

    let tenants = TenantResolver::new(&config.site.production_domain);

    match cli.command {
        Commands::Tenant { host } => {
            println!("{}", tenants.resolve(&host));
        }
        Commands::Resolve { host, path } => {
            let cache = manifest_cache(&config)?;
            let build_id = tenants.resolve(&host);
            let output = match cache.get(&build_id).await {
                Ok(manifest) => match resolve_with_rule(&path, &manifest) {
                    Some(resolution) => json!({
                        "build": build_id,
                        "rule": resolution.rule.as_str(),
                        "entry": resolution.entry,
                    }),
                    None => json!({ "build": build_id, "error": "Not found" }),
                },
                Err(e) => json!({
                    "build": build_id,
                    "status": e.status().as_u16(),
                    "error": e.public_message(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Manifest { build } => {
            let cache = manifest_cache(&config)?;
            let manifest = cache.get(&build).await?;
            let output = json!({
                "build": build,
                "entries": manifest.len(),
                "total_size": manifest.total_size(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn manifest_cache(config: &RouterConfig) -> Result<ManifestCache, Box<dyn std::error::Error>> {
    let storage = Storage::from_config(&config.storage)?;
    Ok(ManifestCache::new(
        storage.manifests,
        Arc::new(SystemClock),
        Duration::from_secs(config.timeouts.store_secs),
    ))
}

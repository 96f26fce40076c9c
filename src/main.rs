use anyhow::{Context, Result};
use clap::Parser;
use slopemap::config::{ServerConfig, StoreBackend};
use slopemap::{logging, server};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "slopemap")]
#[command(about = "Route service: upload, list and fetch GPS slope logs", long_about = None)]
struct Args {
    /// TOML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    bind: Option<IpAddr>,

    #[arg(long)]
    port: Option<u16>,

    /// Only origin allowed by CORS
    #[arg(long)]
    cors_origin: Option<String>,

    /// Route store backend
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,

    /// Directory for the file store
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(origin) = self.cors_origin {
            config.cors_origin = origin;
        }
        if let Some(store) = self.store {
            config.store = store;
        }
        if let Some(dir) = self.store_dir {
            config.store_dir = dir;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let config = Args::parse().into_config()?;

    log::info!(
        "Starting route service ({:?} store, CORS origin {})",
        config.store,
        config.cors_origin
    );
    let store = config.open_store()?;
    let app = server::router(store, &config.cors_origin).context("Invalid CORS origin")?;

    server::serve(app, config.socket_addr())
        .await
        .with_context(|| format!("Server on {} failed", config.socket_addr()))?;
    Ok(())
}

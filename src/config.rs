use crate::store::{FileRouteStore, MemoryRouteStore, RouteStore};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_CORS_ORIGIN: &str = "https://slopemap-13158.web.app";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

/// Route service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub cors_origin: String,
    pub store: StoreBackend,
    pub store_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            store: StoreBackend::Memory,
            store_dir: PathBuf::from("routes"),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn open_store(&self) -> Result<Arc<dyn RouteStore>> {
        match self.store {
            StoreBackend::Memory => Ok(Arc::new(MemoryRouteStore::new())),
            StoreBackend::File => {
                let store = FileRouteStore::open(&self.store_dir).with_context(|| {
                    format!("Failed to open route store {}", self.store_dir.display())
                })?;
                Ok(Arc::new(store))
            }
        }
    }
}

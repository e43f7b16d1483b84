//! Everything a command needs to open provider sessions: config, keys,
//! schema lookup and a shared transport.

use std::sync::Arc;

use anyhow::{Context, Result};

use unillm_core::config::{load_config, Config};
use unillm_core::TieredKeyStore;
use unillm_providers::http_transport::DEFAULT_TIMEOUT;
use unillm_providers::{create_provider, ChainedSchemaSource, HttpTransport, SchemaProvider, Transport};

pub struct Runtime {
    pub config: Config,
    pub keys: TieredKeyStore,
    pub source: ChainedSchemaSource,
    transport: Arc<dyn Transport>,
}

impl Runtime {
    /// Load `~/.unillm/config.json` (plus env overrides) and wire everything up.
    pub fn load() -> Result<Self> {
        Self::from_config(load_config(None))
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(DEFAULT_TIMEOUT).context("failed to create HTTP transport")?;
        Ok(Self {
            keys: TieredKeyStore::from_config(&config),
            source: ChainedSchemaSource::from_config(&config.schemas),
            transport: Arc::new(transport),
            config,
        })
    }

    /// Provider named on the command line, else the configured default.
    pub fn provider_name(&self, requested: Option<&str>) -> String {
        requested
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.config.defaults.provider.clone())
    }

    /// Open a fresh session with `name`.
    pub async fn open(&self, name: &str) -> Result<SchemaProvider> {
        create_provider(name, &self.config, &self.source, &self.keys, self.transport.clone())
            .await
            .with_context(|| format!("failed to set up provider '{name}'"))
    }
}

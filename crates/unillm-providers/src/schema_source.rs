//! Schema sources beyond the built-in registry: a local directory, a remote
//! base URL, and a chain that tries several in order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use unillm_core::config::schema::SchemasConfig;
use unillm_core::utils::expand_home;
use unillm_core::Schema;

use crate::error::SchemaSourceError;
use crate::registry::BuiltinSchemas;
use crate::traits::SchemaSource;

/// Provider names become file and URL segments; keep them to one plain segment.
fn is_plain_name(provider: &str) -> bool {
    !provider.is_empty()
        && provider
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !provider.starts_with('.')
}

// ─────────────────────────────────────────────
// Directory
// ─────────────────────────────────────────────

/// Reads `<dir>/<provider>.json`.
#[derive(Clone, Debug)]
pub struct FileSchemaSource {
    dir: PathBuf,
}

impl FileSchemaSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SchemaSource for FileSchemaSource {
    async fn load(&self, provider: &str) -> Result<Schema, SchemaSourceError> {
        if !is_plain_name(provider) {
            return Err(SchemaSourceError::NotFound(provider.to_string()));
        }
        let path = self.dir.join(format!("{provider}.json"));
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SchemaSourceError::NotFound(provider.to_string()))
            }
            Err(e) => {
                return Err(SchemaSourceError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };
        debug!(provider, path = %path.display(), "Loading schema from file");
        Ok(Schema::from_json_str(&text)?)
    }

    async fn available(&self) -> Vec<String> {
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return Vec::new();
        };
        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names
    }

    fn describe(&self) -> String {
        format!("dir {}", self.dir.display())
    }
}

// ─────────────────────────────────────────────
// Remote
// ─────────────────────────────────────────────

/// Fetches `<base_url>/<provider>.json`.
#[derive(Clone, Debug)]
pub struct HttpSchemaSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSchemaSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url_for(&self, provider: &str) -> String {
        format!("{}/{provider}.json", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SchemaSource for HttpSchemaSource {
    async fn load(&self, provider: &str) -> Result<Schema, SchemaSourceError> {
        if !is_plain_name(provider) {
            return Err(SchemaSourceError::NotFound(provider.to_string()));
        }
        let url = self.url_for(provider);
        debug!(provider, url = %url, "Fetching schema");

        let fetch_error = |e: reqwest::Error| SchemaSourceError::Fetch {
            url: url.clone(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SchemaSourceError::NotFound(provider.to_string()));
        }
        if !status.is_success() {
            return Err(SchemaSourceError::Fetch {
                url: url.clone(),
                message: format!("HTTP {status}"),
            });
        }

        let text = response.text().await.map_err(fetch_error)?;
        Ok(Schema::from_json_str(&text)?)
    }

    fn describe(&self) -> String {
        format!("url {}", self.base_url)
    }
}

// ─────────────────────────────────────────────
// Chain
// ─────────────────────────────────────────────

/// Tries each source in order.
///
/// A source that does not know the provider, or that cannot be reached, hands
/// over to the next one. A schema that is found but invalid stops the chain.
pub struct ChainedSchemaSource {
    sources: Vec<Box<dyn SchemaSource>>,
}

impl ChainedSchemaSource {
    pub fn new(sources: Vec<Box<dyn SchemaSource>>) -> Self {
        Self { sources }
    }

    /// Configured directory, then configured URL, then the built-in registry.
    pub fn from_config(config: &SchemasConfig) -> Self {
        let mut sources: Vec<Box<dyn SchemaSource>> = Vec::new();
        if let Some(dir) = config.dir.as_deref().filter(|d| !d.is_empty()) {
            sources.push(Box::new(FileSchemaSource::new(expand_home(dir))));
        }
        if let Some(url) = config.base_url.as_deref().filter(|u| !u.is_empty()) {
            sources.push(Box::new(HttpSchemaSource::new(url)));
        }
        sources.push(Box::new(BuiltinSchemas));
        Self::new(sources)
    }
}

impl std::fmt::Debug for ChainedSchemaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedSchemaSource")
            .field("sources", &self.describe())
            .finish()
    }
}

#[async_trait]
impl SchemaSource for ChainedSchemaSource {
    async fn load(&self, provider: &str) -> Result<Schema, SchemaSourceError> {
        for source in &self.sources {
            match source.load(provider).await {
                Ok(schema) => return Ok(schema),
                Err(SchemaSourceError::NotFound(_)) => continue,
                Err(e @ SchemaSourceError::Fetch { .. }) => {
                    warn!(provider, source = %source.describe(), error = %e, "Schema source unavailable");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(SchemaSourceError::NotFound(provider.to_string()))
    }

    async fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for source in &self.sources {
            for name in source.available().await {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn describe(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.describe())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

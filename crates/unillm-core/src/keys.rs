//! API key resolution.
//!
//! The engine only ever receives a key through [`Context::set_api_key`];
//! where it comes from is decided here. [`TieredKeyStore`] looks keys up in a
//! fixed order: explicitly set at runtime, then session-scoped (process
//! environment), then persisted (config file).
//!
//! [`Context::set_api_key`]: crate::context::Context::set_api_key

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::config::Config;

/// Anything that can produce an API key for a provider name.
pub trait KeyStore: Send + Sync {
    /// Current key for `provider`, or `None` when no tier has one.
    fn get_key(&self, provider: &str) -> Option<String>;
}

/// Environment variable consulted for `provider`, e.g. `claude` → `CLAUDE_API_KEY`.
pub fn env_key_name(provider: &str) -> String {
    let normalized: String = provider
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{normalized}_API_KEY")
}

/// Explicit > session (env) > persistent (config) key lookup.
pub struct TieredKeyStore {
    explicit: RwLock<HashMap<String, String>>,
    read_env: bool,
    persistent: HashMap<String, String>,
}

impl TieredKeyStore {
    /// Store with only the explicit and session tiers.
    pub fn new() -> Self {
        Self {
            explicit: RwLock::new(HashMap::new()),
            read_env: true,
            persistent: HashMap::new(),
        }
    }

    /// Store whose persistent tier holds every configured provider key.
    pub fn from_config(config: &Config) -> Self {
        let persistent = config
            .providers
            .iter()
            .filter(|(_, p)| p.is_configured())
            .map(|(name, p)| (name.clone(), p.api_key.clone()))
            .collect();
        Self {
            persistent,
            ..Self::new()
        }
    }

    /// Disable the session (environment) tier.
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Set a key for the rest of this process. An empty key clears it.
    pub fn set_key(&self, provider: &str, key: impl Into<String>) {
        let key = key.into();
        let mut explicit = self.explicit.write().unwrap_or_else(|e| e.into_inner());
        if key.is_empty() {
            explicit.remove(provider);
        } else {
            explicit.insert(provider.to_string(), key);
        }
    }

    /// Which tier currently supplies the key for `provider`.
    pub fn source(&self, provider: &str) -> Option<KeySource> {
        let explicit = self.explicit.read().unwrap_or_else(|e| e.into_inner());
        if explicit.get(provider).is_some_and(|k| !k.is_empty()) {
            return Some(KeySource::Explicit);
        }
        drop(explicit);
        if self.env_key(provider).is_some() {
            return Some(KeySource::Session);
        }
        if self.persistent.get(provider).is_some_and(|k| !k.is_empty()) {
            return Some(KeySource::Persistent);
        }
        None
    }

    fn env_key(&self, provider: &str) -> Option<String> {
        if !self.read_env {
            return None;
        }
        std::env::var(env_key_name(provider))
            .ok()
            .filter(|k| !k.is_empty())
    }
}

impl Default for TieredKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for TieredKeyStore {
    fn get_key(&self, provider: &str) -> Option<String> {
        let source = self.source(provider)?;
        debug!(provider, source = ?source, "Resolved API key");
        match source {
            KeySource::Explicit => self
                .explicit
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .get(provider)
                .cloned(),
            KeySource::Session => self.env_key(provider),
            KeySource::Persistent => self.persistent.get(provider).cloned(),
        }
    }
}

/// Tier a key was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySource {
    Explicit,
    Session,
    Persistent,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

//! Configuration schema.
//!
//! Hierarchy: `Config` → `Defaults`, `providers` (by name), `SchemasConfig`,
//! `TranscriptionConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::context::ContextOptions;
use crate::request::RequestDefaults;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.unillm/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub defaults: Defaults,
    /// Per-provider settings, keyed by schema provider name (e.g. `"claude"`).
    pub providers: HashMap<String, ProviderConfig>,
    pub schemas: SchemasConfig,
    pub transcription: TranscriptionConfig,
}

impl Config {
    /// Context options derived from `defaults`.
    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            validate: self.defaults.validation,
            defaults: RequestDefaults {
                max_tokens: self.defaults.max_tokens,
                temperature: self.defaults.temperature,
            },
        }
    }

    /// Settings for one provider, if configured.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }
}

// ─────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────

/// Session defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Defaults {
    /// Provider used when none is named on the command line.
    pub provider: String,
    /// Fallback `max_tokens` when the caller never sets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Fallback sampling temperature when the caller never sets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Request streamed responses when the provider supports them.
    pub stream: bool,
    /// Enforce schema constraints on caller input.
    pub validation: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            max_tokens: Some(4096),
            temperature: None,
            stream: false,
            validation: true,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Settings for one provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Persisted API key.
    #[serde(default)]
    pub api_key: String,
    /// Endpoint override (e.g. a local proxy); the schema endpoint otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// Whether this provider has a persisted API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Schemas
// ─────────────────────────────────────────────

/// Where provider schemas are looked up, before the built-in set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemasConfig {
    /// Directory holding `<provider>.json` files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Base URL serving `<provider>.json` documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

// ─────────────────────────────────────────────
// Transcription
// ─────────────────────────────────────────────

/// Speech-to-text settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionConfig {
    /// API key; falls back to `GROQ_API_KEY` when empty.
    pub api_key: String,
    /// OpenAI-compatible `/audio/transcriptions` endpoint.
    pub api_url: String,
    /// Whisper model name.
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.groq.com/openai/v1/audio/transcriptions".to_string(),
            model: "whisper-large-v3".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.provider, "openai");
        assert_eq!(config.defaults.max_tokens, Some(4096));
        assert!(config.defaults.validation);
        assert!(!config.defaults.stream);
        assert!(config.providers.is_empty());
        assert_eq!(config.transcription.model, "whisper-large-v3");
    }

    #[test]
    fn test_config_from_json_camel_case() {
        let json = serde_json::json!({
            "defaults": {
                "provider": "claude",
                "maxTokens": 1024,
                "temperature": 0.3,
                "validation": false
            },
            "providers": {
                "claude": { "apiKey": "sk-ant", "endpoint": "http://localhost:8080/v1/messages" }
            },
            "schemas": { "baseUrl": "https://example.com/schemas" }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.defaults.provider, "claude");
        assert_eq!(config.defaults.max_tokens, Some(1024));
        assert!(!config.defaults.validation);
        // Defaults preserved for missing fields
        assert!(!config.defaults.stream);
        let claude = config.provider("claude").unwrap();
        assert!(claude.is_configured());
        assert_eq!(claude.endpoint.as_deref(), Some("http://localhost:8080/v1/messages"));
        assert_eq!(config.schemas.base_url.as_deref(), Some("https://example.com/schemas"));
        assert!(config.schemas.dir.is_none());
    }

    #[test]
    fn test_context_options_mapping() {
        let mut config = Config::default();
        config.defaults.temperature = Some(0.4);
        config.defaults.validation = false;
        let options = config.context_options();
        assert!(!options.validate);
        assert_eq!(options.defaults.max_tokens, Some(4096));
        assert_eq!(options.defaults.temperature, Some(0.4));
    }
}

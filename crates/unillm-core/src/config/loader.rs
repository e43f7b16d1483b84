//! Config loader — reads `~/.unillm/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.unillm/config.json`
//! 3. Environment variables `UNILLM_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

const ENV_PREFIX: &str = "UNILLM_";
const PROVIDER_ENV_PREFIX: &str = "UNILLM_PROVIDERS__";

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path);

    let config = load_config_from_path(&config_path);
    apply_env_overrides(config, std::env::vars())
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path);

    // Ensure parent directory exists
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `UNILLM_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `UNILLM_DEFAULTS__PROVIDER` → `defaults.provider`
/// - `UNILLM_DEFAULTS__MAX_TOKENS` → `defaults.max_tokens`
/// - `UNILLM_DEFAULTS__TEMPERATURE` → `defaults.temperature`
/// - `UNILLM_DEFAULTS__STREAM` → `defaults.stream`
/// - `UNILLM_DEFAULTS__VALIDATION` → `defaults.validation`
/// - `UNILLM_PROVIDERS__<NAME>__API_KEY` → `providers.<name>.api_key`
/// - `UNILLM_PROVIDERS__<NAME>__ENDPOINT` → `providers.<name>.endpoint`
/// - `UNILLM_SCHEMAS__DIR` / `UNILLM_SCHEMAS__BASE_URL` → `schemas.*`
/// - `UNILLM_TRANSCRIPTION__API_KEY` / `__API_URL` / `__MODEL` → `transcription.*`
fn apply_env_overrides<I>(mut config: Config, vars: I) -> Config
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, val) in vars {
        if !name.starts_with(ENV_PREFIX) {
            continue;
        }

        if let Some(rest) = name.strip_prefix(PROVIDER_ENV_PREFIX) {
            apply_provider_env(&mut config, rest, val);
            continue;
        }

        match &name[ENV_PREFIX.len()..] {
            "DEFAULTS__PROVIDER" => config.defaults.provider = val,
            "DEFAULTS__MAX_TOKENS" => {
                if let Ok(n) = val.parse::<u32>() {
                    config.defaults.max_tokens = Some(n);
                }
            }
            "DEFAULTS__TEMPERATURE" => {
                if let Ok(t) = val.parse::<f64>() {
                    config.defaults.temperature = Some(t);
                }
            }
            "DEFAULTS__STREAM" => config.defaults.stream = is_truthy(&val),
            "DEFAULTS__VALIDATION" => config.defaults.validation = is_truthy(&val),
            "SCHEMAS__DIR" => config.schemas.dir = Some(val),
            "SCHEMAS__BASE_URL" => config.schemas.base_url = Some(val),
            "TRANSCRIPTION__API_KEY" => config.transcription.api_key = val,
            "TRANSCRIPTION__API_URL" => config.transcription.api_url = val,
            "TRANSCRIPTION__MODEL" => config.transcription.model = val,
            other => debug!("Ignoring unknown env override {ENV_PREFIX}{other}"),
        }
    }

    config
}

/// Apply one `<NAME>__<FIELD>` provider override.
fn apply_provider_env(config: &mut Config, rest: &str, val: String) {
    let Some((name, field)) = rest.rsplit_once("__") else {
        return;
    };
    let name = name.to_lowercase();
    match field {
        "API_KEY" => config.providers.entry(name).or_default().api_key = val,
        "ENDPOINT" => config.providers.entry(name).or_default().endpoint = Some(val),
        _ => debug!("Ignoring unknown provider override {PROVIDER_ENV_PREFIX}{rest}"),
    }
}

fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

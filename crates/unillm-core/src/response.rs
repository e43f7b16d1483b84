//! Response extractor — reads normalized text, content, usage and errors out
//! of a raw provider response using the schema's declared paths.
//!
//! Streaming deltas are a special case: the schema's `content_delta_path` is
//! tried first, then a fixed heuristic list of known wire shapes
//! ([`DELTA_HEURISTICS`]). Delta wire formats are not uniformly captured by
//! schemas, so the heuristic is best-effort and provider-name-agnostic.

use serde_json::Value;
use tracing::debug;

use crate::error::ExtractionError;
use crate::path::{resolve, JsonPath};
use crate::schema::Schema;

/// Returned by [`ResponseExtractor::extract_error`] when no error path is declared.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Returned by [`ResponseExtractor::extract_error`] when the error path does not resolve.
pub const UNPARSABLE_ERROR: &str = "Failed to parse error response";

/// Raw SSE payload that ends an OpenAI-style stream.
pub const STREAM_DONE: &str = "[DONE]";

/// Known delta shapes, in priority order: OpenAI/DeepSeek, then Claude.
pub const DELTA_HEURISTICS: &[&[&str]] = &[&["choices", "0", "delta", "content"], &["delta", "text"]];

/// Extracts values from responses shaped by one schema.
pub struct ResponseExtractor<'a> {
    schema: &'a Schema,
}

impl<'a> ResponseExtractor<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// The success text, stringified. Strings are returned as-is; other JSON
    /// values are serialized.
    pub fn extract_text(&self, response: &Value) -> Result<String, ExtractionError> {
        let value = self.resolve("text", self.schema.text_path(), response)?;
        Ok(stringify(value))
    }

    /// The full success content (e.g. the whole message object).
    pub fn extract_full(&self, response: &Value) -> Result<Value, ExtractionError> {
        self.resolve("content", self.schema.content_path(), response)
            .cloned()
    }

    /// Token usage, when the schema declares a usage path and it resolves.
    pub fn extract_usage(&self, response: &Value) -> Option<Value> {
        let path = self.schema.usage_path()?;
        match resolve(response, path) {
            Ok(usage) => Some(usage.clone()),
            Err(e) => {
                debug!(provider = self.schema.name(), error = %e, "No usage in response");
                None
            }
        }
    }

    /// The provider's error message. Never fails: falls back to
    /// [`UNKNOWN_ERROR`] or [`UNPARSABLE_ERROR`].
    pub fn extract_error(&self, response: &Value) -> String {
        let Some(path) = self.schema.error_path() else {
            return UNKNOWN_ERROR.to_string();
        };
        match resolve(response, path) {
            Ok(value) => stringify(value),
            Err(e) => {
                debug!(provider = self.schema.name(), error = %e, "Error path did not resolve");
                UNPARSABLE_ERROR.to_string()
            }
        }
    }

    /// Text carried by one decoded stream chunk, or `""` when the chunk has no
    /// text (role announcements, pings, end-of-stream markers).
    pub fn extract_delta(&self, chunk: &Value) -> String {
        if is_end_of_stream(chunk) {
            return String::new();
        }

        if let Some(path) = self.schema.delta_path() {
            if let Ok(Value::String(text)) = resolve(chunk, path) {
                return text.clone();
            }
        }

        DELTA_HEURISTICS
            .iter()
            .find_map(|steps| match resolve(chunk, &JsonPath::from_strs(steps)) {
                Ok(Value::String(text)) => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Like [`extract_delta`](Self::extract_delta) but takes the raw SSE `data:`
    /// payload. `[DONE]` and unparsable payloads yield `""`.
    pub fn extract_delta_str(&self, data: &str) -> String {
        let data = data.trim();
        if data.is_empty() || data == STREAM_DONE {
            return String::new();
        }
        match serde_json::from_str::<Value>(data) {
            Ok(chunk) => self.extract_delta(&chunk),
            Err(e) => {
                debug!(provider = self.schema.name(), error = %e, "Skipping unparsable stream chunk");
                String::new()
            }
        }
    }

    fn resolve<'v>(
        &self,
        target: &'static str,
        path: &JsonPath,
        response: &'v Value,
    ) -> Result<&'v Value, ExtractionError> {
        resolve(response, path).map_err(|source| ExtractionError::Path {
            target,
            path: path.to_string(),
            source,
        })
    }
}

/// Whether a decoded chunk is an explicit end-of-stream marker.
pub fn is_end_of_stream(chunk: &Value) -> bool {
    match chunk {
        Value::String(s) => s == STREAM_DONE,
        Value::Object(map) => map.get("type").and_then(Value::as_str) == Some("message_stop"),
        _ => false,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

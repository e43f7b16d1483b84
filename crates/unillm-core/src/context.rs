//! Context — the stateful, per-provider session object.
//!
//! A `Context` is bound to one [`Schema`] and accumulates the model, system
//! message, compiled messages, request parameters and API key for a chat
//! session. It ties the compiler, validator, builder and extractor together.
//!
//! Contexts share nothing mutable: to talk to N providers at once, hold N
//! contexts. A single context must not be mutated from several callers at the
//! same time without external synchronization.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{ExtractionError, ValidationError};
use crate::message::{Media, MessageCompiler};
use crate::request::{build_request, RequestDefaults, RequestState};
use crate::response::ResponseExtractor;
use crate::schema::Schema;
use crate::validator::{normalize_parameter, validate_parameter};

/// Behaviour switches for a [`Context`].
#[derive(Clone, Debug, PartialEq)]
pub struct ContextOptions {
    /// When false, parameter, role, multimodal, model and empty-key checks
    /// are skipped and malformed input surfaces as whatever the provider
    /// eventually returns.
    pub validate: bool,
    /// Fallback `max_tokens` / `temperature`.
    pub defaults: RequestDefaults,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            validate: true,
            defaults: RequestDefaults::default(),
        }
    }
}

/// Per-provider chat state.
#[derive(Clone)]
pub struct Context {
    schema: Arc<Schema>,
    options: ContextOptions,
    model: Option<String>,
    system_message: Option<String>,
    messages: Vec<Value>,
    parameters: HashMap<String, Value>,
    api_key: Option<String>,
    headers: BTreeMap<String, String>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("provider", &self.schema.name())
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .field("parameters", &self.parameters.keys().collect::<Vec<_>>())
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl Context {
    /// Create a keyless context. The model starts as the schema's default.
    pub fn new(schema: Arc<Schema>, options: ContextOptions) -> Self {
        let headers = build_headers(&schema, None);
        Context {
            model: schema.default_model().map(String::from),
            schema,
            options,
            system_message: None,
            messages: Vec::new(),
            parameters: HashMap::new(),
            api_key: None,
            headers,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub fn provider_name(&self) -> &str {
        self.schema.name()
    }

    pub fn endpoint(&self) -> &str {
        self.schema.endpoint()
    }

    pub fn method(&self) -> &str {
        self.schema.method()
    }

    // ── API key & headers ──

    /// Set the API key and rebuild every header from the schema templates.
    pub fn set_api_key(&mut self, key: impl Into<String>) -> Result<(), ValidationError> {
        let key = key.into();
        if key.trim().is_empty() {
            if self.options.validate {
                return Err(ValidationError::MissingApiKey(self.schema.name().to_string()));
            }
            self.api_key = None;
        } else {
            self.api_key = Some(key);
        }
        self.headers = build_headers(&self.schema, self.api_key.as_deref());
        debug!(
            provider = self.schema.name(),
            headers = self.headers.len(),
            keyed = self.api_key.is_some(),
            "Rebuilt headers"
        );
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Headers to send. While keyless, headers that need the key are omitted.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    // ── Model & system message ──

    pub fn set_model(&mut self, model: impl Into<String>) -> Result<(), ValidationError> {
        let model = model.into();
        if self.options.validate && !self.schema.is_valid_model(&model) {
            return Err(ValidationError::InvalidModel {
                model,
                provider: self.schema.name().to_string(),
            });
        }
        self.model = Some(model);
        Ok(())
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_system_message(&mut self, text: impl Into<String>) -> Result<(), ValidationError> {
        if !self.schema.features().system_messages {
            return Err(ValidationError::SystemMessageUnsupported(
                self.schema.name().to_string(),
            ));
        }
        self.system_message = Some(text.into());
        Ok(())
    }

    pub fn clear_system_message(&mut self) {
        self.system_message = None;
    }

    pub fn system_message(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    // ── Messages ──

    pub fn add_user_message(&mut self, text: &str, media: Option<&Media>) -> Result<(), ValidationError> {
        self.add_message("user", text, media)
    }

    pub fn add_assistant_message(&mut self, text: &str) -> Result<(), ValidationError> {
        self.add_message("assistant", text, None)
    }

    /// Compile and append a message with an arbitrary role.
    pub fn add_message(&mut self, role: &str, text: &str, media: Option<&Media>) -> Result<(), ValidationError> {
        let message = MessageCompiler::new(&self.schema, self.options.validate)
            .compile(role, text, media)?;
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Remove and return the most recent message.
    pub fn pop_message(&mut self) -> Option<Value> {
        self.messages.pop()
    }

    // ── Parameters ──

    /// Validate and store a request parameter. Last write wins.
    pub fn set_parameter(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ValidationError> {
        let value = normalize_parameter(&self.schema, key, value.into());
        if self.options.validate {
            validate_parameter(&self.schema, key, &value)?;
        }
        self.parameters.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove_parameter(&mut self, key: &str) -> Option<Value> {
        self.parameters.remove(key)
    }

    pub fn parameters(&self) -> &HashMap<String, Value> {
        &self.parameters
    }

    /// Clear messages, system message, parameters and model. The API key and
    /// headers are kept.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.system_message = None;
        self.parameters.clear();
        self.model = None;
        debug!(provider = self.schema.name(), "Context reset");
    }

    // ── Requests ──

    /// Build the provider request body. Does not modify the context.
    pub fn build_request(&self, streaming: bool) -> Value {
        let state = RequestState {
            model: self.model.as_deref(),
            system_message: self.system_message.as_deref(),
            messages: &self.messages,
            parameters: &self.parameters,
            defaults: &self.options.defaults,
        };
        build_request(&self.schema, state, streaming)
    }

    /// Checks that must pass before a request is transmitted: API key, model,
    /// at least one message, the schema's last-message-role rule and every
    /// required parameter.
    pub fn validate_for_send(&self) -> Result<(), ValidationError> {
        if self.api_key.is_none() {
            return Err(ValidationError::MissingApiKey(self.schema.name().to_string()));
        }
        if self.model.is_none() {
            return Err(ValidationError::MissingModel);
        }
        let last = self.messages.last().ok_or(ValidationError::NoMessages)?;

        if let Some(expected) = self.schema.last_message_role() {
            let found = last.get("role").and_then(Value::as_str).unwrap_or_default();
            if found != expected {
                return Err(ValidationError::LastMessageRole {
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }

        let mut required: Vec<&String> = self
            .schema
            .parameters()
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name)
            .collect();
        if !required.is_empty() {
            required.sort();
            let request = self.build_request(false);
            if let Some(missing) = required.into_iter().find(|name| request.get(name.as_str()).is_none()) {
                return Err(ValidationError::MissingParameter(missing.clone()));
            }
        }

        Ok(())
    }

    // ── Responses ──

    fn extractor(&self) -> ResponseExtractor<'_> {
        ResponseExtractor::new(&self.schema)
    }

    pub fn extract_text(&self, response: &Value) -> Result<String, ExtractionError> {
        self.extractor().extract_text(response)
    }

    pub fn extract_full(&self, response: &Value) -> Result<Value, ExtractionError> {
        self.extractor().extract_full(response)
    }

    pub fn extract_usage(&self, response: &Value) -> Option<Value> {
        self.extractor().extract_usage(response)
    }

    pub fn extract_error(&self, response: &Value) -> String {
        self.extractor().extract_error(response)
    }

    pub fn extract_delta(&self, chunk: &Value) -> String {
        self.extractor().extract_delta(chunk)
    }

    pub fn extract_delta_str(&self, data: &str) -> String {
        self.extractor().extract_delta_str(data)
    }
}

/// Build the full header map from the schema's templates.
///
/// Required then optional headers; every occurrence of the key placeholder
/// is substituted. Templates needing a key are skipped when `api_key` is None.
fn build_headers(schema: &Schema, api_key: Option<&str>) -> BTreeMap<String, String> {
    let placeholder = schema.key_placeholder();
    schema
        .required_headers()
        .iter()
        .chain(schema.optional_headers())
        .filter_map(|(name, template)| {
            if !placeholder.is_empty() && template.contains(placeholder) {
                api_key.map(|key| (name.clone(), template.replace(placeholder, key)))
            } else {
                Some((name.clone(), template.clone()))
            }
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

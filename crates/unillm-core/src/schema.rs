//! Schema model — the validated in-memory form of a provider description.
//!
//! A schema document is JSON describing one provider's request/response
//! contract (endpoint, auth header templates, parameter constraints, message
//! templates, extraction paths). [`Schema::from_value`] validates it once and
//! takes owned copies of every template, so a loaded `Schema` is read-only and
//! can be shared between contexts behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SchemaError;
use crate::path::JsonPath;

/// Sentinel marking a flat-string `content` field in the message structure.
pub const TEXT_CONTENT_SENTINEL: &str = "<TEXT_CONTENT>";

/// Placeholder substituted with the API key when the schema does not name one.
pub const DEFAULT_KEY_PLACEHOLDER: &str = "{{API_KEY}}";

// ─────────────────────────────────────────────
// Raw document (serde view)
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProviderInfo {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    endpoint: String,
    #[serde(default)]
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Authentication {
    #[serde(rename = "type")]
    kind: String,
    key_placeholder: String,
}

impl Default for Authentication {
    fn default() -> Self {
        Self {
            kind: "header".to_string(),
            key_placeholder: DEFAULT_KEY_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HeaderTemplates {
    #[serde(deserialize_with = "null_default")]
    required: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_default")]
    optional: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelList {
    #[serde(deserialize_with = "null_default")]
    available: Vec<String>,
    default: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageFormat {
    structure: Value,
    #[serde(deserialize_with = "null_default")]
    content_types: ContentTypes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentTypes {
    text: Option<Value>,
    image: Option<Value>,
    audio: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseFormat {
    success: SuccessFormat,
    #[serde(default, deserialize_with = "null_default")]
    error: ErrorFormat,
    #[serde(default)]
    stream: Option<StreamFormat>,
}

#[derive(Debug, Deserialize)]
struct SuccessFormat {
    text_path: JsonPath,
    #[serde(default, deserialize_with = "null_default")]
    content_path: JsonPath,
    #[serde(default)]
    usage_path: Option<JsonPath>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorFormat {
    #[serde(deserialize_with = "null_default")]
    error_path: JsonPath,
}

#[derive(Debug, Deserialize)]
struct StreamFormat {
    #[serde(default, deserialize_with = "null_default")]
    content_delta_path: JsonPath,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Features {
    #[serde(deserialize_with = "null_default")]
    streaming: bool,
    #[serde(deserialize_with = "null_default")]
    multimodal: bool,
    #[serde(deserialize_with = "null_default")]
    system_messages: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValidationRules {
    #[serde(deserialize_with = "null_default")]
    message_validation: MessageValidation,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageValidation {
    last_message_role: Option<String>,
}

// ─────────────────────────────────────────────
// Public sub-types
// ─────────────────────────────────────────────

/// Declared type of a request parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Float,
    Number,
    Boolean,
    String,
    Array,
    Object,
    /// A type name this engine does not check.
    #[serde(other)]
    Other,
}

/// Constraint record for one request parameter.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub kind: Option<ParamType>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(rename = "enum")]
    pub allowed: Option<Vec<Value>>,
    pub max_length: Option<usize>,
    pub default: Option<Value>,
    #[serde(deserialize_with = "null_default")]
    pub required: bool,
}

/// How the system prompt is carried by the provider.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemMessageSpec {
    #[serde(deserialize_with = "null_default")]
    pub supported: bool,
    /// Top-level request field used when `system` is not a message role.
    pub field: Option<String>,
    pub role: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct MultimodalSpec {
    #[serde(deserialize_with = "null_default")]
    supported: bool,
    #[serde(deserialize_with = "null_default")]
    supported_types: Vec<String>,
}

/// Shape of a compiled message's `content` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentLayout {
    /// `content` is a plain string.
    Flat,
    /// `content` is an array of content blocks.
    Blocks,
}

/// How an image block embeds its payload, recognized from the image template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageStyle {
    /// `{"source": {"media_type": .., "data": ..}}` (Claude-style).
    Source,
    /// `{"image_url": {"url": "data:..;base64,.."}}` (OpenAI-style).
    ImageUrl,
    /// No usable image template.
    None,
}

impl ImageStyle {
    fn detect(template: Option<&Value>) -> Self {
        match template.and_then(Value::as_object) {
            Some(obj) if obj.contains_key("source") => ImageStyle::Source,
            Some(obj) if obj.contains_key("image_url") => ImageStyle::ImageUrl,
            _ => ImageStyle::None,
        }
    }
}

/// Capability flags derived from the schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub streaming: bool,
    pub multimodal: bool,
    pub system_messages: bool,
}

// ─────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────

/// A validated provider description.
#[derive(Clone, Debug)]
pub struct Schema {
    name: String,
    display_name: String,
    endpoint: String,
    method: String,
    auth_type: String,
    key_placeholder: String,
    required_headers: BTreeMap<String, String>,
    optional_headers: BTreeMap<String, String>,
    models: Vec<String>,
    default_model: Option<String>,
    request_template: Map<String, Value>,
    parameters: HashMap<String, ParameterSpec>,
    valid_roles: BTreeSet<String>,
    system_message: SystemMessageSpec,
    supported_media_types: Vec<String>,
    message_template: Map<String, Value>,
    layout: ContentLayout,
    text_template: Value,
    image_template: Option<Value>,
    image_style: ImageStyle,
    audio_template: Option<Value>,
    text_path: JsonPath,
    content_path: JsonPath,
    usage_path: Option<JsonPath>,
    error_path: Option<JsonPath>,
    delta_path: Option<JsonPath>,
    features: FeatureFlags,
    last_message_role: Option<String>,
}

impl Schema {
    /// Parse and validate a schema from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let raw: Value =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_value(&raw)
    }

    /// Validate a raw schema document and build the in-memory model.
    ///
    /// Every template is copied out of `raw`; later changes to `raw` do not
    /// affect the returned schema.
    pub fn from_value(raw: &Value) -> Result<Self, SchemaError> {
        check_required(raw)?;

        let provider: ProviderInfo = required_block(raw, "provider")?;
        let api: ApiInfo = required_block(raw, "api")?;
        let authentication: Authentication = block(raw, "authentication")?;
        let headers: HeaderTemplates = block(raw, "headers")?;
        let models: ModelList = block(raw, "models")?;
        let parameters = parameter_specs(raw)?;
        let message_roles: Vec<String> = block(raw, "message_roles")?;
        let system_message: Option<SystemMessageSpec> = block(raw, "system_message")?;
        let multimodal: Option<MultimodalSpec> = block(raw, "multimodal")?;
        let message_format: MessageFormat = required_block(raw, "message_format")?;
        let response_format: ResponseFormat = required_block(raw, "response_format")?;
        let declared: Features = block(raw, "features")?;
        let validation: ValidationRules = block(raw, "validation")?;

        let request_template = match raw.get("request_template") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(SchemaError::Invalid {
                    field: "request_template",
                    reason: "must be an object".into(),
                })
            }
        };

        let message_template = match message_format.structure {
            Value::Object(map) => map,
            _ => {
                return Err(SchemaError::Invalid {
                    field: "message_format.structure",
                    reason: "must be an object".into(),
                })
            }
        };

        let layout = match message_template.get("content") {
            Some(Value::String(s)) if s == TEXT_CONTENT_SENTINEL => ContentLayout::Flat,
            _ => ContentLayout::Blocks,
        };

        let content_types = message_format.content_types;
        let text_template = content_types
            .text
            .filter(Value::is_object)
            .unwrap_or_else(|| serde_json::json!({ "type": "text", "text": "" }));
        let image_style = ImageStyle::detect(content_types.image.as_ref());

        let multimodal = multimodal.unwrap_or_default();
        let system_message = system_message.unwrap_or(SystemMessageSpec {
            supported: declared.system_messages,
            field: None,
            role: None,
        });

        let features = FeatureFlags {
            streaming: declared.streaming,
            multimodal: declared.multimodal || multimodal.supported,
            system_messages: system_message.supported,
        };

        let error_path = Some(response_format.error.error_path).filter(|p| !p.is_empty());
        let delta_path = response_format
            .stream
            .map(|s| s.content_delta_path)
            .filter(|p| !p.is_empty());

        let schema = Schema {
            display_name: provider
                .display_name
                .unwrap_or_else(|| provider.name.clone()),
            name: provider.name,
            endpoint: api.endpoint,
            method: api
                .method
                .map(|m| m.to_uppercase())
                .unwrap_or_else(|| "POST".to_string()),
            auth_type: authentication.kind,
            key_placeholder: authentication.key_placeholder,
            required_headers: headers.required,
            optional_headers: headers.optional,
            models: models.available,
            default_model: models.default,
            request_template,
            parameters,
            valid_roles: message_roles.into_iter().collect(),
            system_message,
            supported_media_types: multimodal.supported_types,
            message_template,
            layout,
            text_template,
            image_template: content_types.image,
            image_style,
            audio_template: content_types.audio,
            text_path: response_format.success.text_path,
            content_path: response_format.success.content_path,
            usage_path: response_format.success.usage_path,
            error_path,
            delta_path,
            features,
            last_message_role: validation.message_validation.last_message_role,
        };

        debug!(
            provider = %schema.name,
            endpoint = %schema.endpoint,
            layout = ?schema.layout,
            image_style = ?schema.image_style,
            parameters = schema.parameters.len(),
            "Loaded provider schema"
        );

        Ok(schema)
    }

    // ── Identity & endpoint ──

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn auth_type(&self) -> &str {
        &self.auth_type
    }

    pub fn key_placeholder(&self) -> &str {
        &self.key_placeholder
    }

    pub fn required_headers(&self) -> &BTreeMap<String, String> {
        &self.required_headers
    }

    pub fn optional_headers(&self) -> &BTreeMap<String, String> {
        &self.optional_headers
    }

    // ── Models ──

    pub fn available_models(&self) -> &[String] {
        &self.models
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    /// An empty model list accepts any model name.
    pub fn is_valid_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model)
    }

    // ── Request shape ──

    pub fn request_template(&self) -> &Map<String, Value> {
        &self.request_template
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> &HashMap<String, ParameterSpec> {
        &self.parameters
    }

    pub fn valid_roles(&self) -> &BTreeSet<String> {
        &self.valid_roles
    }

    /// An empty role set accepts any role.
    pub fn is_valid_role(&self, role: &str) -> bool {
        self.valid_roles.is_empty() || self.valid_roles.contains(role)
    }

    pub fn system_message(&self) -> &SystemMessageSpec {
        &self.system_message
    }

    /// Whether `media_type` is acceptable. An empty list accepts any type;
    /// entries may be full MIME types (`image/png`) or top-level types (`image`).
    pub fn accepts_media_type(&self, media_type: &str) -> bool {
        if self.supported_media_types.is_empty() {
            return true;
        }
        let top_level = media_type.split('/').next().unwrap_or(media_type);
        self.supported_media_types
            .iter()
            .any(|t| t == media_type || t == top_level)
    }

    pub fn message_template(&self) -> &Map<String, Value> {
        &self.message_template
    }

    pub fn content_layout(&self) -> ContentLayout {
        self.layout
    }

    pub fn text_template(&self) -> &Value {
        &self.text_template
    }

    pub fn image_template(&self) -> Option<&Value> {
        self.image_template.as_ref()
    }

    pub fn image_style(&self) -> ImageStyle {
        self.image_style
    }

    pub fn audio_template(&self) -> Option<&Value> {
        self.audio_template.as_ref()
    }

    // ── Response shape ──

    pub fn text_path(&self) -> &JsonPath {
        &self.text_path
    }

    pub fn content_path(&self) -> &JsonPath {
        &self.content_path
    }

    pub fn usage_path(&self) -> Option<&JsonPath> {
        self.usage_path.as_ref()
    }

    pub fn error_path(&self) -> Option<&JsonPath> {
        self.error_path.as_ref()
    }

    pub fn delta_path(&self) -> Option<&JsonPath> {
        self.delta_path.as_ref()
    }

    // ── Features & rules ──

    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    pub fn last_message_role(&self) -> Option<&str> {
        self.last_message_role.as_deref()
    }
}

/// Deserialize one top-level block. Absent and `null` both mean "use the default".
fn block<T>(raw: &Value, field: &'static str) -> Result<T, SchemaError>
where
    T: DeserializeOwned + Default,
{
    match raw.get(field) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => T::deserialize(value).map_err(|e| SchemaError::Invalid {
            field,
            reason: e.to_string(),
        }),
    }
}

fn required_block<T: DeserializeOwned>(raw: &Value, field: &'static str) -> Result<T, SchemaError> {
    let value = raw.get(field).ok_or(SchemaError::MissingField(field))?;
    T::deserialize(value).map_err(|e| SchemaError::Invalid {
        field,
        reason: e.to_string(),
    })
}

/// Parameter constraint records, one at a time so a bad record is named.
fn parameter_specs(raw: &Value) -> Result<HashMap<String, ParameterSpec>, SchemaError> {
    let records: Map<String, Value> = block(raw, "parameters")?;
    records
        .into_iter()
        .map(|(name, record)| -> Result<(String, ParameterSpec), SchemaError> {
            let spec = match record {
                Value::Null => ParameterSpec::default(),
                record => ParameterSpec::deserialize(&record).map_err(|e| SchemaError::Invalid {
                    field: "parameters",
                    reason: format!("`{name}`: {e}"),
                })?,
            };
            Ok((name, spec))
        })
        .collect()
}

/// `null` in a schema document means the same as leaving the field out.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Presence checks that name the offending field before serde sees the document.
fn check_required(raw: &Value) -> Result<(), SchemaError> {
    if !raw.is_object() {
        return Err(SchemaError::Invalid {
            field: "schema",
            reason: "document must be a JSON object".into(),
        });
    }

    let provider = raw.get("provider").ok_or(SchemaError::MissingField("provider"))?;
    non_empty_str(provider.get("name"), "provider.name")?;

    let api = raw.get("api").ok_or(SchemaError::MissingField("api"))?;
    non_empty_str(api.get("endpoint"), "api.endpoint")?;

    let format = raw
        .get("message_format")
        .ok_or(SchemaError::MissingField("message_format"))?;
    format
        .get("structure")
        .filter(|v| !v.is_null())
        .ok_or(SchemaError::MissingField("message_format.structure"))?;
    let content_types = format
        .get("content_types")
        .and_then(Value::as_object)
        .ok_or(SchemaError::MissingField("message_format.content_types"))?;
    if !content_types.values().any(|t| !t.is_null()) {
        return Err(SchemaError::Invalid {
            field: "message_format.content_types",
            reason: "at least one content-type template is required".into(),
        });
    }

    let response = raw
        .get("response_format")
        .ok_or(SchemaError::MissingField("response_format"))?;
    let success = response
        .get("success")
        .ok_or(SchemaError::MissingField("response_format.success"))?;
    let text_path = success
        .get("text_path")
        .and_then(Value::as_array)
        .ok_or(SchemaError::MissingField("response_format.success.text_path"))?;
    if text_path.is_empty() {
        return Err(SchemaError::Invalid {
            field: "response_format.success.text_path",
            reason: "must not be empty".into(),
        });
    }

    Ok(())
}

fn non_empty_str(value: Option<&Value>, field: &'static str) -> Result<(), SchemaError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(SchemaError::Invalid {
            field,
            reason: "must not be empty".into(),
        }),
        _ => Err(SchemaError::MissingField(field)),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

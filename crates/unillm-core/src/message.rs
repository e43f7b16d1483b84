//! Message compiler — turns a logical `(role, text, media?)` tuple into the
//! provider's message object.
//!
//! Every call starts from a fresh copy of the schema's templates:
//! - flat layout: `{"role": .., "content": "<text>"}`
//! - block layout: `content` is `[text block, image block?]`, with the image
//!   block filled according to the schema's [`ImageStyle`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ValidationError;
use crate::schema::{ContentLayout, ImageStyle, Schema};

/// An attachment supplied with a message, e.g. an image.
///
/// `data` is either base64 (optionally as a `data:` URI) or raw content that
/// will be encoded. Reading files is the caller's job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Media {
    pub media_type: String,
    pub data: String,
}

impl Media {
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Build from raw bytes (e.g. a file the caller has read).
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            data: STANDARD.encode(bytes),
        }
    }
}

/// Compiles messages for one schema.
pub struct MessageCompiler<'a> {
    schema: &'a Schema,
    validate: bool,
}

impl<'a> MessageCompiler<'a> {
    pub fn new(schema: &'a Schema, validate: bool) -> Self {
        Self { schema, validate }
    }

    /// Compile one message.
    ///
    /// With validation enabled, the role must be in the schema's role set
    /// (when non-empty) and media requires multimodal support.
    pub fn compile(&self, role: &str, text: &str, media: Option<&Media>) -> Result<Value, ValidationError> {
        if self.validate {
            if !self.schema.is_valid_role(role) {
                return Err(ValidationError::InvalidRole {
                    role: role.to_string(),
                    provider: self.schema.name().to_string(),
                });
            }
            if let Some(media) = media {
                if !self.schema.features().multimodal {
                    return Err(ValidationError::MultimodalUnsupported(
                        self.schema.name().to_string(),
                    ));
                }
                if !self.schema.accepts_media_type(&media.media_type) {
                    return Err(ValidationError::UnsupportedMediaType {
                        media_type: media.media_type.clone(),
                        provider: self.schema.name().to_string(),
                    });
                }
            }
        }

        Ok(self.render(role, text, media))
    }

    /// Fill the templates without any constraint checks.
    pub(crate) fn render(&self, role: &str, text: &str, media: Option<&Media>) -> Value {
        let mut message: Map<String, Value> = self.schema.message_template().clone();
        message.insert("role".into(), Value::String(role.to_string()));

        let content = match self.schema.content_layout() {
            ContentLayout::Flat => {
                if media.is_some() {
                    warn!(
                        provider = self.schema.name(),
                        "Flat-content provider cannot carry media, attachment dropped"
                    );
                }
                Value::String(text.to_string())
            }
            ContentLayout::Blocks => {
                let mut blocks = vec![self.text_block(text)];
                if let Some(media) = media {
                    match self.image_block(media) {
                        Some(block) => blocks.push(block),
                        None => warn!(
                            provider = self.schema.name(),
                            media_type = %media.media_type,
                            "No usable image template, attachment dropped"
                        ),
                    }
                }
                Value::Array(blocks)
            }
        };
        message.insert("content".into(), content);

        Value::Object(message)
    }

    fn text_block(&self, text: &str) -> Value {
        let mut block = self.schema.text_template().clone();
        if let Some(obj) = block.as_object_mut() {
            obj.insert("text".into(), Value::String(text.to_string()));
        }
        block
    }

    fn image_block(&self, media: &Media) -> Option<Value> {
        let mut block = self.schema.image_template()?.clone();
        let obj = block.as_object_mut()?;

        match self.schema.image_style() {
            ImageStyle::Source => {
                let source = obj
                    .entry("source")
                    .or_insert_with(|| Value::Object(Map::new()));
                if !source.is_object() {
                    *source = Value::Object(Map::new());
                }
                let source = source.as_object_mut()?;
                source.insert("media_type".into(), Value::String(media.media_type.clone()));
                source.insert("data".into(), Value::String(base64_payload(&media.data)));
            }
            ImageStyle::ImageUrl => {
                let url = if is_data_uri(&media.data) {
                    media.data.clone()
                } else {
                    format!(
                        "data:{};base64,{}",
                        media.media_type,
                        base64_payload(&media.data)
                    )
                };
                let image_url = obj
                    .entry("image_url")
                    .or_insert_with(|| Value::Object(Map::new()));
                if !image_url.is_object() {
                    *image_url = Value::Object(Map::new());
                }
                image_url
                    .as_object_mut()?
                    .insert("url".into(), Value::String(url));
            }
            ImageStyle::None => return None,
        }

        Some(block)
    }
}

// ─────────────────────────────────────────────
// Base64 helpers
// ─────────────────────────────────────────────

fn is_data_uri(data: &str) -> bool {
    data.starts_with("data:") && data.contains(";base64,")
}

/// Whether `data` is already base64: a `data:..;base64,` URI, or text in the
/// base64 alphabet whose whitespace-stripped length is a multiple of 4.
pub fn is_base64(data: &str) -> bool {
    if is_data_uri(data) {
        return true;
    }
    let stripped: Vec<u8> = data.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if stripped.is_empty() || stripped.len() % 4 != 0 {
        return false;
    }
    let body_len = stripped.iter().rposition(|&b| b != b'=').map_or(0, |i| i + 1);
    let padding = stripped.len() - body_len;
    padding <= 2
        && stripped[..body_len]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// The bare base64 payload for `data`: the part after `;base64,` for a data
/// URI, `data` unchanged when it is already base64, otherwise its encoding.
pub fn base64_payload(data: &str) -> String {
    if is_data_uri(data) {
        if let Some((_, payload)) = data.split_once(";base64,") {
            return payload.to_string();
        }
    }
    if is_base64(data) {
        data.to_string()
    } else {
        STANDARD.encode(data.as_bytes())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use serde_json::json;

    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_is_base64() {
        assert!(is_base64(PNG_B64));
        assert!(is_base64("SGVsbG8="));
        assert!(is_base64("SGVs\nbG8="));
        assert!(is_base64("data:image/png;base64,SGVsbG8="));
        assert!(!is_base64("Hello"));
        assert!(!is_base64("Hello world!"));
        assert!(!is_base64("SG=V"));
        assert!(!is_base64("S==="));
        assert!(!is_base64(""));
    }

    #[test]
    fn test_base64_payload() {
        assert_eq!(base64_payload("SGVsbG8="), "SGVsbG8=");
        assert_eq!(base64_payload("Hello"), "SGVsbG8=");
        assert_eq!(base64_payload("data:image/png;base64,SGVsbG8="), "SGVsbG8=");
    }

    #[test]
    fn test_media_from_bytes() {
        let media = Media::from_bytes("image/png", b"Hi");
        assert_eq!(media.data, "SGk=");
    }

    #[test]
    fn test_flat_content() {
        let schema = Schema::from_value(&fixtures::flat_schema()).unwrap();
        let msg = MessageCompiler::new(&schema, true).compile("user", "hello", None).unwrap();
        assert_eq!(msg, json!({ "role": "user", "content": "hello" }));
    }

    #[test]
    fn test_block_content_text_only() {
        let schema = Schema::from_value(&fixtures::openai_schema()).unwrap();
        let msg = MessageCompiler::new(&schema, true).compile("user", "hi", None).unwrap();
        assert_eq!(
            msg,
            json!({ "role": "user", "content": [{ "type": "text", "text": "hi" }] })
        );
    }

    #[test]
    fn test_claude_image_block_keeps_valid_base64() {
        let schema = Schema::from_value(&fixtures::claude_schema()).unwrap();
        let media = Media::new("image/png", PNG_B64);
        let msg = MessageCompiler::new(&schema, true)
            .compile("user", "describe", Some(&media))
            .unwrap();
        let content = msg["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["text"], "describe");
        assert_eq!(content[1]["type"], "image");
        assert_eq!(content[1]["source"]["type"], "base64");
        assert_eq!(content[1]["source"]["media_type"], "image/png");
        assert_eq!(content[1]["source"]["data"], PNG_B64);
    }

    #[test]
    fn test_claude_image_block_encodes_raw_data() {
        let schema = Schema::from_value(&fixtures::claude_schema()).unwrap();
        let media = Media::new("image/png", "Hello");
        let msg = MessageCompiler::new(&schema, true)
            .compile("user", "x", Some(&media))
            .unwrap();
        assert_eq!(msg["content"][1]["source"]["data"], "SGVsbG8=");
    }

    #[test]
    fn test_openai_image_block_data_uri() {
        let schema = Schema::from_value(&fixtures::openai_schema()).unwrap();
        let media = Media::new("image/jpeg", "SGVsbG8=");
        let msg = MessageCompiler::new(&schema, true)
            .compile("user", "what is this?", Some(&media))
            .unwrap();
        assert_eq!(msg["content"][1]["type"], "image_url");
        assert_eq!(
            msg["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,SGVsbG8="
        );
    }

    #[test]
    fn test_openai_image_block_passes_data_uri_through() {
        let schema = Schema::from_value(&fixtures::openai_schema()).unwrap();
        let uri = "data:image/webp;base64,UklGRg==";
        let media = Media::new("image/webp", uri);
        let msg = MessageCompiler::new(&schema, true)
            .compile("user", "x", Some(&media))
            .unwrap();
        assert_eq!(msg["content"][1]["image_url"]["url"], uri);
    }

    #[test]
    fn test_invalid_role_rejected() {
        let schema = Schema::from_value(&fixtures::claude_schema()).unwrap();
        let err = MessageCompiler::new(&schema, true)
            .compile("system", "x", None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRole { .. }));
    }

    #[test]
    fn test_any_role_when_roles_unrestricted() {
        let schema = Schema::from_value(&fixtures::flat_schema()).unwrap();
        let compiler = MessageCompiler::new(&schema, true);
        for role in ["user", "assistant", "narrator", ""] {
            assert!(compiler.compile(role, "x", None).is_ok());
        }
    }

    #[test]
    fn test_media_on_text_only_provider() {
        let schema = Schema::from_value(&fixtures::flat_schema()).unwrap();
        let media = Media::new("image/png", PNG_B64);
        let err = MessageCompiler::new(&schema, true)
            .compile("user", "x", Some(&media))
            .unwrap_err();
        assert_eq!(err, ValidationError::MultimodalUnsupported("deepseek".into()));
    }

    #[test]
    fn test_unsupported_media_type() {
        let schema = Schema::from_value(&fixtures::claude_schema()).unwrap();
        let media = Media::new("image/tiff", PNG_B64);
        let err = MessageCompiler::new(&schema, true)
            .compile("user", "x", Some(&media))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedMediaType { .. }));
    }

    #[test]
    fn test_validation_disabled_bypasses_checks() {
        let schema = Schema::from_value(&fixtures::claude_schema()).unwrap();
        let msg = MessageCompiler::new(&schema, false)
            .compile("system", "x", None)
            .unwrap();
        assert_eq!(msg["role"], "system");

        let flat = Schema::from_value(&fixtures::flat_schema()).unwrap();
        let media = Media::new("image/png", PNG_B64);
        let msg = MessageCompiler::new(&flat, false)
            .compile("user", "x", Some(&media))
            .unwrap();
        assert_eq!(msg["content"], "x");
    }

    #[test]
    fn test_templates_not_mutated() {
        let schema = Schema::from_value(&fixtures::claude_schema()).unwrap();
        let media = Media::new("image/png", PNG_B64);
        MessageCompiler::new(&schema, true)
            .compile("user", "x", Some(&media))
            .unwrap();
        assert_eq!(schema.message_template()["role"], "");
        assert_eq!(schema.text_template()["text"], "");
        assert_eq!(schema.image_template().unwrap()["source"]["data"], "");
    }
}

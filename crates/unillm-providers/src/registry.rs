//! Built-in provider registry — schema documents compiled into the binary.
//!
//! Each entry is the full JSON schema for one provider. They are parsed on
//! demand; nothing here is validated until [`BuiltinSchemas::load`] runs.

use async_trait::async_trait;
use tracing::debug;

use unillm_core::Schema;

use crate::error::SchemaSourceError;
use crate::traits::SchemaSource;

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// One embedded schema document.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinSchema {
    /// Provider name the document is registered under (e.g. `"claude"`).
    pub name: &'static str,
    /// Raw JSON text.
    pub document: &'static str,
}

/// All providers shipped with unillm.
pub static BUILTIN_SCHEMAS: &[BuiltinSchema] = &[
    BuiltinSchema {
        name: "openai",
        document: include_str!("../schemas/openai.json"),
    },
    BuiltinSchema {
        name: "claude",
        document: include_str!("../schemas/claude.json"),
    },
    BuiltinSchema {
        name: "deepseek",
        document: include_str!("../schemas/deepseek.json"),
    },
];

/// Find an embedded schema by provider name (case-insensitive).
pub fn find_by_name(name: &str) -> Option<&'static BuiltinSchema> {
    BUILTIN_SCHEMAS
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Names of every embedded provider, in registry order.
pub fn builtin_names() -> Vec<&'static str> {
    BUILTIN_SCHEMAS.iter().map(|s| s.name).collect()
}

// ─────────────────────────────────────────────
// Source
// ─────────────────────────────────────────────

/// [`SchemaSource`] over [`BUILTIN_SCHEMAS`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinSchemas;

#[async_trait]
impl SchemaSource for BuiltinSchemas {
    async fn load(&self, provider: &str) -> Result<Schema, SchemaSourceError> {
        let builtin = find_by_name(provider)
            .ok_or_else(|| SchemaSourceError::NotFound(provider.to_string()))?;
        debug!(provider = builtin.name, "Loading built-in schema");
        Ok(Schema::from_json_str(builtin.document)?)
    }

    async fn available(&self) -> Vec<String> {
        builtin_names().into_iter().map(String::from).collect()
    }

    fn describe(&self) -> String {
        "built-in".to_string()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use unillm_core::schema::{ContentLayout, ImageStyle};

    #[test]
    fn test_registry_names() {
        assert_eq!(builtin_names(), vec!["openai", "claude", "deepseek"]);
    }

    #[test]
    fn test_find_by_name_case_insensitive() {
        assert_eq!(find_by_name("Claude").unwrap().name, "claude");
        assert!(find_by_name("gemini").is_none());
    }

    #[test]
    fn test_every_builtin_parses() {
        for builtin in BUILTIN_SCHEMAS {
            let schema = Schema::from_json_str(builtin.document)
                .unwrap_or_else(|e| panic!("{} failed to load: {e}", builtin.name));
            assert_eq!(schema.name(), builtin.name);
            assert!(schema.default_model().is_some());
            assert!(schema.features().streaming);
        }
    }

    #[test]
    fn test_builtin_shapes() {
        let openai = Schema::from_json_str(find_by_name("openai").unwrap().document).unwrap();
        assert_eq!(openai.content_layout(), ContentLayout::Blocks);
        assert_eq!(openai.image_style(), ImageStyle::ImageUrl);
        assert!(openai.is_valid_role("system"));

        let claude = Schema::from_json_str(find_by_name("claude").unwrap().document).unwrap();
        assert_eq!(claude.image_style(), ImageStyle::Source);
        assert!(!claude.is_valid_role("system"));
        assert!(claude.parameter("max_tokens").unwrap().required);
        assert_eq!(claude.last_message_role(), Some("user"));

        let deepseek = Schema::from_json_str(find_by_name("deepseek").unwrap().document).unwrap();
        assert_eq!(deepseek.content_layout(), ContentLayout::Flat);
        assert!(!deepseek.features().multimodal);
    }

    #[tokio::test]
    async fn test_builtin_source() {
        let source = BuiltinSchemas;
        let schema = source.load("deepseek").await.unwrap();
        assert_eq!(schema.display_name(), "DeepSeek");
        assert_eq!(source.available().await.len(), 3);
        assert!(matches!(
            source.load("nope").await,
            Err(SchemaSourceError::NotFound(name)) if name == "nope"
        ));
    }
}

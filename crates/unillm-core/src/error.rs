//! Error types for the context engine.
//!
//! Three kinds surface to callers:
//! - [`SchemaError`] — the schema document is malformed (raised once, at load).
//! - [`ValidationError`] — a caller operation violates a declared constraint.
//! - [`PathError`] / [`ExtractionError`] — a response does not have the shape
//!   the schema promised.

use thiserror::Error;

/// The top-level error type for all engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// ─────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────

/// A schema document failed load-time validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("schema is not valid JSON: {0}")]
    Parse(String),
}

// ─────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────

/// A caller operation violated a constraint declared by the schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("parameter `{name}`: {reason}")]
    Parameter { name: String, reason: String },

    #[error("role `{role}` is not accepted by {provider}")]
    InvalidRole { role: String, provider: String },

    #[error("model `{model}` is not offered by {provider}")]
    InvalidModel { model: String, provider: String },

    #[error("{0} does not support multimodal content")]
    MultimodalUnsupported(String),

    #[error("media type `{media_type}` is not accepted by {provider}")]
    UnsupportedMediaType { media_type: String, provider: String },

    #[error("{0} does not support system messages")]
    SystemMessageUnsupported(String),

    #[error("no API key set for {0}")]
    MissingApiKey(String),

    #[error("no model selected")]
    MissingModel,

    #[error("no messages to send")]
    NoMessages,

    #[error("last message must have role `{expected}`, found `{found}`")]
    LastMessageRole { expected: String, found: String },

    #[error("required parameter `{0}` is not set")]
    MissingParameter(String),
}

impl ValidationError {
    pub(crate) fn parameter(name: &str, reason: impl Into<String>) -> Self {
        ValidationError::Parameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

// ─────────────────────────────────────────────
// Path / extraction
// ─────────────────────────────────────────────

/// A path step could not be applied to the value reached so far.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("step {position} (`{step}`): expected an array")]
    NotAnArray { position: usize, step: String },

    #[error("step {position} (`{step}`): index out of bounds (len {len})")]
    IndexOutOfBounds {
        position: usize,
        step: String,
        len: usize,
    },

    #[error("step {position} (`{step}`): expected an object")]
    NotAnObject { position: usize, step: String },

    #[error("step {position} (`{step}`): key not found")]
    MissingKey { position: usize, step: String },
}

/// A response could not be interpreted with the schema's extraction paths.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("could not resolve {target} path {path}: {source}")]
    Path {
        target: &'static str,
        path: String,
        #[source]
        source: PathError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_field() {
        let err = SchemaError::MissingField("api.endpoint");
        assert_eq!(err.to_string(), "missing required field `api.endpoint`");
    }

    #[test]
    fn test_validation_wraps_into_error() {
        let err: Error = ValidationError::MissingModel.into();
        assert!(matches!(err, Error::Validation(ValidationError::MissingModel)));
        assert_eq!(err.to_string(), "Validation error: no model selected");
    }

    #[test]
    fn test_parameter_error_message() {
        let err = ValidationError::parameter("temperature", "must be <= 2");
        assert_eq!(err.to_string(), "parameter `temperature`: must be <= 2");
    }
}

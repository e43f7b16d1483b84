//! Errors raised by the I/O collaborators around the engine.

use serde_json::Value;
use thiserror::Error;

use unillm_core::{ExtractionError, SchemaError, ValidationError};

/// Failure talking to a provider endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Non-2xx response. `body` is the parsed JSON body, or the raw text as a
    /// JSON string when it was not JSON.
    #[error("provider returned HTTP {status}")]
    Status { status: u16, body: Value },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid header {name}")]
    InvalidHeader { name: String },

    #[error("unsupported HTTP method {0}")]
    Method(String),
}

/// Failure resolving a provider name to a schema.
#[derive(Debug, Error)]
pub enum SchemaSourceError {
    #[error("no schema found for provider '{0}'")]
    NotFound(String),

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Everything a [`SchemaProvider`](crate::SchemaProvider) round trip can fail with.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] SchemaSourceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The provider answered with an error; `message` was pulled out of the
    /// body through the schema's error path.
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

//! Seams between the synchronous engine and the outside world.

use std::collections::BTreeMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use unillm_core::Schema;

use crate::error::{SchemaSourceError, TransportError};

/// A fully-resolved provider call: what the engine built plus where to send it.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Raw text chunks of a streamed response body, in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// Moves request bodies to a provider and hands back what it said.
///
/// Implementations own retries, timeouts and connection pooling; the engine
/// never sees any of it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and parse the whole response body as JSON.
    ///
    /// A non-2xx status is reported as [`TransportError::Status`] carrying the
    /// body, so the caller can run it through the schema's error path.
    async fn send(&self, request: &OutboundRequest) -> Result<Value, TransportError>;

    /// Send a request and return the response body as a stream of text chunks.
    async fn send_streaming(&self, request: &OutboundRequest) -> Result<ChunkStream, TransportError>;
}

/// Resolves a provider name to a validated [`Schema`].
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn load(&self, provider: &str) -> Result<Schema, SchemaSourceError>;

    /// Provider names this source can resolve without a lookup, if it knows.
    async fn available(&self) -> Vec<String> {
        Vec::new()
    }

    /// Short human-readable description for logs and `status` output.
    fn describe(&self) -> String;
}

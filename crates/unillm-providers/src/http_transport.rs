//! reqwest-backed [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::TransportError;
use crate::sse::Utf8Carry;
use crate::traits::{ChunkStream, OutboundRequest, Transport};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP transport over a shared, connection-pooled `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn prepare(&self, request: &OutboundRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::Method(request.method.clone()))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let invalid = || TransportError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.insert(header_name, header_value);
        }

        Ok(self
            .client
            .request(method, &request.url)
            .headers(headers)
            .json(&request.body))
    }

    async fn dispatch(&self, request: &OutboundRequest) -> Result<reqwest::Response, TransportError> {
        debug!(method = %request.method, url = %request.url, "Sending provider request");

        let response = self.prepare(request)?.send().await.map_err(|e| {
            error!(url = %request.url, error = %e, "HTTP request failed");
            TransportError::Request {
                url: request.url.clone(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        error!(url = %request.url, status = %status, body = %text, "API error");
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<Value, TransportError> {
        let response = self.dispatch(request).await?;
        let text = response.text().await.map_err(|e| TransportError::Request {
            url: request.url.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn send_streaming(&self, request: &OutboundRequest) -> Result<ChunkStream, TransportError> {
        let response = self.dispatch(request).await?;
        let url = request.url.clone();
        let mut carry = Utf8Carry::default();

        let chunks = response.bytes_stream().map(move |chunk| match chunk {
            Ok(bytes) => Ok(carry.decode(&bytes)),
            Err(e) => Err(TransportError::Request {
                url: url.clone(),
                message: e.to_string(),
            }),
        });
        Ok(Box::pin(chunks))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

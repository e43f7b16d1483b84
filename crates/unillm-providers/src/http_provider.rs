//! Schema-driven provider session.
//!
//! [`SchemaProvider`] owns one [`Context`] and a [`Transport`]. A chat turn
//! appends the user message, checks the context is sendable, builds the
//! request, sends it, extracts the reply and appends it as the assistant
//! message. A turn that fails leaves the conversation exactly as it was.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use unillm_core::config::Config;
use unillm_core::response::{is_end_of_stream, STREAM_DONE};
use unillm_core::{Context, KeyStore, Media};

use crate::error::{ProviderError, TransportError};
use crate::sse::SseDecoder;
use crate::traits::{OutboundRequest, SchemaSource, Transport};

// ─────────────────────────────────────────────
// Reply
// ─────────────────────────────────────────────

/// Outcome of one chat turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatReply {
    /// Assistant text.
    pub text: String,
    /// Usage block, when the provider reported one on a non-streamed reply.
    pub usage: Option<Value>,
    /// Whether the reply was received as a stream of deltas.
    pub streamed: bool,
}

// ─────────────────────────────────────────────
// SchemaProvider
// ─────────────────────────────────────────────

/// One provider conversation: a context plus the transport that carries it.
pub struct SchemaProvider {
    context: Context,
    transport: Arc<dyn Transport>,
    endpoint: Option<String>,
    extra_headers: BTreeMap<String, String>,
}

impl std::fmt::Debug for SchemaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaProvider")
            .field("context", &self.context)
            .field("endpoint", &self.url())
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaProvider {
    pub fn new(context: Context, transport: Arc<dyn Transport>) -> Self {
        Self {
            context,
            transport,
            endpoint: None,
            extra_headers: BTreeMap::new(),
        }
    }

    /// Send to `endpoint` instead of the schema's endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Headers sent on top of the schema's. Schema headers win on conflict.
    pub fn with_extra_headers(mut self, headers: &HashMap<String, String>) -> Self {
        self.extra_headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn display_name(&self) -> &str {
        self.context.schema().display_name()
    }

    /// URL requests go to.
    pub fn url(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.context.endpoint())
    }

    fn outbound(&self, body: Value) -> OutboundRequest {
        let mut headers = self.context.headers().clone();
        for (name, value) in &self.extra_headers {
            // Header names are case-insensitive; a schema header always wins.
            if !headers.keys().any(|k| k.eq_ignore_ascii_case(name)) {
                headers.insert(name.clone(), value.clone());
            }
        }
        OutboundRequest {
            method: self.context.method().to_string(),
            url: self.url().to_string(),
            headers,
            body,
        }
    }

    /// Append the user turn and make sure the context can be sent.
    fn begin_turn(&mut self, text: &str, media: Option<&Media>) -> Result<(), ProviderError> {
        self.context.add_user_message(text, media)?;
        if let Err(e) = self.context.validate_for_send() {
            self.context.pop_message();
            return Err(e.into());
        }
        Ok(())
    }

    /// Turn a transport failure into the provider's own error message.
    fn api_error(&self, err: TransportError) -> ProviderError {
        match err {
            TransportError::Status { status, body } => ProviderError::Api {
                provider: self.context.provider_name().to_string(),
                status,
                message: self.context.extract_error(&body),
            },
            other => other.into(),
        }
    }

    /// Send one user turn and wait for the whole reply.
    pub async fn chat(&mut self, text: &str, media: Option<&Media>) -> Result<ChatReply, ProviderError> {
        self.begin_turn(text, media)?;
        match self.exchange().await {
            Ok(reply) => self.finish_turn(reply),
            Err(e) => {
                self.context.pop_message();
                Err(e)
            }
        }
    }

    async fn exchange(&self) -> Result<ChatReply, ProviderError> {
        let request = self.outbound(self.context.build_request(false));
        debug!(
            provider = self.context.provider_name(),
            model = self.context.model().unwrap_or("?"),
            messages = self.context.messages().len(),
            "Calling provider"
        );

        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| self.api_error(e))?;

        let text = self.context.extract_text(&response).map_err(|e| {
            error!(provider = self.context.provider_name(), error = %e, "Unexpected response shape");
            e
        })?;
        Ok(ChatReply {
            text,
            usage: self.context.extract_usage(&response),
            streamed: false,
        })
    }

    /// Send one user turn and feed text deltas to `on_delta` as they arrive.
    ///
    /// Falls back to a single non-streamed exchange (delivered as one delta)
    /// when the provider cannot stream or the caller pinned `stream` to false.
    pub async fn chat_stream<F>(
        &mut self,
        text: &str,
        media: Option<&Media>,
        mut on_delta: F,
    ) -> Result<ChatReply, ProviderError>
    where
        F: FnMut(&str) + Send,
    {
        self.begin_turn(text, media)?;

        let body = self.context.build_request(true);
        let result = if body.get("stream") == Some(&Value::Bool(true)) {
            self.stream_exchange(body, &mut on_delta).await
        } else {
            debug!(provider = self.context.provider_name(), "Streaming not in effect, sending whole request");
            self.exchange().await.map(|reply| {
                on_delta(&reply.text);
                reply
            })
        };

        match result {
            Ok(reply) => self.finish_turn(reply),
            Err(e) => {
                self.context.pop_message();
                Err(e)
            }
        }
    }

    async fn stream_exchange<F>(&self, body: Value, on_delta: &mut F) -> Result<ChatReply, ProviderError>
    where
        F: FnMut(&str) + Send,
    {
        let request = self.outbound(body);
        let mut chunks = self
            .transport
            .send_streaming(&request)
            .await
            .map_err(|e| self.api_error(e))?;

        let mut decoder = SseDecoder::new();
        let mut text = String::new();
        let mut done = false;

        while !done {
            let payloads = match chunks.next().await {
                Some(chunk) => decoder.push(&chunk?),
                None => {
                    done = true;
                    decoder.finish()
                }
            };
            for payload in payloads {
                if self.handle_payload(&payload, &mut text, on_delta)? {
                    done = true;
                    break;
                }
            }
        }

        debug!(provider = self.context.provider_name(), chars = text.len(), "Stream complete");
        Ok(ChatReply {
            text,
            usage: None,
            streamed: true,
        })
    }

    /// Process one event payload. Returns true at end of stream.
    fn handle_payload<F>(&self, payload: &str, text: &mut String, on_delta: &mut F) -> Result<bool, ProviderError>
    where
        F: FnMut(&str),
    {
        let Ok(event) = serde_json::from_str::<Value>(payload) else {
            return Ok(payload.trim() == STREAM_DONE);
        };
        if is_end_of_stream(&event) {
            return Ok(true);
        }
        if event.get("type").and_then(Value::as_str) == Some("error") {
            let message = self.context.extract_error(&event);
            warn!(provider = self.context.provider_name(), message = %message, "Error event in stream");
            return Err(ProviderError::Api {
                provider: self.context.provider_name().to_string(),
                status: 200,
                message,
            });
        }
        let delta = self.context.extract_delta(&event);
        if !delta.is_empty() {
            on_delta(&delta);
            text.push_str(&delta);
        }
        Ok(false)
    }

    fn finish_turn(&mut self, reply: ChatReply) -> Result<ChatReply, ProviderError> {
        if let Err(e) = self.context.add_assistant_message(&reply.text) {
            warn!(provider = self.context.provider_name(), error = %e, "Reply not kept in history");
        }
        Ok(reply)
    }
}

// ─────────────────────────────────────────────
// Builder (convenience)
// ─────────────────────────────────────────────

/// Build a ready-to-use provider session by name.
///
/// Loads the schema from `source`, applies the configured defaults, key,
/// endpoint override and extra headers.
pub async fn create_provider(
    name: &str,
    config: &Config,
    source: &dyn SchemaSource,
    keys: &dyn KeyStore,
    transport: Arc<dyn Transport>,
) -> Result<SchemaProvider, ProviderError> {
    let schema = source.load(name).await?;
    let mut context = Context::new(Arc::new(schema), config.context_options());

    match keys.get_key(name) {
        Some(key) => context.set_api_key(key)?,
        None => warn!(provider = name, "No API key found"),
    }

    let mut provider = SchemaProvider::new(context, transport);
    if let Some(settings) = config.provider(name) {
        if let Some(endpoint) = settings.endpoint.as_deref().filter(|e| !e.is_empty()) {
            provider = provider.with_endpoint(endpoint);
        }
        if let Some(headers) = &settings.extra_headers {
            provider = provider.with_extra_headers(headers);
        }
    }

    debug!(
        provider = name,
        source = %source.describe(),
        url = provider.url(),
        "Created provider"
    );
    Ok(provider)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

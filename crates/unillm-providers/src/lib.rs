//! I/O collaborators for the unillm engine.
//!
//! `unillm-core` builds requests and reads responses but never touches the
//! network or the filesystem. This crate supplies the other half.
//!
//! # Architecture
//!
//! - [`traits::Transport`] / [`traits::SchemaSource`] — the two seams
//! - [`registry`] — schemas compiled into the binary (openai, claude, deepseek)
//! - [`schema_source`] — directory, remote and chained schema lookup
//! - [`http_transport::HttpTransport`] — reqwest transport, JSON and streamed
//! - [`sse`] — incremental server-sent-events decoding
//! - [`http_provider::SchemaProvider`] — one provider conversation end to end
//! - [`transcription`] — Whisper speech-to-text

pub mod error;
pub mod http_provider;
pub mod http_transport;
pub mod registry;
pub mod schema_source;
pub mod sse;
pub mod traits;
pub mod transcription;

// Re-export main types for convenience
pub use error::{ProviderError, SchemaSourceError, TransportError};
pub use http_provider::{create_provider, ChatReply, SchemaProvider};
pub use http_transport::HttpTransport;
pub use registry::{BuiltinSchemas, BUILTIN_SCHEMAS};
pub use schema_source::{ChainedSchemaSource, FileSchemaSource, HttpSchemaSource};
pub use sse::SseDecoder;
pub use traits::{ChunkStream, OutboundRequest, SchemaSource, Transport};
pub use transcription::{Transcript, TranscriptionProvider, WhisperTranscriber};

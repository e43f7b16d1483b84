//! Schema-driven context engine for unillm.
//!
//! One uniform object model over LLM HTTP APIs whose request bodies, auth
//! headers, response envelopes and stream events all differ. Each provider is
//! described by a JSON [`Schema`]; a [`Context`] built from it turns generic
//! operations into provider-correct requests and pulls normalized answers back
//! out of raw responses.
//!
//! # Architecture
//!
//! - [`path`] — JSON path resolver used by every extraction
//! - [`schema`] — validated provider description
//! - [`validator`] — generic parameter constraint checks
//! - [`message`] — message compiler (flat vs. content blocks, image styles)
//! - [`request`] — request builder
//! - [`response`] — response / stream-delta extractor
//! - [`context`] — the stateful facade tying them together
//! - [`keys`], [`config`] — key resolution and configuration
//!
//! The engine is synchronous and does no I/O; transport lives in
//! `unillm-providers`.

pub mod config;
pub mod context;
pub mod error;
pub mod keys;
pub mod message;
pub mod path;
pub mod request;
pub mod response;
pub mod schema;
pub mod utils;
pub mod validator;

#[cfg(test)]
mod fixtures;

// Re-export main types for convenience
pub use context::{Context, ContextOptions};
pub use error::{Error, ExtractionError, PathError, Result, SchemaError, ValidationError};
pub use keys::{KeyStore, TieredKeyStore};
pub use message::Media;
pub use path::{JsonPath, PathStep};
pub use request::RequestDefaults;
pub use schema::Schema;

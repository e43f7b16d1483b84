//! Request builder — assembles one provider-shaped request body from the
//! accumulated context state.
//!
//! Building is a pure read: the schema's request template is cloned, the
//! message list is copied, and nothing the caller owns is modified.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::message::MessageCompiler;
use crate::schema::Schema;

/// Fallback values applied when the caller never set the parameter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestDefaults {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// A read-only view of everything a request is built from.
#[derive(Clone, Copy, Debug)]
pub struct RequestState<'a> {
    pub model: Option<&'a str>,
    pub system_message: Option<&'a str>,
    pub messages: &'a [Value],
    pub parameters: &'a HashMap<String, Value>,
    pub defaults: &'a RequestDefaults,
}

/// Build the request body.
///
/// Order of application: template → model → system message → messages →
/// caller parameters (overwrite template fields) → fallback defaults →
/// `stream` flag → null stripping.
pub fn build_request(schema: &Schema, state: RequestState<'_>, streaming: bool) -> Value {
    let mut request: Map<String, Value> = schema.request_template().clone();

    if let Some(model) = state.model {
        request.insert("model".into(), Value::String(model.to_string()));
    }

    let mut messages: Vec<Value> = state.messages.to_vec();

    if let Some(system) = state.system_message {
        if schema.features().system_messages {
            if schema.valid_roles().contains("system") {
                let compiled = MessageCompiler::new(schema, false).render("system", system, None);
                messages.insert(0, compiled);
            } else {
                request.insert(system_field(schema).into(), Value::String(system.to_string()));
            }
        }
    }

    let message_count = messages.len();
    request.insert("messages".into(), Value::Array(messages));

    for (key, value) in state.parameters {
        request.insert(key.clone(), value.clone());
    }

    if let Some(max_tokens) = state.defaults.max_tokens {
        apply_default(&mut request, state.parameters, "max_tokens", Value::from(max_tokens));
    }
    if let Some(temperature) = state.defaults.temperature {
        apply_default(&mut request, state.parameters, "temperature", Value::from(temperature));
    }

    if !state.parameters.contains_key("stream") {
        let stream = streaming && schema.features().streaming;
        request.insert("stream".into(), Value::Bool(stream));
    }

    let mut request = Value::Object(request);
    strip_nulls(&mut request);

    debug!(
        provider = schema.name(),
        model = state.model.unwrap_or("-"),
        messages = message_count,
        parameters = state.parameters.len(),
        stream = %request["stream"],
        "Built request"
    );

    request
}

/// Top-level field that carries the system prompt when `system` is not a role.
fn system_field(schema: &Schema) -> &str {
    match schema.system_message().field.as_deref() {
        Some(field) if !field.is_empty() && field != "messages" => field,
        _ => "system",
    }
}

fn apply_default(
    request: &mut Map<String, Value>,
    parameters: &HashMap<String, Value>,
    key: &str,
    value: Value,
) {
    if parameters.contains_key(key) {
        return;
    }
    if request.get(key).map_or(true, Value::is_null) {
        request.insert(key.to_string(), value);
    }
}

/// Remove every object field whose value is `null`, recursively.
/// Arrays are walked but their elements are never removed.
pub fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                strip_nulls(v);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_nulls(item);
            }
        }
        _ => {}
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

    fn contains_null_field(value: &Value) -> bool {
        match value {
            Value::Object(map) => map.values().any(|v| v.is_null() || contains_null_field(v)),
            Value::Array(items) => items.iter().any(contains_null_field),
            _ => false,
        }
    }

    fn state<'a>(
        messages: &'a [Value],
        parameters: &'a HashMap<String, Value>,
        defaults: &'a RequestDefaults,
    ) -> RequestState<'a> {
        RequestState {
            model: Some("gpt-4o"),
            system_message: None,
            messages,
            parameters,
            defaults,
        }
    }

    #[test]
    fn test_strip_nulls_nested() {
        let mut value = json!({
            "a": null,
            "b": { "c": null, "d": 1 },
            "e": [null, { "f": null, "g": "x" }]
        });
        strip_nulls(&mut value);
        assert_eq!(value, json!({ "b": { "d": 1 }, "e": [null, { "g": "x" }] }));
    }

    #[test]
    fn test_template_placeholders_removed() {
        let schema = Schema::from_value(&fixtures::openai_schema()).unwrap();
        let params = HashMap::new();
        let defaults = RequestDefaults::default();
        let request = build_request(&schema, state(&[], &params, &defaults), false);
        assert!(!contains_null_field(&request));
        assert!(request.get("temperature").is_none());
        assert!(request.get("max_tokens").is_none());
        assert_eq!(request["response_format"], json!({}));
        assert_eq!(request["model"], "gpt-4o");
        assert_eq!(request["stream"], false);
    }

    #[test]
    fn test_parameters_overwrite_template() {
        let schema = Schema::from_value(&fixtures::openai_schema()).unwrap();
        let mut params = HashMap::new();
        params.insert("temperature".to_string(), json!(0.2));
        params.insert("response_format".to_string(), json!({ "type": "json_object" }));
        let defaults = RequestDefaults::default();
        let request = build_request(&schema, state(&[], &params, &defaults), false);
        assert_eq!(request["temperature"], 0.2);
        assert_eq!(request["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_fallback_defaults() {
        let schema = Schema::from_value(&fixtures::openai_schema()).unwrap();
        let mut params = HashMap::new();
        params.insert("temperature".to_string(), json!(0.1));
        let defaults = RequestDefaults {
            max_tokens: Some(1024),
            temperature: Some(0.7),
        };
        let request = build_request(&schema, state(&[], &params, &defaults), false);
        assert_eq!(request["max_tokens"], 1024);
        assert_eq!(request["temperature"], 0.1);
    }

    #[test]
    fn test_stream_resolution() {
        let schema = Schema::from_value(&fixtures::openai_schema()).unwrap();
        let defaults = RequestDefaults::default();
        let empty = HashMap::new();
        assert_eq!(build_request(&schema, state(&[], &empty, &defaults), true)["stream"], true);
        assert_eq!(build_request(&schema, state(&[], &empty, &defaults), false)["stream"], false);

        let mut explicit = HashMap::new();
        explicit.insert("stream".to_string(), json!(false));
        assert_eq!(build_request(&schema, state(&[], &explicit, &defaults), true)["stream"], false);
    }

    #[test]
    fn test_stream_forced_false_without_support() {
        let mut raw = fixtures::flat_schema();
        raw["features"]["streaming"] = json!(false);
        let schema = Schema::from_value(&raw).unwrap();
        let defaults = RequestDefaults::default();
        let params = HashMap::new();
        let request = build_request(&schema, state(&[], &params, &defaults), true);
        assert_eq!(request["stream"], false);
    }

    #[test]
    fn test_system_prepended_when_role_valid() {
        let schema = Schema::from_value(&fixtures::openai_schema()).unwrap();
        let params = HashMap::new();
        let defaults = RequestDefaults::default();
        let messages = vec![json!({ "role": "user", "content": [{ "type": "text", "text": "hi" }] })];
        let mut st = state(&messages, &params, &defaults);
        st.system_message = Some("Be brief.");
        let request = build_request(&schema, st, false);
        let sent = request["messages"].as_array().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["role"], "system");
        assert_eq!(sent[0]["content"][0]["text"], "Be brief.");
        assert!(request.get("system").is_none());
    }

    #[test]
    fn test_system_as_top_level_field() {
        let schema = Schema::from_value(&fixtures::claude_schema()).unwrap();
        let params = HashMap::new();
        let defaults = RequestDefaults::default();
        let messages = vec![json!({ "role": "user", "content": [] })];
        let mut st = state(&messages, &params, &defaults);
        st.system_message = Some("You are terse.");
        let request = build_request(&schema, st, false);
        assert_eq!(request["system"], "You are terse.");
        let sent = request["messages"].as_array().unwrap();
        assert!(sent.iter().all(|m| m["role"] != "system"));
    }

    #[test]
    fn test_caller_messages_untouched() {
        let schema = Schema::from_value(&fixtures::openai_schema()).unwrap();
        let params = HashMap::new();
        let defaults = RequestDefaults::default();
        let messages = vec![json!({ "role": "user", "content": [] })];
        let mut st = state(&messages, &params, &defaults);
        st.system_message = Some("sys");
        build_request(&schema, st, false);
        assert_eq!(messages.len(), 1);
        assert_eq!(schema.request_template()["messages"], json!([]));
    }
}

//! Schema documents shared by the unit tests.

use serde_json::{json, Value};

/// OpenAI-style: content-block array, `image_url` images, `system` role.
pub fn openai_schema() -> Value {
    json!({
        "provider": { "name": "openai", "display_name": "OpenAI" },
        "api": { "endpoint": "https://api.openai.com/v1/chat/completions", "method": "post" },
        "authentication": { "type": "bearer", "key_placeholder": "{{API_KEY}}" },
        "headers": {
            "required": {
                "Authorization": "Bearer {{API_KEY}}",
                "Content-Type": "application/json"
            },
            "optional": { "OpenAI-Organization": "org-unillm" }
        },
        "models": { "available": ["gpt-4o", "gpt-4o-mini"], "default": "gpt-4o" },
        "request_template": {
            "model": null,
            "messages": [],
            "temperature": null,
            "max_tokens": null,
            "stream": false,
            "response_format": { "type": null }
        },
        "parameters": {
            "temperature": { "type": "float", "min": 0.0, "max": 2.0, "default": 1.0 },
            "max_tokens": { "type": "integer", "min": 1, "max": 4096 },
            "top_p": { "type": "number", "min": 0.0, "max": 1.0 },
            "reasoning_effort": { "type": "string", "enum": ["low", "medium", "high"] },
            "seed": { "type": "integer", "enum": [1, 2, 3] },
            "stop": { "type": "array" },
            "stream": { "type": "boolean" },
            "user": { "type": "string", "max_length": 8 }
        },
        "message_roles": ["system", "user", "assistant"],
        "system_message": { "supported": true, "field": "messages", "role": "system" },
        "multimodal": { "supported": true, "supported_types": ["image"] },
        "message_format": {
            "structure": { "role": "", "content": [] },
            "content_types": {
                "text": { "type": "text", "text": "" },
                "image": { "type": "image_url", "image_url": { "url": "", "detail": null } }
            }
        },
        "response_format": {
            "success": {
                "text_path": ["choices", 0, "message", "content"],
                "content_path": ["choices", 0, "message"],
                "usage_path": ["usage"]
            },
            "error": { "error_path": ["error", "message"] },
            "stream": { "content_delta_path": ["choices", 0, "delta", "content"] }
        },
        "features": { "streaming": true, "multimodal": true, "system_messages": true }
    })
}

/// Claude-style: `source` images, system prompt as a top-level field.
pub fn claude_schema() -> Value {
    json!({
        "provider": { "name": "claude", "display_name": "Anthropic Claude" },
        "api": { "endpoint": "https://api.anthropic.com/v1/messages", "method": "POST" },
        "authentication": { "type": "header", "key_placeholder": "{{API_KEY}}" },
        "headers": {
            "required": {
                "x-api-key": "{{API_KEY}}",
                "anthropic-version": "2023-06-01",
                "content-type": "application/json"
            }
        },
        "models": {
            "available": ["claude-sonnet-4-20250514", "claude-3-5-haiku-20241022"],
            "default": "claude-sonnet-4-20250514"
        },
        "request_template": {
            "model": null,
            "max_tokens": null,
            "messages": [],
            "system": null,
            "stream": false
        },
        "parameters": {
            "max_tokens": { "type": "integer", "min": 1, "max": 8192, "required": true },
            "temperature": { "type": "float", "min": 0.0, "max": 1.0 }
        },
        "message_roles": ["user", "assistant"],
        "system_message": { "supported": true, "field": "system" },
        "multimodal": {
            "supported": true,
            "supported_types": ["image/jpeg", "image/png", "image/gif", "image/webp"]
        },
        "message_format": {
            "structure": { "role": "", "content": [] },
            "content_types": {
                "text": { "type": "text", "text": "" },
                "image": {
                    "type": "image",
                    "source": { "type": "base64", "media_type": "", "data": "" }
                }
            }
        },
        "response_format": {
            "success": {
                "text_path": ["content", 0, "text"],
                "content_path": ["content"],
                "usage_path": ["usage"]
            },
            "error": { "error_path": ["error", "message"] },
            "stream": { "content_delta_path": ["delta", "text"] }
        },
        "features": { "streaming": true, "multimodal": true, "system_messages": true },
        "validation": { "message_validation": { "last_message_role": "user" } }
    })
}

/// Flat-string content, no role restriction, no system or multimodal support.
pub fn flat_schema() -> Value {
    json!({
        "provider": { "name": "deepseek", "display_name": "DeepSeek" },
        "api": { "endpoint": "https://api.deepseek.com/chat/completions" },
        "authentication": { "type": "bearer", "key_placeholder": "<KEY>" },
        "headers": { "required": { "Authorization": "Bearer <KEY>" } },
        "models": { "available": [], "default": null },
        "request_template": { "model": null, "messages": [], "stream": null },
        "parameters": {},
        "system_message": { "supported": false },
        "message_format": {
            "structure": { "role": "", "content": "<TEXT_CONTENT>" },
            "content_types": { "text": { "type": "text", "text": "" } }
        },
        "response_format": {
            "success": { "text_path": ["choices", "0", "message", "content"] },
            "error": { "error_path": ["error", "message"] }
        },
        "features": { "streaming": true, "multimodal": false, "system_messages": false }
    })
}

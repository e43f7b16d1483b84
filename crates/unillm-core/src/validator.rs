//! Parameter validator — one generic rule engine for every schema-declared
//! parameter (temperature, max_tokens, top_p, …).
//!
//! Parameters without a constraint record pass: schemas are not closed
//! vocabularies.

use serde_json::Value;

use crate::error::ValidationError;
use crate::schema::{ParamType, ParameterSpec, Schema};

/// Validate `value` for parameter `name` against `schema`'s constraint record.
pub fn validate_parameter(schema: &Schema, name: &str, value: &Value) -> Result<(), ValidationError> {
    if value.is_null() {
        return Err(ValidationError::parameter(name, "value must not be null"));
    }
    match schema.parameter(name) {
        Some(spec) => check_constraints(name, spec, value),
        None => Ok(()),
    }
}

/// Apply one constraint record, in order: length, enum, type, range.
pub fn check_constraints(name: &str, spec: &ParameterSpec, value: &Value) -> Result<(), ValidationError> {
    if value.is_null() {
        return Err(ValidationError::parameter(name, "value must not be null"));
    }

    if let (Some(max_len), Some(s)) = (spec.max_length, value.as_str()) {
        let len = s.chars().count();
        if len > max_len {
            return Err(ValidationError::parameter(
                name,
                format!("length {len} exceeds max_length {max_len}"),
            ));
        }
    }

    if let Some(allowed) = &spec.allowed {
        if !allowed.iter().any(|candidate| candidate == value) {
            let options = allowed
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ValidationError::parameter(
                name,
                format!("{value} is not one of [{options}]"),
            ));
        }
    }

    if let Some(kind) = spec.kind {
        if !matches_type(kind, value) {
            return Err(ValidationError::parameter(
                name,
                format!("expected {}, got {value}", type_name(kind)),
            ));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = spec.min {
            if n < min {
                return Err(ValidationError::parameter(name, format!("{n} is below min {min}")));
            }
        }
        if let Some(max) = spec.max {
            if n > max {
                return Err(ValidationError::parameter(name, format!("{n} is above max {max}")));
            }
        }
    }

    Ok(())
}

/// Storage form of `value` for parameter `name`: a whole-number float for an
/// `integer` parameter becomes a JSON integer. Anything else is returned as is.
pub fn normalize_parameter(schema: &Schema, name: &str, value: Value) -> Value {
    let integer = schema.parameter(name).and_then(|spec| spec.kind) == Some(ParamType::Integer);
    match value.as_f64() {
        Some(f) if integer && value.is_f64() && f.is_finite() && f.fract() == 0.0 => {
            whole_to_integer(f).unwrap_or(value)
        }
        _ => value,
    }
}

fn whole_to_integer(f: f64) -> Option<Value> {
    if f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else if f >= 0.0 && f < u64::MAX as f64 {
        Some(Value::from(f as u64))
    } else {
        None
    }
}

fn matches_type(kind: ParamType, value: &Value) -> bool {
    match kind {
        ParamType::Integer => is_whole_number(value),
        ParamType::Float | ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::String => value.is_string(),
        ParamType::Array => value.is_array(),
        ParamType::Object => value.is_object(),
        ParamType::Other => true,
    }
}

fn is_whole_number(value: &Value) -> bool {
    if value.is_i64() || value.is_u64() {
        return true;
    }
    value
        .as_f64()
        .map_or(false, |f| f.is_finite() && f.fract() == 0.0)
}

fn type_name(kind: ParamType) -> &'static str {
    match kind {
        ParamType::Integer => "an integer",
        ParamType::Float | ParamType::Number => "a number",
        ParamType::Boolean => "a boolean",
        ParamType::String => "a string",
        ParamType::Array => "an array",
        ParamType::Object => "an object",
        ParamType::Other => "a value",
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

    fn schema() -> Schema {
        Schema::from_value(&fixtures::openai_schema()).unwrap()
    }

    #[test]
    fn test_null_rejected_even_when_undeclared() {
        let s = schema();
        assert!(validate_parameter(&s, "whatever", &Value::Null).is_err());
        assert!(validate_parameter(&s, "temperature", &Value::Null).is_err());
    }

    #[test]
    fn test_unknown_parameter_passes() {
        let s = schema();
        assert!(validate_parameter(&s, "presence_penalty", &json!("anything")).is_ok());
    }

    #[test]
    fn test_range_boundaries_inclusive() {
        let s = schema();
        assert!(validate_parameter(&s, "temperature", &json!(0.0)).is_ok());
        assert!(validate_parameter(&s, "temperature", &json!(2.0)).is_ok());
        assert!(validate_parameter(&s, "temperature", &json!(1.3)).is_ok());
        assert!(validate_parameter(&s, "temperature", &json!(-0.01)).is_err());
        assert!(validate_parameter(&s, "temperature", &json!(2.01)).is_err());
        assert!(validate_parameter(&s, "max_tokens", &json!(1)).is_ok());
        assert!(validate_parameter(&s, "max_tokens", &json!(4096)).is_ok());
        assert!(validate_parameter(&s, "max_tokens", &json!(0)).is_err());
        assert!(validate_parameter(&s, "max_tokens", &json!(4097)).is_err());
    }

    #[test]
    fn test_integer_type() {
        let s = schema();
        assert!(validate_parameter(&s, "max_tokens", &json!(100.0)).is_ok());
        assert!(validate_parameter(&s, "max_tokens", &json!(100.5)).is_err());
        assert!(validate_parameter(&s, "max_tokens", &json!("100")).is_err());
    }

    #[test]
    fn test_whole_float_normalized_for_integer_params() {
        let s = schema();
        let stored = normalize_parameter(&s, "max_tokens", json!(100.0));
        assert!(stored.is_u64() || stored.is_i64());
        assert_eq!(stored, json!(100));
        assert_eq!(normalize_parameter(&s, "max_tokens", json!(-3.0)), json!(-3));
        // Float parameters and undeclared ones keep their value.
        assert!(normalize_parameter(&s, "temperature", json!(1.0)).is_f64());
        assert!(normalize_parameter(&s, "whatever", json!(2.0)).is_f64());
        assert_eq!(normalize_parameter(&s, "max_tokens", json!(100.5)), json!(100.5));
    }

    #[test]
    fn test_float_accepts_integers() {
        let s = schema();
        assert!(validate_parameter(&s, "temperature", &json!(1)).is_ok());
        assert!(validate_parameter(&s, "top_p", &json!(1)).is_ok());
        assert!(validate_parameter(&s, "temperature", &json!("0.5")).is_err());
    }

    #[test]
    fn test_enum_exact_membership() {
        let s = schema();
        assert!(validate_parameter(&s, "reasoning_effort", &json!("low")).is_ok());
        assert!(validate_parameter(&s, "reasoning_effort", &json!("LOW")).is_err());
        assert!(validate_parameter(&s, "seed", &json!(2)).is_ok());
        // Same text, different JSON type.
        assert!(validate_parameter(&s, "seed", &json!("2")).is_err());
        assert!(validate_parameter(&s, "seed", &json!(4)).is_err());
    }

    #[test]
    fn test_max_length() {
        let s = schema();
        assert!(validate_parameter(&s, "user", &json!("abcdefgh")).is_ok());
        assert!(validate_parameter(&s, "user", &json!("abcdefghi")).is_err());
    }

    #[test]
    fn test_boolean_and_array_types() {
        let s = schema();
        assert!(validate_parameter(&s, "stream", &json!(true)).is_ok());
        assert!(validate_parameter(&s, "stream", &json!("true")).is_err());
        assert!(validate_parameter(&s, "stop", &json!(["\n\n"])).is_ok());
        assert!(validate_parameter(&s, "stop", &json!("\n\n")).is_err());
    }

    #[test]
    fn test_error_names_parameter() {
        let s = schema();
        let err = validate_parameter(&s, "top_p", &json!(3)).unwrap_err();
        match err {
            ValidationError::Parameter { name, reason } => {
                assert_eq!(name, "top_p");
                assert!(reason.contains("max"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_other_type_unchecked() {
        let spec = ParameterSpec {
            kind: Some(ParamType::Other),
            ..Default::default()
        };
        assert!(check_constraints("logit_bias", &spec, &json!({"50256": -100})).is_ok());
    }
}

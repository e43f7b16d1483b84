//! Path resolver — walks a JSON value by object-key / array-index steps.
//!
//! Schemas express extraction paths as JSON arrays such as
//! `["choices", 0, "message", "content"]`. A JSON number, or a string made
//! only of ASCII digits, is an index step; anything else is a key step.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::PathError;

/// One step of a [`JsonPath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

impl PathStep {
    /// Parse a step from its textual form (`"0"` → index, `"text"` → key).
    pub fn parse(step: &str) -> Self {
        if !step.is_empty() && step.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = step.parse::<usize>() {
                return PathStep::Index(index);
            }
        }
        PathStep::Key(step.to_string())
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(key) => f.write_str(key),
            PathStep::Index(index) => write!(f, "{index}"),
        }
    }
}

/// An ordered sequence of steps into a JSON document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct JsonPath(Vec<PathStep>);

impl JsonPath {
    pub fn new(steps: Vec<PathStep>) -> Self {
        JsonPath(steps)
    }

    /// Build a path from textual steps, e.g. `JsonPath::from_strs(&["delta", "text"])`.
    pub fn from_strs(steps: &[&str]) -> Self {
        JsonPath(steps.iter().map(|s| PathStep::parse(s)).collect())
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve this path against `value`. See [`resolve`].
    pub fn resolve<'a>(&self, value: &'a Value) -> Result<&'a Value, PathError> {
        resolve(value, self)
    }
}

impl TryFrom<Vec<Value>> for JsonPath {
    type Error = String;

    fn try_from(raw: Vec<Value>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|step| match step {
                Value::String(s) => Ok(PathStep::parse(&s)),
                Value::Number(n) => n
                    .as_u64()
                    .map(|i| PathStep::Index(i as usize))
                    .ok_or_else(|| format!("path index must be a non-negative integer, got {n}")),
                other => Err(format!("path step must be a string or integer, got {other}")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(JsonPath)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{step}")?;
        }
        f.write_str("]")
    }
}

/// Walk `value` step by step and return the value reached.
///
/// Index steps require an array with the index in bounds; key steps require
/// an object containing the key. The first failing step is reported with its
/// position. An empty path returns `value` itself.
pub fn resolve<'a>(value: &'a Value, path: &JsonPath) -> Result<&'a Value, PathError> {
    let mut current = value;
    for (position, step) in path.steps().iter().enumerate() {
        current = match step {
            PathStep::Index(index) => {
                let items = current.as_array().ok_or_else(|| PathError::NotAnArray {
                    position,
                    step: step.to_string(),
                })?;
                items.get(*index).ok_or_else(|| PathError::IndexOutOfBounds {
                    position,
                    step: step.to_string(),
                    len: items.len(),
                })?
            }
            PathStep::Key(key) => {
                let map = current.as_object().ok_or_else(|| PathError::NotAnObject {
                    position,
                    step: step.to_string(),
                })?;
                map.get(key).ok_or_else(|| PathError::MissingKey {
                    position,
                    step: step.to_string(),
                })?
            }
        };
    }
    Ok(current)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

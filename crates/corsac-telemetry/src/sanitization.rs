//! Payload sanitization: field redaction and size guards

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Marker substituted for the value of a redacted field.
pub const REDACTED_MARKER: &str = "[REDACTED]";

/// Marker substituted for an entire payload over the size limit.
pub const TRUNCATED_MARKER: &str = "[TRUNCATED]";

/// Marker substituted when a payload cannot be serialized at all.
pub const UNSERIALIZABLE_MARKER: &str = "[unserializable payload]";

/// Redacts configured field names from structured payloads and replaces
/// oversized payloads wholesale.
///
/// Field matching is by exact key, case-sensitive, at every mapping
/// nesting level and one level inside sequences. No operation on this
/// type can fail; serialization problems degrade to marker strings.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    redacted_fields: HashSet<String>,
    max_payload_bytes: usize,
}

impl Sanitizer {
    pub fn new(redacted_fields: Vec<String>, max_payload_bytes: usize) -> Self {
        Self {
            redacted_fields: redacted_fields.into_iter().collect(),
            max_payload_bytes,
        }
    }

    /// Sanitize any serializable payload.
    ///
    /// A payload that cannot be represented as structured data is
    /// replaced by a fixed marker rather than propagating an error.
    pub fn sanitize_payload<T: Serialize>(&self, payload: &T) -> Value {
        match serde_json::to_value(payload) {
            Ok(value) => self.sanitize_value(value),
            Err(_) => Value::String(UNSERIALIZABLE_MARKER.to_string()),
        }
    }

    /// Sanitize an already-structured value.
    ///
    /// The size guard runs first: an oversized value is replaced whole,
    /// so truncation takes precedence over field redaction.
    pub fn sanitize_value(&self, value: Value) -> Value {
        if self.exceeds_limit(&value) {
            return Value::String(TRUNCATED_MARKER.to_string());
        }

        match value {
            Value::Object(map) => Value::Object(self.sanitize_map(map)),
            Value::Array(items) => Value::Array(self.sanitize_sequence(items)),
            // Scalars and strings carry no field names to redact
            other => other,
        }
    }

    fn exceeds_limit(&self, value: &Value) -> bool {
        match serde_json::to_vec(value) {
            Ok(bytes) => bytes.len() > self.max_payload_bytes,
            Err(_) => false,
        }
    }

    fn sanitize_map(&self, map: Map<String, Value>) -> Map<String, Value> {
        map.into_iter()
            .map(|(key, value)| {
                if self.redacted_fields.contains(&key) {
                    (key, Value::String(REDACTED_MARKER.to_string()))
                } else {
                    let value = match value {
                        Value::Object(inner) => Value::Object(self.sanitize_map(inner)),
                        Value::Array(items) => Value::Array(self.sanitize_sequence(items)),
                        other => other,
                    };
                    (key, value)
                }
            })
            .collect()
    }

    // One level of sequence unwrapping: mappings inside a sequence are
    // redacted, sequences nested inside a sequence are left untouched.
    fn sanitize_sequence(&self, items: Vec<Value>) -> Vec<Value> {
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Value::Object(self.sanitize_map(map)),
                other => other,
            })
            .collect()
    }
}

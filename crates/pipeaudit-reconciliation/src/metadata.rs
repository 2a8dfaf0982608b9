//! Checkpoint metadata codec.
//!
//! Producers attach a free-form JSON payload to each checkpoint. Detection
//! only cares about a handful of well-known keys, so the payload is decoded
//! into [`CheckpointMetadata`], a record of optional typed fields.
//!
//! Decoding is lenient per key: a key that is present but unusable (a
//! record count of `"n/a"`, say) becomes `None` and the rest of the payload
//! is still read. Both `camelCase` and `snake_case` spellings are accepted.
//! Only a payload that is not an object at all is an error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::str::FromStr;
use thiserror::Error;

/// Typed view of the metadata keys the reconciliation rules read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub record_count: Option<i64>,
    pub control_total: Option<Decimal>,
    pub rows_loaded: Option<i64>,
    pub rows_rejected: Option<i64>,
    pub rules_input_count: Option<i64>,
    pub rules_output_count: Option<i64>,
    pub file_name: Option<String>,
}

/// Payload could not be read as a metadata object.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("metadata string is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl CheckpointMetadata {
    /// Decodes a raw payload.
    ///
    /// A JSON string holding an encoded object is unwrapped first, since some
    /// producers double-encode.
    pub fn decode(payload: &JsonValue) -> Result<Self, MetadataError> {
        match payload {
            JsonValue::Object(map) => Ok(Self::from_map(map)),
            JsonValue::String(encoded) => match serde_json::from_str::<JsonValue>(encoded)? {
                JsonValue::Object(map) => Ok(Self::from_map(&map)),
                other => Err(MetadataError::NotAnObject(kind_of(&other))),
            },
            other => Err(MetadataError::NotAnObject(kind_of(other))),
        }
    }

    /// True when none of the known keys decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn from_map(map: &Map<String, JsonValue>) -> Self {
        Self {
            record_count: read(map, "recordCount", "record_count", integer),
            control_total: read(map, "controlTotal", "control_total", decimal),
            rows_loaded: read(map, "rowsLoaded", "rows_loaded", integer),
            rows_rejected: read(map, "rowsRejected", "rows_rejected", integer),
            rules_input_count: read(map, "rulesInputCount", "rules_input_count", integer),
            rules_output_count: read(map, "rulesOutputCount", "rules_output_count", integer),
            file_name: read(map, "fileName", "file_name", text),
        }
    }
}

fn read<T>(
    map: &Map<String, JsonValue>,
    camel: &'static str,
    snake: &'static str,
    convert: fn(&JsonValue) -> Option<T>,
) -> Option<T> {
    let (key, value) = map
        .get(camel)
        .map(|v| (camel, v))
        .or_else(|| map.get(snake).map(|v| (snake, v)))?;

    if value.is_null() {
        return None;
    }
    let converted = convert(value);
    if converted.is_none() {
        tracing::debug!(key, value = %value, "Ignoring malformed metadata value");
    }
    converted
}

fn integer(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn decimal(value: &JsonValue) -> Option<Decimal> {
    let raw = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

fn text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_camel_case_keys() {
        let meta = CheckpointMetadata::decode(&json!({
            "recordCount": 1000,
            "controlTotal": "12345.67",
            "rowsLoaded": 990,
            "rowsRejected": 10,
            "fileName": "GL.D240601.DAT"
        }))
        .unwrap();

        assert_eq!(meta.record_count, Some(1000));
        assert_eq!(meta.control_total, Some(Decimal::new(1_234_567, 2)));
        assert_eq!(meta.rows_loaded, Some(990));
        assert_eq!(meta.rows_rejected, Some(10));
        assert_eq!(meta.file_name.as_deref(), Some("GL.D240601.DAT"));
        assert_eq!(meta.rules_input_count, None);
    }

    #[test]
    fn test_decodes_snake_case_keys() {
        let meta = CheckpointMetadata::decode(&json!({
            "record_count": "42",
            "rules_input_count": 42,
            "rules_output_count": 40.0
        }))
        .unwrap();

        assert_eq!(meta.record_count, Some(42));
        assert_eq!(meta.rules_input_count, Some(42));
        assert_eq!(meta.rules_output_count, Some(40));
    }

    #[test]
    fn test_malformed_key_does_not_poison_others() {
        let meta = CheckpointMetadata::decode(&json!({
            "recordCount": "n/a",
            "controlTotal": 99.5,
            "rowsLoaded": 1.5
        }))
        .unwrap();

        assert_eq!(meta.record_count, None);
        assert_eq!(meta.rows_loaded, None);
        assert_eq!(meta.control_total, Some(Decimal::new(995, 1)));
    }

    #[test]
    fn test_unknown_keys_and_nulls_are_ignored() {
        let meta = CheckpointMetadata::decode(&json!({
            "recordCount": null,
            "operator": "batch-7"
        }))
        .unwrap();
        assert!(meta.is_empty());
    }

    #[test]
    fn test_double_encoded_object_is_unwrapped() {
        let meta = CheckpointMetadata::decode(&json!("{\"recordCount\": 7}")).unwrap();
        assert_eq!(meta.record_count, Some(7));
    }

    #[test]
    fn test_non_object_payload_is_an_error() {
        assert!(matches!(
            CheckpointMetadata::decode(&json!([1, 2, 3])),
            Err(MetadataError::NotAnObject("array"))
        ));
        assert!(matches!(
            CheckpointMetadata::decode(&json!("not json")),
            Err(MetadataError::InvalidJson(_))
        ));
        assert!(matches!(
            CheckpointMetadata::decode(&json!("17")),
            Err(MetadataError::NotAnObject("number"))
        ));
    }
}

//! Opaque registration form payload
//!
//! Form contents are defined and validated by the form-field subsystem. The
//! admission core stores the payload and hands it back byte-for-byte; it
//! never looks inside.

use serde::{Deserialize, Serialize};

/// Validated opaque payload with the schema version it was validated against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormPayload {
    /// Version of the per-event form definition the payload conforms to
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Raw structured value
    pub value: serde_json::Value,
}

fn default_schema_version() -> u32 {
    1
}

impl FormPayload {
    /// Wrap a value with an explicit schema version
    pub fn new(schema_version: u32, value: serde_json::Value) -> Self {
        Self {
            schema_version,
            value,
        }
    }

    /// Approximate serialized size in bytes
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(&self.value).map_or(0, |bytes| bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_is_returned_unchanged() {
        let value = json!({"company": "Acme", "diet": ["vegan"], "nested": {"a": 1}});
        let payload = FormPayload::new(3, value.clone());

        let encoded = serde_json::to_string(&payload).unwrap();
        let decoded: FormPayload = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.schema_version, 3);
        assert_eq!(decoded.value, value);
    }

    #[test]
    fn test_schema_version_defaults_to_one() {
        let decoded: FormPayload = serde_json::from_str(r#"{"value": {"x": true}}"#).unwrap();
        assert_eq!(decoded.schema_version, 1);
    }
}

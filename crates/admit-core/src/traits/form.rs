//! Form validation capability
//!
//! Per-event form field definitions live in an upstream subsystem. The
//! admission core only asks it whether a payload is acceptable.

use crate::value_objects::{FormPayload, Snowflake};

/// Validates registration form payloads against an event's field definitions
pub trait FormValidator: Send + Sync {
    /// Return a human-readable reason when the payload is rejected
    fn validate(&self, event_id: Snowflake, payload: &FormPayload) -> Result<(), String>;
}

/// Validator used when the form subsystem has already checked the payload
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllForms;

impl FormValidator for AcceptAllForms {
    fn validate(&self, _event_id: Snowflake, _payload: &FormPayload) -> Result<(), String> {
        Ok(())
    }
}

/// Rejects payloads whose encoded size exceeds a limit
#[derive(Debug, Clone, Copy)]
pub struct MaxSizeForms {
    pub max_bytes: usize,
}

impl FormValidator for MaxSizeForms {
    fn validate(&self, _event_id: Snowflake, payload: &FormPayload) -> Result<(), String> {
        let len = payload.encoded_len();
        if len > self.max_bytes {
            return Err(format!("form data is {len} bytes, limit is {}", self.max_bytes));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_max_size_validator() {
        let validator = MaxSizeForms { max_bytes: 16 };
        let small = FormPayload::new(1, json!({"a": 1}));
        let large = FormPayload::new(1, json!({"answer": "x".repeat(64)}));

        assert!(validator.validate(Snowflake::new(1), &small).is_ok());
        assert!(validator.validate(Snowflake::new(1), &large).is_err());
    }
}

//! Codec Module
//!
//! Bridges logical values and what each backend can hold natively.
//!
//! - [`Envelope`]: optional `{ "value": V }` wrapping for the transactional
//!   backend. Reads accept both wrapped and legacy unwrapped entries.
//! - [`TextCodec`]: reversible text form for the flat backend, which can
//!   only hold strings.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::value::Value;

/// Field name of the wrapping envelope
pub const ENVELOPE_FIELD: &str = "value";

/// Envelope wrapping, toggled per backend configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    enabled: bool,
}

impl Envelope {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Pass-through envelope
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Prepare a value for the backend
    pub fn wrap(&self, value: Value) -> Value {
        if !self.enabled {
            return value;
        }
        let mut envelope = BTreeMap::new();
        envelope.insert(ENVELOPE_FIELD.to_string(), value);
        Value::Object(envelope)
    }

    /// Recover the logical value from what the backend returned
    ///
    /// Anything that does not look like an envelope (an object whose only
    /// field is `value`) is returned as is.
    pub fn unwrap(&self, raw: Value) -> Value {
        if !self.enabled {
            return raw;
        }
        match raw {
            Value::Object(mut map) if map.len() == 1 && map.contains_key(ENVELOPE_FIELD) => {
                map.remove(ENVELOPE_FIELD).unwrap_or(Value::Null)
            }
            other => other,
        }
    }
}

/// JSON text form of values
///
/// Integers and floats keep their kind (`1` vs `1.0`). Binary values and
/// non-finite floats have no text form and fail to encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl TextCodec {
    pub fn encode(value: &Value) -> Result<String> {
        let json = serde_json::Value::try_from(value.clone())?;
        Ok(serde_json::to_string(&json)?)
    }

    pub fn decode(text: &str) -> Result<Value> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(Value::from(json))
    }
}

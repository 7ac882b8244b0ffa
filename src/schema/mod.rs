//! Schema Module
//!
//! Structural descriptions of the values a key is expected to hold.
//!
//! ## Supported Subset
//! ```text
//! type:    string | number | integer | boolean | array | object | unknown
//! string:  const, enum, minLength, maxLength
//! number:  const, enum, minimum, maximum, exclusiveMinimum,
//! integer  exclusiveMaximum, multipleOf
//! boolean: const
//! array:   items (schema or tuple list), minItems, maxItems, uniqueItems
//! object:  properties, required
//! unknown: accepts anything
//! ```
//!
//! Schemas can be built in code or parsed from a JSON schema document:
//! ```rust,ignore
//! let schema = Schema::from_json(r#"{ "type": "number", "maximum": 10 }"#)?;
//! let same = Schema::number().maximum(10.0);
//! ```

mod validator;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::Value;

pub use validator::validate;

/// A structural schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
    String(StringSchema),
    Number(NumberSchema),
    Integer(NumberSchema),
    Boolean(BooleanSchema),
    Array(ArraySchema),
    Object(ObjectSchema),
    /// Opaque values; validation always passes
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringSchema {
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none", with = "json_value")]
    pub constant: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none", with = "json_values")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Shared by `number` and `integer`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSchema {
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none", with = "json_value")]
    pub constant: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none", with = "json_values")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanSchema {
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none", with = "json_value")]
    pub constant: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    pub items: Items,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
}

/// Element schemas of an array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    /// Fixed-arity tuple: exactly one value per schema, in order
    Tuple(Vec<Schema>),
    /// Every element matches the same schema
    Each(Box<Schema>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

// =============================================================================
// Construction
// =============================================================================

impl Schema {
    /// Parse a JSON schema document
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn string() -> Self {
        Schema::String(StringSchema::default())
    }

    pub fn number() -> Self {
        Schema::Number(NumberSchema::default())
    }

    pub fn integer() -> Self {
        Schema::Integer(NumberSchema::default())
    }

    pub fn boolean() -> Self {
        Schema::Boolean(BooleanSchema::default())
    }

    /// Homogeneous array
    pub fn array_of(items: Schema) -> Self {
        Schema::Array(ArraySchema {
            items: Items::Each(Box::new(items)),
            min_items: None,
            max_items: None,
            unique_items: false,
        })
    }

    /// Fixed-arity tuple
    pub fn tuple(items: Vec<Schema>) -> Self {
        Schema::Array(ArraySchema {
            items: Items::Tuple(items),
            min_items: None,
            max_items: None,
            unique_items: false,
        })
    }

    pub fn object<K, I>(properties: I, required: &[&str]) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Schema::Object(ObjectSchema {
            properties: properties.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            required: required.iter().map(|r| r.to_string()).collect(),
        })
    }

    // -------------------------------------------------------------------------
    // Refinements (ignored on kinds they do not apply to)
    // -------------------------------------------------------------------------

    /// Only this exact value is accepted
    pub fn constant(mut self, value: impl Into<Value>) -> Self {
        let value = Some(value.into());
        match &mut self {
            Schema::String(s) => s.constant = value,
            Schema::Number(n) | Schema::Integer(n) => n.constant = value,
            Schema::Boolean(b) => b.constant = value,
            _ => {}
        }
        self
    }

    /// Only one of these values is accepted
    pub fn one_of<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        let values = Some(values.into_iter().map(Into::into).collect());
        match &mut self {
            Schema::String(s) => s.allowed = values,
            Schema::Number(n) | Schema::Integer(n) => n.allowed = values,
            _ => {}
        }
        self
    }

    pub fn minimum(mut self, bound: f64) -> Self {
        if let Schema::Number(n) | Schema::Integer(n) = &mut self {
            n.minimum = Some(bound);
        }
        self
    }

    pub fn maximum(mut self, bound: f64) -> Self {
        if let Schema::Number(n) | Schema::Integer(n) = &mut self {
            n.maximum = Some(bound);
        }
        self
    }

    pub fn exclusive_minimum(mut self, bound: f64) -> Self {
        if let Schema::Number(n) | Schema::Integer(n) = &mut self {
            n.exclusive_minimum = Some(bound);
        }
        self
    }

    pub fn exclusive_maximum(mut self, bound: f64) -> Self {
        if let Schema::Number(n) | Schema::Integer(n) = &mut self {
            n.exclusive_maximum = Some(bound);
        }
        self
    }

    pub fn multiple_of(mut self, factor: f64) -> Self {
        if let Schema::Number(n) | Schema::Integer(n) = &mut self {
            n.multiple_of = Some(factor);
        }
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        if let Schema::String(s) = &mut self {
            s.min_length = Some(len);
        }
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        if let Schema::String(s) = &mut self {
            s.max_length = Some(len);
        }
        self
    }

    pub fn min_items(mut self, len: usize) -> Self {
        if let Schema::Array(a) = &mut self {
            a.min_items = Some(len);
        }
        self
    }

    pub fn max_items(mut self, len: usize) -> Self {
        if let Schema::Array(a) = &mut self {
            a.max_items = Some(len);
        }
        self
    }

    /// Array elements must be pairwise distinct
    pub fn unique_items(mut self) -> Self {
        if let Schema::Array(a) = &mut self {
            a.unique_items = true;
        }
        self
    }
}

// =============================================================================
// JSON representation of embedded values
// =============================================================================

/// `const` values are written as plain JSON in schema documents
mod json_value {
    use serde::{ser::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use crate::value::Value;

    pub fn serialize<S: Serializer>(value: &Option<Value>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serde_json::Value::try_from(v.clone())
                .map_err(S::Error::custom)?
                .serialize(ser),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Value>, D::Error> {
        let json = Option::<serde_json::Value>::deserialize(de)?;
        Ok(json.map(Value::from))
    }
}

/// `enum` lists are written as plain JSON arrays in schema documents
mod json_values {
    use serde::{ser::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use crate::value::Value;

    pub fn serialize<S: Serializer>(values: &Option<Vec<Value>>, ser: S) -> Result<S::Ok, S::Error> {
        match values {
            Some(vs) => vs
                .iter()
                .map(|v| serde_json::Value::try_from(v.clone()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(S::Error::custom)?
                .serialize(ser),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<Value>>, D::Error> {
        let json = Option::<Vec<serde_json::Value>>::deserialize(de)?;
        Ok(json.map(|vs| vs.into_iter().map(Value::from).collect()))
    }
}

//! Schema validation
//!
//! `validate` is pure and total: it never mutates the value, never panics,
//! and reports a mismatch as `false` rather than an error. Turning `false`
//! into a failure is the caller's job.

use crate::value::Value;

use super::{ArraySchema, BooleanSchema, Items, NumberSchema, ObjectSchema, Schema, StringSchema};

/// Check `value` against `schema`
pub fn validate(value: &Value, schema: &Schema) -> bool {
    match schema {
        Schema::String(s) => validate_string(value, s),
        Schema::Number(n) => value.is_number() && validate_number(value, n),
        Schema::Integer(n) => is_integer(value) && validate_number(value, n),
        Schema::Boolean(b) => validate_boolean(value, b),
        Schema::Array(a) => validate_array(value, a),
        Schema::Object(o) => validate_object(value, o),
        Schema::Unknown => true,
    }
}

fn validate_string(value: &Value, schema: &StringSchema) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };

    if !matches_const_and_enum(value, &schema.constant, &schema.allowed) {
        return false;
    }

    let len = s.chars().count();
    if schema.min_length.is_some_and(|min| len < min) {
        return false;
    }
    if schema.max_length.is_some_and(|max| len > max) {
        return false;
    }

    true
}

/// Integers, and floats without a fractional part
fn is_integer(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Float(f) => f.is_finite() && f.fract() == 0.0,
        _ => false,
    }
}

fn validate_number(value: &Value, schema: &NumberSchema) -> bool {
    let Some(n) = value.as_f64() else {
        return false;
    };

    if !matches_const_and_enum(value, &schema.constant, &schema.allowed) {
        return false;
    }

    if schema.minimum.is_some_and(|min| n < min) {
        return false;
    }
    if schema.maximum.is_some_and(|max| n > max) {
        return false;
    }
    if schema.exclusive_minimum.is_some_and(|min| n <= min) {
        return false;
    }
    if schema.exclusive_maximum.is_some_and(|max| n >= max) {
        return false;
    }
    if let Some(factor) = schema.multiple_of {
        if factor <= 0.0 || !is_multiple_of(n, factor) {
            return false;
        }
    }

    true
}

fn is_multiple_of(n: f64, factor: f64) -> bool {
    let quotient = n / factor;
    (quotient - quotient.round()).abs() < 1e-9
}

fn validate_boolean(value: &Value, schema: &BooleanSchema) -> bool {
    value.as_bool().is_some() && matches_const_and_enum(value, &schema.constant, &None)
}

fn matches_const_and_enum(
    value: &Value,
    constant: &Option<Value>,
    allowed: &Option<Vec<Value>>,
) -> bool {
    if let Some(expected) = constant {
        if !value.same_as(expected) {
            return false;
        }
    }
    if let Some(allowed) = allowed {
        if !allowed.iter().any(|candidate| value.same_as(candidate)) {
            return false;
        }
    }
    true
}

fn validate_array(value: &Value, schema: &ArraySchema) -> bool {
    let Some(items) = value.as_array() else {
        return false;
    };

    if schema.min_items.is_some_and(|min| items.len() < min) {
        return false;
    }
    if schema.max_items.is_some_and(|max| items.len() > max) {
        return false;
    }

    let elements_ok = match &schema.items {
        Items::Each(item_schema) => items.iter().all(|item| validate(item, item_schema)),
        // Tuples are closed: no trailing and no missing elements
        Items::Tuple(schemas) => {
            items.len() == schemas.len()
                && items.iter().zip(schemas).all(|(item, s)| validate(item, s))
        }
    };
    if !elements_ok {
        return false;
    }

    if schema.unique_items && !all_distinct(items) {
        return false;
    }

    true
}

fn all_distinct(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(i, a)| items[i + 1..].iter().all(|b| !a.same_as(b)))
}

fn validate_object(value: &Value, schema: &ObjectSchema) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };

    if !schema.required.iter().all(|name| map.contains_key(name)) {
        return false;
    }

    // Properties not described by the schema are allowed
    map.iter().all(|(name, prop)| match schema.properties.get(name) {
        Some(prop_schema) => validate(prop, prop_schema),
        None => true,
    })
}

//! Schema Validation Tests
//!
//! Tests verify:
//! - Each primitive kind and its refinements
//! - Arrays: homogeneous, tuples, bounds, uniqueness
//! - Objects: required and nested properties
//! - Parsing schemas from JSON documents

use stashkv::{validate, Schema, Value};

fn obj(entries: &[(&str, Value)]) -> Value {
    Value::object(entries.iter().cloned())
}

// =============================================================================
// Primitive Tests
// =============================================================================

#[test]
fn test_string() {
    let schema = Schema::string().min_length(2).max_length(4);

    assert!(validate(&"ab".into(), &schema));
    assert!(validate(&"abcd".into(), &schema));
    assert!(!validate(&"a".into(), &schema));
    assert!(!validate(&"abcde".into(), &schema));
    assert!(!validate(&42.into(), &schema));
}

#[test]
fn test_string_length_counts_characters() {
    let schema = Schema::string().max_length(3);
    assert!(validate(&"äöü".into(), &schema));
}

#[test]
fn test_string_enum_and_const() {
    let colors = Schema::string().one_of(["red", "green"]);
    assert!(validate(&"red".into(), &colors));
    assert!(!validate(&"blue".into(), &colors));

    let fixed = Schema::string().constant("on");
    assert!(validate(&"on".into(), &fixed));
    assert!(!validate(&"off".into(), &fixed));
}

#[test]
fn test_number_bounds() {
    let schema = Schema::number().minimum(0.0).exclusive_maximum(10.0);

    assert!(validate(&0.into(), &schema));
    assert!(validate(&9.5.into(), &schema));
    assert!(!validate(&10.into(), &schema));
    assert!(!validate(&(-0.1).into(), &schema));
    assert!(!validate(&"5".into(), &schema));
}

#[test]
fn test_number_multiple_of() {
    let schema = Schema::number().multiple_of(0.5);

    assert!(validate(&1.5.into(), &schema));
    assert!(validate(&4.into(), &schema));
    assert!(!validate(&1.2.into(), &schema));
}

#[test]
fn test_integer_accepts_whole_floats() {
    let schema = Schema::integer().exclusive_minimum(0.0);

    assert!(validate(&3.into(), &schema));
    assert!(validate(&3.0.into(), &schema));
    assert!(!validate(&3.5.into(), &schema));
    assert!(!validate(&0.into(), &schema));
}

#[test]
fn test_boolean() {
    assert!(validate(&true.into(), &Schema::boolean()));
    assert!(!validate(&"true".into(), &Schema::boolean()));
    assert!(!validate(&false.into(), &Schema::boolean().constant(true)));
}

#[test]
fn test_null_matches_no_typed_schema() {
    assert!(!validate(&Value::Null, &Schema::string()));
    assert!(!validate(&Value::Null, &Schema::object(Vec::<(&str, Schema)>::new(), &[])));
}

#[test]
fn test_unknown_accepts_anything() {
    for value in [Value::Null, 1.into(), "x".into(), Value::Array(vec![])] {
        assert!(validate(&value, &Schema::Unknown));
    }
}

// =============================================================================
// Array Tests
// =============================================================================

#[test]
fn test_homogeneous_array() {
    let schema = Schema::array_of(Schema::integer()).min_items(1).max_items(3);

    assert!(validate(&vec![1, 2, 3].into(), &schema));
    assert!(!validate(&Value::Array(vec![]), &schema));
    assert!(!validate(&vec![1, 2, 3, 4].into(), &schema));
    assert!(!validate(&Value::Array(vec![1.into(), "2".into()]), &schema));
}

#[test]
fn test_tuple_arity_is_exact() {
    let schema = Schema::tuple(vec![Schema::string(), Schema::number()]);

    assert!(validate(&Value::Array(vec!["a".into(), 1.into()]), &schema));
    assert!(!validate(&Value::Array(vec!["a".into()]), &schema));
    assert!(!validate(
        &Value::Array(vec!["a".into(), 1.into(), 2.into()]),
        &schema
    ));
    assert!(!validate(&Value::Array(vec![1.into(), "a".into()]), &schema));
}

#[test]
fn test_unique_items() {
    let schema = Schema::array_of(Schema::number()).unique_items();

    assert!(validate(&vec![1, 2, 3].into(), &schema));
    assert!(!validate(&vec![1, 2, 1].into(), &schema));
    // 2 and 2.0 are the same number
    assert!(!validate(&Value::Array(vec![2.into(), 2.0.into()]), &schema));
}

// =============================================================================
// Object Tests
// =============================================================================

#[test]
fn test_object_required_and_properties() {
    let schema = Schema::object(
        [("name", Schema::string()), ("age", Schema::integer())],
        &["name"],
    );

    assert!(validate(&obj(&[("name", "ada".into())]), &schema));
    assert!(validate(
        &obj(&[("name", "ada".into()), ("age", 36.into())]),
        &schema
    ));
    assert!(!validate(&obj(&[("age", 36.into())]), &schema));
    assert!(!validate(
        &obj(&[("name", "ada".into()), ("age", "old".into())]),
        &schema
    ));
}

#[test]
fn test_object_allows_extra_properties() {
    let schema = Schema::object([("a", Schema::boolean())], &[]);
    assert!(validate(&obj(&[("z", 1.into())]), &schema));
}

#[test]
fn test_nested_object() {
    let schema = Schema::object(
        [(
            "tags",
            Schema::array_of(Schema::object([("id", Schema::integer())], &["id"])),
        )],
        &["tags"],
    );

    let good = obj(&[(
        "tags",
        Value::Array(vec![obj(&[("id", 1.into())]), obj(&[("id", 2.into())])]),
    )]);
    let bad = obj(&[("tags", Value::Array(vec![obj(&[("name", "x".into())])]))]);

    assert!(validate(&good, &schema));
    assert!(!validate(&bad, &schema));
}

// =============================================================================
// JSON Document Tests
// =============================================================================

#[test]
fn test_from_json_matches_builder() {
    let parsed = Schema::from_json(r#"{ "type": "number", "minimum": 1, "maximum": 10 }"#).unwrap();
    assert_eq!(parsed, Schema::number().minimum(1.0).maximum(10.0));
}

#[test]
fn test_from_json_object_document() {
    let schema = Schema::from_json(
        r#"{
            "type": "object",
            "properties": {
                "mode": { "type": "string", "enum": ["fast", "safe"] },
                "pair": { "type": "array", "items": [{ "type": "string" }, { "type": "integer" }] },
                "blob": { "type": "unknown" }
            },
            "required": ["mode"]
        }"#,
    )
    .unwrap();

    let value = obj(&[
        ("mode", "safe".into()),
        ("pair", Value::Array(vec!["x".into(), 1.into()])),
        ("blob", Value::Null),
    ]);
    assert!(validate(&value, &schema));
    assert!(!validate(&obj(&[("mode", "slow".into())]), &schema));
}

#[test]
fn test_from_json_rejects_unknown_type() {
    assert!(Schema::from_json(r#"{ "type": "date" }"#).is_err());
}

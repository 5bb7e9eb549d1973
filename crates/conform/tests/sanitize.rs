//! Sanitization ahead of validation.

use conform::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn form_input_is_cleaned_up() {
    let sanitizer = Sanitizer::new(&json!({"type": "map", "schema": {
        "email": {"type": "string", "trim": true, "lowercase": true},
        "age": {"type": "integer"},
        "newsletter": {"type": "boolean", "default": false},
        "bio": {"type": "string", "truncate": 10}
    }}))
    .unwrap();

    let raw = json!({
        "email": "  Alice@Example.COM ",
        "age": "37",
        "bio": "I write far too much about myself",
        "csrf": "token"
    });
    assert_eq!(
        sanitizer.sanitize(raw),
        json!({
            "email": "alice@example.com",
            "age": 37,
            "bio": "I write fa",
            "newsletter": false
        })
    );
}

#[test]
fn uncoercible_values_pass_through_for_validation_to_catch() {
    let sanitizer = Sanitizer::new(&json!({"type": "map", "schema": {
        "age": {"type": "integer"}
    }}))
    .unwrap();
    let cleaned = sanitizer.sanitize(json!({"age": "thirty"}));
    assert_eq!(cleaned, json!({"age": "thirty"}));

    let mut validator = Validator::new(&json!({"type": "map", "schema": {
        "age": {"type": "integer"}
    }}))
    .unwrap();
    assert!(!validator.validate(&cleaned));
    assert_eq!(validator.errors()[0].rule, "type");
}

#[test]
fn sanitize_then_validate() {
    let sanitizer = Sanitizer::new(&json!({"type": "list", "schema": {"type": "numeric"}})).unwrap();
    let mut validator =
        Validator::new(&json!({"type": "list", "schema": {"type": "numeric", "max": 10}})).unwrap();

    let cleaned = sanitizer.sanitize(json!(["1", " 2.5 ", 3, "40"]));
    assert_eq!(cleaned, json!([1, 2.5, 3, 40]));
    assert!(!validator.validate(&cleaned));
    assert_eq!(validator.errors()[0].path.to_string(), "/3");
}

#[test]
fn custom_types_and_defaults() {
    let types = TypeRegistry::new()
        .with_type("Flag", json!({"type": "boolean", "default": false}))
        .unwrap();
    let sanitizer = Sanitizer::builder()
        .with_types(types)
        .build(&json!({"type": "map", "schema": {
            "debug": {"type": "Flag"},
            "verbose": {"type": "Flag", "default": true}
        }}))
        .unwrap();
    assert_eq!(
        sanitizer.sanitize(json!({"debug": "1"})),
        json!({"debug": true, "verbose": true})
    );
}

#[test]
fn non_matching_compound_values_are_left_alone() {
    let sanitizer = Sanitizer::new(&json!({"type": "map", "schema": {"a": {"type": "string"}}})).unwrap();
    assert_eq!(sanitizer.sanitize(json!([1, 2])), json!([1, 2]));
    assert_eq!(sanitizer.sanitize(json!(null)), json!(null));
}

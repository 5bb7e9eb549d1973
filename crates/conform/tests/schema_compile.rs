//! Malformed schemas are rejected before any data is looked at.

use conform::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn compile_error(schema: Value) -> SchemaError {
    Validator::new(&schema).unwrap_err()
}

#[rstest]
#[case(json!({"schema": {}}), "/: missing required option `type`")]
#[case(
    json!({"type": "map", "schema": {"name": {"minlength": 3}}}),
    "/schema/name: missing required option `type`"
)]
#[case(json!({"type": "text"}), "/: unknown type `text`")]
#[case(
    json!({"type": "string", "maxlenght": 3}),
    "/maxlenght: unknown rule `maxlenght`"
)]
#[case(
    json!({"type": "integer", "regex": "[0-9]+"}),
    "/regex: rule `regex` does not apply to type `integer`"
)]
#[case(
    json!({"type": "list", "schema": [{"type": "string"}]}),
    "/schema: `list` requires exactly one child schema"
)]
#[case(
    json!({"type": "tuple", "schema": {"type": "string"}}),
    "/schema: `tuple` requires an ordered sequence of child schemas"
)]
#[case(
    json!({"type": "map", "schema": "name"}),
    "/schema: `map` requires a mapping of field name to schema"
)]
fn schema_errors_name_the_path(#[case] schema: Value, #[case] expected: &str) {
    assert_eq!(compile_error(schema).to_string(), expected);
}

#[rstest]
#[case(json!({"type": "string", "minlength": "3"}), "minlength")]
#[case(json!({"type": "string", "minlength": -3}), "minlength")]
#[case(json!({"type": "integer", "min": "0"}), "min")]
#[case(json!({"type": "string", "allowed": "a"}), "allowed")]
#[case(json!({"type": "string", "allowed": {"value": ["a"]}}), "allowed")]
#[case(json!({"type": "string", "regex": "(open"}), "regex")]
#[case(json!({"type": "string", "datetime": "%Q"}), "datetime")]
#[case(json!({"type": "string", "email": "yes"}), "email")]
#[case(json!({"type": "map", "schema": {}, "unknownAllowed": 1}), "unknownAllowed")]
#[case(json!({"type": 5}), "type")]
fn option_shapes_are_checked(#[case] schema: Value, #[case] rule: &str) {
    match compile_error(schema) {
        SchemaError::InvalidOption { rule: found, .. } => assert_eq!(found, rule),
        other => panic!("expected InvalidOption, got {other:?}"),
    }
}

#[test]
fn nested_errors_point_inside_tuples_and_lists() {
    let err = compile_error(json!({"type": "list", "schema": {"type": "tuple", "schema": [
        {"type": "string"},
        {"type": "integer", "minlength": 2}
    ]}}));
    assert_eq!(
        err.path().map(ToString::to_string).as_deref(),
        Some("/schema/schema/1/minlength")
    );
}

#[test]
fn field_names_are_escaped_in_schema_paths() {
    let err = compile_error(json!({"type": "map", "schema": {"a/b": {}}}));
    assert_eq!(err.to_string(), "/schema/a~1b: missing required option `type`");
}

#[test]
fn unknown_custom_type_inside_a_type_definition() {
    let types = TypeRegistry::new()
        .with_type("Pair", json!({"type": "tuple", "schema": [{"type": "Left"}, {"type": "string"}]}))
        .unwrap();
    let err = Validator::builder()
        .with_types(types)
        .build(&json!({"type": "Pair"}))
        .unwrap_err();
    assert_eq!(err.to_string(), "#Pair/schema/0: unknown type `Left`");
}

#[test]
fn alias_cycles_are_schema_errors() {
    let types = TypeRegistry::new()
        .with_type("Ping", json!({"type": "Pong"}))
        .unwrap()
        .with_type("Pong", json!({"type": "Ping"}))
        .unwrap();
    let err = Validator::builder()
        .with_types(types)
        .build(&json!({"type": "map", "schema": {"p": {"type": "Ping"}}}))
        .unwrap_err();
    assert!(matches!(err, SchemaError::CyclicType { .. }), "{err}");
}

#[test]
fn builtin_names_cannot_be_registered() {
    let err = TypeRegistry::new()
        .with_type("tuple", json!({"type": "list"}))
        .unwrap_err();
    assert_eq!(err.to_string(), "type name `tuple` is reserved for a built-in type");
}

#[test]
fn schemas_compile_identically_twice() {
    let raw = json!({"type": "map", "schema": {
        "a": {"type": "string", "allowed": ["x"], "minlength": 1},
        "b": {"type": "list", "schema": {"type": "integer", "min": 0}}
    }});
    let first = Validator::new(&raw).unwrap();
    let second = Validator::new(&raw).unwrap();
    assert_eq!(format!("{:?}", first.schema()), format!("{:?}", second.schema()));
}

//! Property-based tests for conform.

use conform::prelude::*;
use proptest::prelude::*;
use serde_json::{Value, json};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6..1.0e6f64).prop_map(Value::from),
        "[a-z @.]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-e]{1,2}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn profile_schema() -> Value {
    json!({"type": "map", "schema": {
        "a": {"type": "string", "minlength": 2, "email": true},
        "b": {"type": "integer", "min": 0, "max": 100, "required": false},
        "c": {"type": "list", "nullable": true, "schema": {"type": "numeric", "forbidden": [0]}},
        "d": {"type": "tuple", "required": false, "schema": [
            {"type": "boolean"},
            {"type": "string", "allowed": ["x", "y"]}
        ]}
    }})
}

fn person_validator() -> Validator {
    let types = TypeRegistry::new()
        .with_type(
            "Person",
            json!({"type": "map", "unknownAllowed": true, "schema": {
                "name": {"type": "string"},
                "mother": {"type": "Person", "required": false, "nullable": true}
            }}),
        )
        .unwrap();
    Validator::builder()
        .with_types(types)
        .build(&json!({"type": "Person"}))
        .unwrap()
}

// ============================================================================
// POSTCONDITION: the boolean equals "no errors"
// ============================================================================

proptest! {
    #[test]
    fn result_matches_error_list(data in arb_json()) {
        let mut validator = Validator::new(&profile_schema()).unwrap();
        let ok = validator.validate(&data);
        prop_assert_eq!(ok, validator.errors().is_empty());
        prop_assert_eq!(ok, validator.check(&data).is_ok());
    }

    #[test]
    fn recursive_schema_postcondition(data in arb_json()) {
        let mut validator = person_validator();
        let ok = validator.validate(&data);
        prop_assert_eq!(ok, validator.errors().is_empty());
    }
}

// ============================================================================
// DETERMINISM: validate(x) == validate(x)
// ============================================================================

proptest! {
    #[test]
    fn validation_is_deterministic(data in arb_json()) {
        let validator = Validator::new(&profile_schema()).unwrap();
        let first = validator.check(&data);
        let second = validator.check(&data);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_path_starts_at_the_root(data in arb_json()) {
        let validator = Validator::new(&profile_schema()).unwrap();
        if let Err(errors) = validator.check(&data) {
            for error in &errors {
                prop_assert_eq!(&error.path.segments()[0], &Segment::root());
            }
        }
    }
}

// ============================================================================
// SHORT-CIRCUIT: a failing presence check yields exactly one error
// ============================================================================

proptest! {
    #[test]
    fn missing_required_field_yields_one_error(other in arb_json()) {
        let validator = Validator::new(&json!({"type": "map", "unknownAllowed": true, "schema": {
            "target": {"type": "string", "minlength": 3, "regex": "[a-z]+", "email": true}
        }}))
        .unwrap();
        let data = json!({"other": other});
        let errors = validator.check(&data).unwrap_err();
        prop_assert_eq!(errors.len(), 1);
        prop_assert_eq!(errors.errors()[0].rule.as_ref(), "required");
    }
}

// ============================================================================
// SANITIZER: idempotent
// ============================================================================

proptest! {
    #[test]
    fn sanitizing_twice_changes_nothing(data in arb_json()) {
        let sanitizer = Sanitizer::new(&json!({"type": "map", "schema": {
            "a": {"type": "string", "trim": true, "lowercase": true},
            "b": {"type": "integer", "default": 0},
            "c": {"type": "list", "schema": {"type": "boolean"}}
        }}))
        .unwrap();
        let once = sanitizer.sanitize(data);
        let twice = sanitizer.sanitize(once.clone());
        prop_assert_eq!(once, twice);
    }
}

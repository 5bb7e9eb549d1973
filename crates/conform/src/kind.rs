//! Built-in value kinds and runtime kind matching.

use std::fmt;

use serde_json::Value;

/// One of the built-in kinds a schema node can declare.
///
/// Custom types always resolve to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// JSON `true` / `false`.
    Boolean,
    /// A number representable as `i64` or `u64`.
    Integer,
    /// A number stored as a floating point value.
    Float,
    /// Any number.
    Numeric,
    /// A JSON string.
    String,
    /// A JSON object with declared fields.
    Map,
    /// A homogeneous JSON array.
    List,
    /// A positionally typed JSON array.
    Tuple,
}

impl Kind {
    /// All built-in kinds, in declaration order.
    pub const ALL: [Kind; 8] = [
        Kind::Boolean,
        Kind::Integer,
        Kind::Float,
        Kind::Numeric,
        Kind::String,
        Kind::Map,
        Kind::List,
        Kind::Tuple,
    ];

    /// Parses a built-in kind name. Returns `None` for anything else,
    /// which the compiler then treats as a custom type reference.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The schema name of this kind.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::Numeric => "numeric",
            Kind::String => "string",
            Kind::Map => "map",
            Kind::List => "list",
            Kind::Tuple => "tuple",
        }
    }

    /// Returns true if `value` has this kind at runtime.
    ///
    /// Numeric-looking strings never match a number kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Kind::Boolean, Value::Bool(_)) => true,
            (Kind::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Kind::Float, Value::Number(n)) => n.is_f64(),
            (Kind::Numeric, Value::Number(_)) => true,
            (Kind::String, Value::String(_)) => true,
            (Kind::Map, Value::Object(_)) => true,
            (Kind::List | Kind::Tuple, Value::Array(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Describes the runtime kind of a value, for `{actual}` substitutions.
#[must_use]
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(Kind::Boolean, json!(true), true)]
    #[case(Kind::Boolean, json!("true"), false)]
    #[case(Kind::Integer, json!(42), true)]
    #[case(Kind::Integer, json!(42.5), false)]
    #[case(Kind::Integer, json!(u64::MAX), true)]
    #[case(Kind::Float, json!(1.5), true)]
    #[case(Kind::Float, json!(2), false)]
    #[case(Kind::Numeric, json!(2), true)]
    #[case(Kind::Numeric, json!(2.5), true)]
    #[case(Kind::Numeric, json!("2"), false)]
    #[case(Kind::String, json!("x"), true)]
    #[case(Kind::String, json!(null), false)]
    #[case(Kind::Map, json!({}), true)]
    #[case(Kind::Map, json!([]), false)]
    #[case(Kind::List, json!([1]), true)]
    #[case(Kind::Tuple, json!([1, "a"]), true)]
    #[case(Kind::Tuple, json!({"0": 1}), false)]
    fn runtime_kind_matching(#[case] kind: Kind, #[case] value: Value, #[case] expected: bool) {
        assert_eq!(kind.matches(&value), expected);
    }

    #[test]
    fn parse_round_trips_names() {
        for kind in Kind::ALL {
            assert_eq!(Kind::parse(kind.name()), Some(kind));
        }
        assert_eq!(Kind::parse("Person"), None);
    }

    #[test]
    fn describe_reports_runtime_kind() {
        assert_eq!(describe(&json!(null)), "null");
        assert_eq!(describe(&json!(1)), "integer");
        assert_eq!(describe(&json!(1.0)), "float");
        assert_eq!(describe(&json!({"a": 1})), "map");
    }
}

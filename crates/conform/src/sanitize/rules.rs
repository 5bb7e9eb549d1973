//! Built-in sanitization rules.

use serde_json::{Number, Value};

use crate::kind::Kind;
use crate::rule::{
    ALL_KINDS, OPEN_KINDS, OptionShape, Phase, RuleDescriptor, RuleValue, SCALAR_KINDS,
    STRING_KINDS,
};

pub(crate) fn descriptors() -> Vec<RuleDescriptor> {
    vec![
        RuleDescriptor::new("default", Phase::Presence, OptionShape::Any)
            .with_priority(0)
            .with_kinds(ALL_KINDS),
        RuleDescriptor::new("cast", Phase::Transform, OptionShape::Flag { enforcing: true })
            .with_priority(10)
            .with_kinds(SCALAR_KINDS)
            .with_implicit(RuleValue::Flag(true))
            .with_transform(|value, _, kind| cast(value, kind)),
        RuleDescriptor::new("trim", Phase::Transform, OptionShape::Flag { enforcing: true })
            .with_priority(20)
            .with_kinds(STRING_KINDS)
            .with_transform(|value, _, _| map_str(value, |s| s.trim().to_owned())),
        RuleDescriptor::new("lowercase", Phase::Transform, OptionShape::Flag { enforcing: true })
            .with_priority(30)
            .with_kinds(STRING_KINDS)
            .with_transform(|value, _, _| map_str(value, str::to_lowercase)),
        RuleDescriptor::new("uppercase", Phase::Transform, OptionShape::Flag { enforcing: true })
            .with_priority(40)
            .with_kinds(STRING_KINDS)
            .with_transform(|value, _, _| map_str(value, str::to_uppercase)),
        RuleDescriptor::new("truncate", Phase::Transform, OptionShape::Count)
            .with_priority(50)
            .with_kinds(STRING_KINDS)
            .with_transform(|value, option, _| match option.as_count() {
                Some(limit) => map_str(value, |s| s.chars().take(limit).collect()),
                None => value,
            }),
        RuleDescriptor::new("unknownAllowed", Phase::Structure, OptionShape::Flag { enforcing: false })
            .with_priority(300)
            .with_kinds(OPEN_KINDS)
            .with_implicit(RuleValue::Flag(false)),
    ]
}

fn map_str(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

// ============================================================================
// CAST
// ============================================================================

/// Coerces `value` toward `kind`. Anything that cannot be coerced is
/// returned unchanged.
pub(crate) fn cast(value: Value, kind: Kind) -> Value {
    let cast = match (kind, &value) {
        (Kind::Integer, Value::String(s)) => parse_integer(s.trim()),
        (Kind::Integer, Value::Number(n)) => whole_float(n),
        (Kind::Integer, Value::Bool(b)) => Some(Value::from(u8::from(*b))),

        (Kind::Float, Value::String(s)) => parse_float(s.trim()),
        (Kind::Float, Value::Number(n)) if !n.is_f64() => {
            n.as_f64().and_then(Number::from_f64).map(Value::Number)
        }

        (Kind::Numeric, Value::String(s)) => {
            let s = s.trim();
            parse_integer(s).or_else(|| parse_float(s))
        }

        (Kind::Boolean, Value::String(s)) => parse_bool(s.trim()),
        (Kind::Boolean, Value::Number(n)) => match n.as_u64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },

        (Kind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (Kind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        _ => None,
    };
    cast.unwrap_or(value)
}

fn parse_integer(s: &str) -> Option<Value> {
    if let Ok(n) = s.parse::<i64>() {
        return Some(Value::from(n));
    }
    s.parse::<u64>().ok().map(Value::from)
}

fn parse_float(s: &str) -> Option<Value> {
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn whole_float(n: &Number) -> Option<Value> {
    let f = n.as_f64().filter(|_| n.is_f64())?;
    let whole = f.trunc();
    if whole == f && whole >= i64::MIN as f64 && whole <= i64::MAX as f64 {
        Some(Value::from(whole as i64))
    } else {
        None
    }
}

fn parse_bool(s: &str) -> Option<Value> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(Value::Bool(true)),
        "false" | "0" => Some(Value::Bool(false)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(Kind::Integer, json!("42"), json!(42))]
    #[case(Kind::Integer, json!(" -7 "), json!(-7))]
    #[case(Kind::Integer, json!(3.0), json!(3))]
    #[case(Kind::Integer, json!(3.5), json!(3.5))]
    #[case(Kind::Integer, json!(true), json!(1))]
    #[case(Kind::Integer, json!("4.5"), json!("4.5"))]
    #[case(Kind::Float, json!("2.5"), json!(2.5))]
    #[case(Kind::Float, json!(2), json!(2.0))]
    #[case(Kind::Numeric, json!("10"), json!(10))]
    #[case(Kind::Numeric, json!("1e3"), json!(1000.0))]
    #[case(Kind::Numeric, json!("ten"), json!("ten"))]
    #[case(Kind::Boolean, json!("TRUE"), json!(true))]
    #[case(Kind::Boolean, json!("0"), json!(false))]
    #[case(Kind::Boolean, json!(1), json!(true))]
    #[case(Kind::Boolean, json!(2), json!(2))]
    #[case(Kind::String, json!(12), json!("12"))]
    #[case(Kind::String, json!(false), json!("false"))]
    #[case(Kind::String, json!(null), json!(null))]
    fn cast_table(#[case] kind: Kind, #[case] input: Value, #[case] expected: Value) {
        assert_eq!(cast(input, kind), expected);
    }

    #[test]
    fn string_transforms_ignore_other_values() {
        assert_eq!(map_str(json!(" a "), |s| s.trim().to_owned()), json!("a"));
        assert_eq!(map_str(json!(5), |s| s.trim().to_owned()), json!(5));
    }
}

//! Built-in validation rules.

use std::cmp::Ordering;

use chrono::format::{Parsed, StrftimeItems};
use serde_json::{Number, Value};

use super::{
    ALL_KINDS, NUMBER_KINDS, OPEN_KINDS, OptionShape, Phase, RuleDescriptor, RuleInput,
    RuleValue, SCALAR_KINDS, STRING_KINDS, Verdict,
};
use crate::message::{Substitution, Substitutions};
use crate::probe::EntryKind;

pub(super) fn descriptors() -> Vec<RuleDescriptor> {
    vec![
        // ── presence and type ────────────────────────────────────────────
        RuleDescriptor::new("required", Phase::Presence, OptionShape::Flag { enforcing: true })
            .with_priority(0)
            .with_kinds(ALL_KINDS)
            .with_implicit(RuleValue::Flag(true))
            .with_message("The field <{field}> is required."),
        RuleDescriptor::new("nullable", Phase::Presence, OptionShape::Flag { enforcing: false })
            .with_priority(10)
            .with_kinds(ALL_KINDS)
            .with_implicit(RuleValue::Flag(false))
            .with_message("The field <{field}> cannot be null."),
        RuleDescriptor::new("type", Phase::Type, OptionShape::TypeName)
            .with_priority(20)
            .with_kinds(ALL_KINDS)
            .with_message("Invalid type: expected {expected}, got {actual}."),
        // ── value rules ──────────────────────────────────────────────────
        RuleDescriptor::new("blankable", Phase::Value, OptionShape::Flag { enforcing: false })
            .with_priority(100)
            .with_kinds(STRING_KINDS)
            .with_implicit(RuleValue::Flag(false))
            .with_message("The field <{field}> cannot be blank.")
            .with_check(check_blank),
        RuleDescriptor::new("minlength", Phase::Value, OptionShape::Count)
            .with_priority(110)
            .with_kinds(STRING_KINDS)
            .with_message("The field <{field}> must be at least {minlength} characters long.")
            .with_check(check_min_length),
        RuleDescriptor::new("maxlength", Phase::Value, OptionShape::Count)
            .with_priority(120)
            .with_kinds(STRING_KINDS)
            .with_message("The field <{field}> must be at most {maxlength} characters long.")
            .with_check(check_max_length),
        RuleDescriptor::new("min", Phase::Value, OptionShape::Number)
            .with_priority(130)
            .with_kinds(NUMBER_KINDS)
            .with_message("The field <{field}> must be greater than or equal to {min}.")
            .with_check(check_min),
        RuleDescriptor::new("max", Phase::Value, OptionShape::Number)
            .with_priority(140)
            .with_kinds(NUMBER_KINDS)
            .with_message("The field <{field}> must be less than or equal to {max}.")
            .with_check(check_max),
        RuleDescriptor::new("allowed", Phase::Value, OptionShape::Values)
            .with_priority(150)
            .with_kinds(SCALAR_KINDS)
            .with_message("The field <{field}> must contain one of these values: {values}.")
            .with_check(check_allowed),
        RuleDescriptor::new("forbidden", Phase::Value, OptionShape::Values)
            .with_priority(160)
            .with_kinds(SCALAR_KINDS)
            .with_message("The field <{field}> must not contain any of these values: {values}.")
            .with_check(check_forbidden),
        RuleDescriptor::new("regex", Phase::Value, OptionShape::Pattern)
            .with_priority(170)
            .with_kinds(STRING_KINDS)
            .with_message("The field <{field}> must match the pattern {pattern}.")
            .with_check(check_regex),
        RuleDescriptor::new("email", Phase::Value, OptionShape::Flag { enforcing: true })
            .with_priority(180)
            .with_kinds(STRING_KINDS)
            .with_message("The field <{field}> must be a valid email address.")
            .with_check(|input| pass_if(input.value.as_str().is_some_and(|s| input.probes.formats.is_email(s)))),
        RuleDescriptor::new("url", Phase::Value, OptionShape::Flag { enforcing: true })
            .with_priority(190)
            .with_kinds(STRING_KINDS)
            .with_message("The field <{field}> must be a valid URL.")
            .with_check(|input| pass_if(input.value.as_str().is_some_and(|s| input.probes.formats.is_url(s)))),
        RuleDescriptor::new("file", Phase::Value, OptionShape::Flag { enforcing: true })
            .with_priority(200)
            .with_kinds(STRING_KINDS)
            .with_message("The field <{field}> must point to an existing file.")
            .with_check(|input| check_entry(input, EntryKind::File)),
        RuleDescriptor::new("directory", Phase::Value, OptionShape::Flag { enforcing: true })
            .with_priority(210)
            .with_kinds(STRING_KINDS)
            .with_message("The field <{field}> must point to an existing directory.")
            .with_check(|input| check_entry(input, EntryKind::Directory)),
        RuleDescriptor::new("datetime", Phase::Value, OptionShape::Format)
            .with_priority(220)
            .with_kinds(STRING_KINDS)
            .with_message("The field <{field}> must be a date in the format {format}.")
            .with_check(check_datetime),
        // ── structure ────────────────────────────────────────────────────
        RuleDescriptor::new("unknownAllowed", Phase::Structure, OptionShape::Flag { enforcing: false })
            .with_priority(300)
            .with_kinds(OPEN_KINDS)
            .with_implicit(RuleValue::Flag(false))
            .with_message("Unknown field <{field}>."),
    ]
}

fn pass_if(ok: bool) -> Verdict {
    if ok {
        Verdict::Pass
    } else {
        Verdict::Fail(Substitutions::new())
    }
}

// ============================================================================
// STRINGS
// ============================================================================

fn check_blank(input: &RuleInput<'_>) -> Verdict {
    pass_if(!input.value.as_str().is_some_and(|s| s.trim().is_empty()))
}

fn check_min_length(input: &RuleInput<'_>) -> Verdict {
    let (Some(text), Some(min)) = (input.value.as_str(), input.option.as_count()) else {
        return Verdict::Pass;
    };
    let length = text.chars().count();
    if length >= min {
        Verdict::Pass
    } else {
        Verdict::Fail(
            Substitutions::new()
                .with("minlength", min.to_string())
                .with("length", length.to_string()),
        )
    }
}

fn check_max_length(input: &RuleInput<'_>) -> Verdict {
    let (Some(text), Some(max)) = (input.value.as_str(), input.option.as_count()) else {
        return Verdict::Pass;
    };
    let length = text.chars().count();
    if length <= max {
        Verdict::Pass
    } else {
        Verdict::Fail(
            Substitutions::new()
                .with("maxlength", max.to_string())
                .with("length", length.to_string()),
        )
    }
}

fn check_regex(input: &RuleInput<'_>) -> Verdict {
    let (Some(text), RuleValue::Pattern(pattern)) = (input.value.as_str(), input.option) else {
        return Verdict::Pass;
    };
    if pattern.is_match(text) {
        Verdict::Pass
    } else {
        Verdict::Fail(Substitutions::new().with("pattern", pattern.source()))
    }
}

fn check_entry(input: &RuleInput<'_>, kind: EntryKind) -> Verdict {
    pass_if(
        input
            .value
            .as_str()
            .is_some_and(|s| input.probes.paths.exists(std::path::Path::new(s), kind)),
    )
}

fn check_datetime(input: &RuleInput<'_>) -> Verdict {
    let (Some(text), RuleValue::Format(format)) = (input.value.as_str(), input.option) else {
        return Verdict::Pass;
    };
    if matches_datetime(text, format) {
        Verdict::Pass
    } else {
        Verdict::Fail(Substitutions::new().with("format", format.as_str()))
    }
}

/// True if `text` is fully consumed by `format` and names a real date when
/// the format has enough fields to build one.
fn matches_datetime(text: &str, format: &str) -> bool {
    let mut parsed = Parsed::new();
    if chrono::format::parse(&mut parsed, text, StrftimeItems::new(format)).is_err() {
        return false;
    }
    match parsed.to_naive_date() {
        Ok(_) => true,
        Err(e) => e.kind() == chrono::format::ParseErrorKind::NotEnough,
    }
}

// ============================================================================
// NUMBERS
// ============================================================================

/// Compares two JSON numbers exactly when both are integers, as `f64`
/// otherwise. `None` only for NaN, which JSON cannot carry.
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    fn as_i128(n: &Number) -> Option<i128> {
        n.as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
    }
    match (as_i128(a), as_i128(b)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn check_min(input: &RuleInput<'_>) -> Verdict {
    let (Value::Number(actual), RuleValue::Number(min)) = (input.value, input.option) else {
        return Verdict::Pass;
    };
    match compare_numbers(actual, min) {
        Some(Ordering::Less) => Verdict::Fail(Substitutions::new().with("min", min.to_string())),
        _ => Verdict::Pass,
    }
}

fn check_max(input: &RuleInput<'_>) -> Verdict {
    let (Value::Number(actual), RuleValue::Number(max)) = (input.value, input.option) else {
        return Verdict::Pass;
    };
    match compare_numbers(actual, max) {
        Some(Ordering::Greater) => {
            Verdict::Fail(Substitutions::new().with("max", max.to_string()))
        }
        _ => Verdict::Pass,
    }
}

// ============================================================================
// SETS
// ============================================================================

/// JSON equality with numbers compared by value (`1 == 1.0`).
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn check_allowed(input: &RuleInput<'_>) -> Verdict {
    let RuleValue::Values(values) = input.option else {
        return Verdict::Pass;
    };
    if values.iter().any(|v| same_value(v, input.value)) {
        Verdict::Pass
    } else {
        Verdict::Fail(Substitutions::new().with("values", Substitution::values(values)))
    }
}

fn check_forbidden(input: &RuleInput<'_>) -> Verdict {
    let RuleValue::Values(values) = input.option else {
        return Verdict::Pass;
    };
    if values.iter().any(|v| same_value(v, input.value)) {
        Verdict::Fail(Substitutions::new().with("values", Substitution::values(values)))
    } else {
        Verdict::Pass
    }
}

//! The recursive validation walk.
//!
//! Per node, in order:
//!
//! 1. presence: an absent value fails `required`, a null one fails
//!    `nullable`; either way the subtree ends here
//! 2. type: a kind mismatch records one `type` error and ends the subtree
//! 3. value rules in priority order, all of them, none suppressing another
//! 4. recursion into declared children, then structure checks
//!    (undeclared map keys, extra tuple positions)
//!
//! The walk never stops early at the document level. Every problem is
//! recorded in the [`Context`] and the caller reads the whole list.

use serde_json::{Map, Value};

use crate::context::Context;
use crate::kind::describe;
use crate::message::Substitutions;
use crate::path::Segment;
use crate::rule::{Phase, RuleAction, RuleInput, RuleValue, Verdict};
use crate::schema::{Schema, SchemaNode, Shape};

const FALLBACK_TYPE_MESSAGE: &str = "Invalid type.";

/// Validates `value` against the root of `schema`.
///
/// Returns true iff this call recorded no errors in `ctx`.
pub fn validate(schema: &Schema, value: &Value, ctx: &mut Context<'_>) -> bool {
    let ok = validate_node(schema, schema.root(), Some(value), ctx);
    tracing::debug!(errors = ctx.error_count(), "validation finished");
    ok
}

/// Validates one node. `None` means the value is absent (a missing map key
/// or tuple position), which is different from `Some(Value::Null)`.
///
/// Returns true iff this call recorded no errors in `ctx`.
pub fn validate_node(
    schema: &Schema,
    node: &SchemaNode,
    value: Option<&Value>,
    ctx: &mut Context<'_>,
) -> bool {
    let before = ctx.error_count();
    walk(schema, node, value, ctx);
    ctx.error_count() == before
}

fn walk(schema: &Schema, node: &SchemaNode, value: Option<&Value>, ctx: &mut Context<'_>) {
    let Some(value) = value else {
        if let Some(rule) = node.active_rule("required") {
            ctx.report(rule, None, Substitutions::new());
        }
        return;
    };

    if value.is_null() {
        if let Some(rule) = node.active_rule("nullable") {
            ctx.report(rule, Some(value), Substitutions::new());
        }
        return;
    }

    if !node.kind().matches(value) {
        report_type(node, value, ctx);
        return;
    }

    run_value_rules(node, value, ctx);

    match schema.shape(node) {
        Shape::Map(fields) => {
            if let Some(object) = value.as_object() {
                walk_map(schema, node, fields, object, ctx);
            }
        }
        Shape::List(item) => {
            if let Some(items) = value.as_array() {
                for (index, element) in items.iter().enumerate() {
                    ctx.push(index);
                    walk(schema, item, Some(element), ctx);
                    ctx.pop();
                }
            }
        }
        Shape::Tuple(positions) => {
            if let Some(items) = value.as_array() {
                walk_tuple(schema, node, positions, items, ctx);
            }
        }
        Shape::Scalar | Shape::Named(_) => {}
    }
}

fn report_type(node: &SchemaNode, value: &Value, ctx: &mut Context<'_>) {
    let rule = node.rule("type");
    let expected = match rule.map(|rule| rule.value()) {
        Some(RuleValue::TypeName(name)) => name.clone(),
        _ => node.type_name().to_string(),
    };
    let substitutions = Substitutions::new()
        .with("expected", expected)
        .with("actual", describe(value));

    match rule {
        Some(rule) => ctx.report(rule, Some(value), substitutions),
        None => ctx.report_raw("type", FALLBACK_TYPE_MESSAGE, Some(value), substitutions),
    }
}

fn run_value_rules(node: &SchemaNode, value: &Value, ctx: &mut Context<'_>) {
    for rule in node.rules() {
        if !rule.is_active() || rule.descriptor().phase() != Phase::Value {
            continue;
        }
        let RuleAction::Check(check) = rule.descriptor().action() else {
            continue;
        };
        let verdict = check(&RuleInput {
            value,
            option: rule.value(),
            kind: node.kind(),
            probes: ctx.probes(),
        });
        if let Verdict::Fail(substitutions) = verdict {
            ctx.report(rule, Some(value), substitutions);
        }
    }
}

fn walk_map(
    schema: &Schema,
    node: &SchemaNode,
    fields: &indexmap::IndexMap<String, SchemaNode>,
    object: &Map<String, Value>,
    ctx: &mut Context<'_>,
) {
    for (name, child) in fields {
        ctx.push(Segment::Field(name.clone()));
        walk(schema, child, object.get(name), ctx);
        ctx.pop();
    }

    let Some(unknown) = node.active_rule("unknownAllowed") else {
        return;
    };
    for (key, extra) in object {
        if fields.contains_key(key) {
            continue;
        }
        ctx.push(Segment::Field(key.clone()));
        ctx.report(unknown, Some(extra), Substitutions::new());
        ctx.pop();
    }
}

fn walk_tuple(
    schema: &Schema,
    node: &SchemaNode,
    positions: &[SchemaNode],
    items: &[Value],
    ctx: &mut Context<'_>,
) {
    for (index, position) in positions.iter().enumerate() {
        ctx.push(index);
        match items.get(index) {
            Some(element) => walk(schema, position, Some(element), ctx),
            None => {
                // only the first missing required position is reported
                let reported = !validate_node(schema, position, None, ctx);
                if reported {
                    ctx.pop();
                    break;
                }
            }
        }
        ctx.pop();
    }

    if items.len() <= positions.len() {
        return;
    }
    let Some(unknown) = node.active_rule("unknownAllowed") else {
        return;
    };
    for (index, extra) in items.iter().enumerate().skip(positions.len()) {
        ctx.push(index);
        ctx.report(unknown, Some(extra), Substitutions::new());
        ctx.pop();
    }
}

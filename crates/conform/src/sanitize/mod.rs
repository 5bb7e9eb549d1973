//! Schema-driven sanitization.
//!
//! Schemas are compiled by the same [`SchemaCompiler`] against
//! [`RuleRegistry::sanitization`]. The walk mirrors validation but rewrites
//! values instead of reporting errors: absent or null values take their
//! `default`, scalars are cast and transformed, undeclared map keys and
//! extra tuple positions are dropped unless `unknownAllowed` is set.
//! Sanitization never fails at run time.

mod rules;

use std::sync::{Arc, LazyLock};

use serde_json::{Map, Value};

pub(crate) use rules::descriptors;

use crate::error::SchemaError;
use crate::path::SchemaPath;
use crate::rule::{ContextKind, Phase, RuleAction, RuleRegistry, RuleValue};
use crate::schema::{Schema, SchemaCompiler, SchemaNode, Shape};
use crate::types::TypeRegistry;

static SANITIZATION_RULES: LazyLock<Arc<RuleRegistry>> =
    LazyLock::new(|| Arc::new(RuleRegistry::sanitization()));

// ============================================================================
// WALK
// ============================================================================

/// Sanitizes `value` against the root of `schema`.
#[must_use]
pub fn sanitize(schema: &Schema, value: Value) -> Value {
    let sanitized = present(schema, schema.root(), value);
    tracing::debug!("sanitization finished");
    sanitized
}

/// A present value. Null counts as missing for `default`.
fn present(schema: &Schema, node: &SchemaNode, value: Value) -> Value {
    if value.is_null() {
        return default_of(node).map_or(Value::Null, |default| transform(schema, node, default));
    }
    transform(schema, node, value)
}

/// A missing map key or tuple position: its `default`, if declared.
fn absent(schema: &Schema, node: &SchemaNode) -> Option<Value> {
    default_of(node).map(|default| transform(schema, node, default))
}

fn default_of(node: &SchemaNode) -> Option<Value> {
    match node.rule("default")?.value() {
        RuleValue::Any(value) => Some(value.clone()),
        _ => None,
    }
}

fn transform(schema: &Schema, node: &SchemaNode, mut value: Value) -> Value {
    for rule in node.rules() {
        if !rule.is_active() || rule.descriptor().phase() != Phase::Transform {
            continue;
        }
        if let RuleAction::Transform(apply) = rule.descriptor().action() {
            value = apply(value, rule.value(), node.kind());
        }
    }

    let keep_unknown = node.active_rule("unknownAllowed").is_none();
    match (schema.shape(node), value) {
        (Shape::Map(fields), Value::Object(object)) => {
            let mut out = Map::with_capacity(object.len());
            for (key, child) in object {
                match fields.get(&key) {
                    Some(field) => {
                        let child = present(schema, field, child);
                        out.insert(key, child);
                    }
                    None if keep_unknown => {
                        out.insert(key, child);
                    }
                    None => tracing::trace!(field = %key, "dropped unknown field"),
                }
            }
            for (name, field) in fields {
                if out.contains_key(name) {
                    continue;
                }
                if let Some(default) = absent(schema, field) {
                    out.insert(name.clone(), default);
                }
            }
            Value::Object(out)
        }
        (Shape::List(item), Value::Array(items)) => Value::Array(
            items
                .into_iter()
                .map(|element| present(schema, item, element))
                .collect(),
        ),
        (Shape::Tuple(positions), Value::Array(items)) => {
            let len = items.len();
            let mut out = Vec::with_capacity(positions.len().max(len));
            let mut items = items.into_iter();
            for position in positions {
                match items.next() {
                    Some(element) => out.push(present(schema, position, element)),
                    None => match absent(schema, position) {
                        Some(default) => out.push(default),
                        None => break,
                    },
                }
            }
            if keep_unknown {
                out.extend(items);
            }
            Value::Array(out)
        }
        (_, value) => value,
    }
}

// ============================================================================
// FACADE
// ============================================================================

/// A compiled sanitization schema.
///
/// ```rust,ignore
/// let sanitizer = Sanitizer::new(&json!({"type": "string", "trim": true, "lowercase": true}))?;
/// assert_eq!(sanitizer.sanitize(json!("  Hello ")), json!("hello"));
/// ```
#[derive(Debug, Clone)]
pub struct Sanitizer {
    schema: Arc<Schema>,
}

impl Sanitizer {
    /// Compiles `raw` against the built-in sanitization rules.
    pub fn new(raw: &Value) -> Result<Self, SchemaError> {
        Self::builder().build(raw)
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> SanitizerBuilder {
        SanitizerBuilder::default()
    }

    /// Returns the sanitized form of `data`.
    #[must_use]
    pub fn sanitize(&self, data: Value) -> Value {
        sanitize(&self.schema, data)
    }

    /// The compiled schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Configures a [`Sanitizer`].
#[derive(Debug, Clone, Default)]
pub struct SanitizerBuilder {
    rules: Option<Arc<RuleRegistry>>,
    types: TypeRegistry,
}

impl SanitizerBuilder {
    /// Custom types visible to the schema.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    /// Replaces the built-in sanitization rules.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_registry(mut self, rules: Arc<RuleRegistry>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Compiles `raw`.
    pub fn build(self, raw: &Value) -> Result<Sanitizer, SchemaError> {
        let rules = self
            .rules
            .unwrap_or_else(|| Arc::clone(&SANITIZATION_RULES));
        if rules.context() != ContextKind::Sanitization {
            return Err(SchemaError::invalid_schema(
                &SchemaPath::root(),
                "a sanitizer needs a sanitization rule registry",
            ));
        }
        let schema = SchemaCompiler::new(&rules, &self.types).compile(raw)?;
        Ok(Sanitizer {
            schema: Arc::new(schema),
        })
    }
}

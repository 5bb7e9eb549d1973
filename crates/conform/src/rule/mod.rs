//! Rule descriptors and the rule registry.
//!
//! A [`RuleDescriptor`] is the static description of one rule: its
//! identifier, the shape its schema options must have, the kinds it applies
//! to, its priority, its default message template and what it does at run
//! time. A [`RuleRegistry`] holds the descriptors for one context kind
//! (validation or sanitization) and is what the schema compiler checks
//! option keys against.
//!
//! The compiler turns each option into a [`RuleInstance`]: the descriptor
//! plus the normalized [`RuleConfig`].

mod builtin;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::error::SchemaError;
use crate::kind::Kind;
use crate::message::Substitutions;
use crate::probe::Probes;

// ============================================================================
// APPLICABILITY SETS
// ============================================================================

/// Every built-in kind.
pub const ALL_KINDS: &[Kind] = &Kind::ALL;
/// Kinds holding a single value.
pub const SCALAR_KINDS: &[Kind] = &[
    Kind::Boolean,
    Kind::Integer,
    Kind::Float,
    Kind::Numeric,
    Kind::String,
];
/// The number kinds.
pub const NUMBER_KINDS: &[Kind] = &[Kind::Integer, Kind::Float, Kind::Numeric];
/// Strings only.
pub const STRING_KINDS: &[Kind] = &[Kind::String];
/// Compound kinds that can carry undeclared children.
pub const OPEN_KINDS: &[Kind] = &[Kind::Map, Kind::Tuple];

// ============================================================================
// CONTEXT KIND
// ============================================================================

/// Which engine a registry (and the schemas compiled against it) serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Rules report errors.
    Validation,
    /// Rules rewrite values.
    Sanitization,
}

// ============================================================================
// OPTION VALUES
// ============================================================================

/// A compiled, anchored regular expression together with its source.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: regex::Regex,
}

impl Pattern {
    /// Compiles `source` so that it must match the whole input.
    pub fn whole(source: &str) -> Result<Self, regex::Error> {
        let regex = regex::Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self {
            source: source.to_owned(),
            regex,
        })
    }

    /// The pattern as written in the schema.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True if the whole of `input` matches.
    #[must_use]
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}

/// The normalized value of one rule option.
#[derive(Debug, Clone)]
pub enum RuleValue {
    /// `required: true`, `email: false`, ...
    Flag(bool),
    /// `minlength: 3`.
    Count(usize),
    /// `min: 42`, `max: 9.5`.
    Number(Number),
    /// `allowed: ["small", "medium"]`.
    Values(Vec<Value>),
    /// `regex: "[a-z]+"`.
    Pattern(Pattern),
    /// `datetime: "%Y-%m-%d"`.
    Format(String),
    /// The `type` option.
    TypeName(String),
    /// Any JSON value, e.g. a sanitizer `default`.
    Any(Value),
}

impl RuleValue {
    /// The boolean of a `Flag`, `None` for other shapes.
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            RuleValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// The count of a `Count`, `None` for other shapes.
    #[must_use]
    pub fn as_count(&self) -> Option<usize> {
        match self {
            RuleValue::Count(count) => Some(*count),
            _ => None,
        }
    }
}

/// A rule option after normalization: bare and object forms collapse here.
#[derive(Debug, Clone)]
pub struct RuleConfig {
    /// The option value.
    pub value: RuleValue,
    /// Custom message template, overriding the descriptor's default.
    pub message: Option<String>,
}

// ============================================================================
// OPTION SHAPES
// ============================================================================

/// The accepted forms of a rule's schema option. Every shape except
/// `TypeName` and `Any` also accepts an object form
/// `{<key>: <bare value>, message: "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionShape {
    /// A boolean. The object form may omit `value`, which then defaults to
    /// `enforcing`: the state whose failure the message describes.
    Flag {
        /// The state in which the rule actually checks something.
        enforcing: bool,
    },
    /// A non-negative integer (`{value, message}`).
    Count,
    /// Any JSON number (`{value, message}`).
    Number,
    /// An array of scalars (`{values, message}`).
    Values,
    /// A regular expression (`{pattern, message}`).
    Pattern,
    /// A strftime format string (`{format, message}`).
    Format,
    /// A type name string; no object form.
    TypeName,
    /// Any JSON value; no object form.
    Any,
}

impl OptionShape {
    fn object_key(self) -> Option<&'static str> {
        match self {
            OptionShape::Flag { .. } | OptionShape::Count | OptionShape::Number => Some("value"),
            OptionShape::Values => Some("values"),
            OptionShape::Pattern => Some("pattern"),
            OptionShape::Format => Some("format"),
            OptionShape::TypeName | OptionShape::Any => None,
        }
    }

    /// Normalizes a raw option into a [`RuleConfig`], or explains why the
    /// option has the wrong shape.
    pub fn normalize(self, raw: &Value) -> Result<RuleConfig, String> {
        let (Some(key), Value::Object(fields)) = (self.object_key(), raw) else {
            return Ok(RuleConfig {
                value: self.bare(raw)?,
                message: None,
            });
        };

        let mut message = None;
        let mut value = None;
        for (name, field) in fields {
            if name == "message" {
                let text = field
                    .as_str()
                    .ok_or_else(|| "`message` must be a string".to_owned())?;
                message = Some(text.to_owned());
            } else if name == key {
                value = Some(self.bare(field)?);
            } else {
                return Err(format!("unexpected key `{name}`"));
            }
        }

        let value = match (value, self) {
            (Some(value), _) => value,
            (None, OptionShape::Flag { enforcing }) => RuleValue::Flag(enforcing),
            (None, _) => return Err(format!("missing `{key}`")),
        };
        Ok(RuleConfig { value, message })
    }

    /// Parses the bare (non-object) form.
    pub fn bare(self, raw: &Value) -> Result<RuleValue, String> {
        match (self, raw) {
            (OptionShape::Flag { .. }, Value::Bool(flag)) => Ok(RuleValue::Flag(*flag)),
            (OptionShape::Flag { .. }, _) => Err("expected a boolean".into()),

            (OptionShape::Count, Value::Number(n)) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(RuleValue::Count)
                .ok_or_else(|| "expected a non-negative integer".into()),
            (OptionShape::Count, _) => Err("expected a non-negative integer".into()),

            (OptionShape::Number, Value::Number(n)) => Ok(RuleValue::Number(n.clone())),
            (OptionShape::Number, _) => Err("expected a number".into()),

            (OptionShape::Values, Value::Array(items)) => {
                if items.iter().any(|v| v.is_array() || v.is_object()) {
                    Err("expected an array of scalar values".into())
                } else {
                    Ok(RuleValue::Values(items.clone()))
                }
            }
            (OptionShape::Values, _) => Err("expected an array of scalar values".into()),

            (OptionShape::Pattern, Value::String(source)) => Pattern::whole(source)
                .map(RuleValue::Pattern)
                .map_err(|e| format!("invalid regular expression: {e}")),
            (OptionShape::Pattern, _) => Err("expected a regular expression string".into()),

            (OptionShape::Format, Value::String(format)) => {
                if format.is_empty()
                    || StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
                {
                    Err(format!("invalid datetime format `{format}`"))
                } else {
                    Ok(RuleValue::Format(format.clone()))
                }
            }
            (OptionShape::Format, _) => Err("expected a datetime format string".into()),

            (OptionShape::TypeName, Value::String(name)) => Ok(RuleValue::TypeName(name.clone())),
            (OptionShape::TypeName, _) => Err("expected a type name".into()),

            (OptionShape::Any, value) => Ok(RuleValue::Any(value.clone())),
        }
    }

    /// False when a `Flag` sits in its non-enforcing state, in which case
    /// the rule is compiled but never run.
    #[must_use]
    pub fn is_enforcing(self, value: &RuleValue) -> bool {
        match (self, value) {
            (OptionShape::Flag { enforcing }, RuleValue::Flag(flag)) => *flag == enforcing,
            _ => true,
        }
    }
}

// ============================================================================
// DESCRIPTOR
// ============================================================================

/// When, relative to the type check and recursion, a rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// `required` / `nullable`: decides whether anything else runs.
    Presence,
    /// The `type` option.
    Type,
    /// Checks on a present value of the right kind.
    Value,
    /// Checks performed while recursing into children (`unknownAllowed`).
    Structure,
    /// Sanitizer rewrites.
    Transform,
}

/// Outcome of a value check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The rule holds.
    Pass,
    /// The rule failed; the substitutions feed the message template.
    Fail(Substitutions),
}

/// What a check function sees.
#[derive(Debug)]
pub struct RuleInput<'a> {
    /// The value under test. Always present, non-null and of the node's kind.
    pub value: &'a Value,
    /// The rule's normalized option.
    pub option: &'a RuleValue,
    /// The resolved kind of the node.
    pub kind: Kind,
    /// External collaborators.
    pub probes: &'a Probes,
}

/// A value check.
pub type CheckFn = Arc<dyn Fn(&RuleInput<'_>) -> Verdict + Send + Sync>;

/// A sanitizer rewrite: takes the current value and returns the new one.
pub type TransformFn = Arc<dyn Fn(Value, &RuleValue, Kind) -> Value + Send + Sync>;

/// What a rule does at run time.
#[derive(Clone, Default)]
pub enum RuleAction {
    /// Interpreted by the engine itself (presence, type, structure rules).
    #[default]
    Builtin,
    /// A value check.
    Check(CheckFn),
    /// A sanitizer rewrite.
    Transform(TransformFn),
}

impl fmt::Debug for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleAction::Builtin => f.write_str("Builtin"),
            RuleAction::Check(_) => f.write_str("Check(<fn>)"),
            RuleAction::Transform(_) => f.write_str("Transform(<fn>)"),
        }
    }
}

/// Static description of one rule.
#[derive(Debug, Clone)]
pub struct RuleDescriptor {
    id: Cow<'static, str>,
    phase: Phase,
    shape: OptionShape,
    priority: i32,
    applies_to: &'static [Kind],
    implicit: Option<RuleValue>,
    message: Cow<'static, str>,
    action: RuleAction,
}

impl RuleDescriptor {
    /// Creates a descriptor that applies to every kind, with priority 0,
    /// no implicit default and an empty message.
    pub fn new(id: impl Into<Cow<'static, str>>, phase: Phase, shape: OptionShape) -> Self {
        Self {
            id: id.into(),
            phase,
            shape,
            priority: 0,
            applies_to: ALL_KINDS,
            implicit: None,
            message: Cow::Borrowed(""),
            action: RuleAction::Builtin,
        }
    }

    /// Sets the execution priority. Lower runs first.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Restricts the rule to the given kinds.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_kinds(mut self, kinds: &'static [Kind]) -> Self {
        self.applies_to = kinds;
        self
    }

    /// Materializes the rule with `value` on every applicable node that
    /// does not declare it.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_implicit(mut self, value: RuleValue) -> Self {
        self.implicit = Some(value);
        self
    }

    /// Sets the default message template.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_message(mut self, template: impl Into<Cow<'static, str>>) -> Self {
        self.message = template.into();
        self
    }

    /// Attaches a value check.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&RuleInput<'_>) -> Verdict + Send + Sync + 'static,
    {
        self.action = RuleAction::Check(Arc::new(check));
        self
    }

    /// Attaches a sanitizer rewrite.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value, &RuleValue, Kind) -> Value + Send + Sync + 'static,
    {
        self.action = RuleAction::Transform(Arc::new(transform));
        self
    }

    /// Rule identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Execution phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Accepted option shape.
    #[must_use]
    pub fn shape(&self) -> OptionShape {
        self.shape
    }

    /// Execution priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Default message template.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Run-time behaviour.
    #[must_use]
    pub fn action(&self) -> &RuleAction {
        &self.action
    }

    /// Implicit default value, if the rule has one.
    #[must_use]
    pub fn implicit(&self) -> Option<&RuleValue> {
        self.implicit.as_ref()
    }

    /// Returns true if the rule can be declared on a node of `kind`.
    #[must_use]
    pub fn applies_to(&self, kind: Kind) -> bool {
        self.applies_to.contains(&kind)
    }

    fn order(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}

// ============================================================================
// INSTANCE
// ============================================================================

/// A rule attached to a compiled schema node.
#[derive(Debug, Clone)]
pub struct RuleInstance {
    descriptor: Arc<RuleDescriptor>,
    config: RuleConfig,
    active: bool,
}

impl RuleInstance {
    /// Binds a normalized option to its descriptor.
    #[must_use]
    pub fn new(descriptor: Arc<RuleDescriptor>, config: RuleConfig) -> Self {
        let active = descriptor.shape.is_enforcing(&config.value);
        Self {
            descriptor,
            config,
            active,
        }
    }

    /// Rule identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.descriptor.id()
    }

    /// The descriptor this instance was built from.
    #[must_use]
    pub fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    /// Normalized option value.
    #[must_use]
    pub fn value(&self) -> &RuleValue {
        &self.config.value
    }

    /// The message template to render: the schema override if present,
    /// the descriptor default otherwise.
    #[must_use]
    pub fn template(&self) -> &str {
        self.config
            .message
            .as_deref()
            .unwrap_or_else(|| self.descriptor.message())
    }

    /// True if the schema carries a custom message for this rule.
    #[must_use]
    pub fn has_custom_message(&self) -> bool {
        self.config.message.is_some()
    }

    /// False for flags in their non-enforcing state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Points a `type` rule at another type name. Other rules are returned
    /// as they are.
    pub(crate) fn relabeled(mut self, label: &str) -> Self {
        if let RuleValue::TypeName(name) = &mut self.config.value {
            label.clone_into(name);
        }
        self
    }

    pub(crate) fn order(&self, other: &Self) -> Ordering {
        self.descriptor.order(&other.descriptor)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// The rules available to schemas of one context kind.
///
/// Registries are plain values: build one, register extra rules, then share
/// it read-only (behind an `Arc`) with every compiler that needs it.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    context: ContextKind,
    rules: IndexMap<String, Arc<RuleDescriptor>>,
}

impl RuleRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new(context: ContextKind) -> Self {
        Self {
            context,
            rules: IndexMap::new(),
        }
    }

    /// The built-in validation rules.
    #[must_use]
    pub fn validation() -> Self {
        let mut registry = Self::new(ContextKind::Validation);
        for descriptor in builtin::descriptors() {
            registry
                .rules
                .insert(descriptor.id().to_owned(), Arc::new(descriptor));
        }
        registry.sort();
        registry
    }

    /// The built-in sanitization rules.
    #[must_use]
    pub fn sanitization() -> Self {
        let mut registry = Self::new(ContextKind::Sanitization);
        for descriptor in crate::sanitize::descriptors() {
            registry
                .rules
                .insert(descriptor.id().to_owned(), Arc::new(descriptor));
        }
        registry.sort();
        registry
    }

    /// Adds a rule. Identifiers are unique within a registry.
    pub fn register(&mut self, descriptor: RuleDescriptor) -> Result<(), SchemaError> {
        if self.rules.contains_key(descriptor.id()) {
            return Err(SchemaError::RuleAlreadyRegistered {
                rule: descriptor.id().to_owned(),
            });
        }
        tracing::debug!(rule = descriptor.id(), context = ?self.context, "registering rule");
        self.rules
            .insert(descriptor.id().to_owned(), Arc::new(descriptor));
        self.sort();
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_rule(mut self, descriptor: RuleDescriptor) -> Result<Self, SchemaError> {
        self.register(descriptor)?;
        Ok(self)
    }

    /// Looks up a rule by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<RuleDescriptor>> {
        self.rules.get(id)
    }

    /// Returns true if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    /// The engine this registry serves.
    #[must_use]
    pub fn context(&self) -> ContextKind {
        self.context
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All descriptors in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RuleDescriptor>> {
        self.rules.values()
    }

    fn sort(&mut self) {
        self.rules.sort_by(|_, a, _, b| a.order(b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flag_object_form_defaults_to_enforcing_state() {
        let required = OptionShape::Flag { enforcing: true };
        let config = required.normalize(&json!({"message": "gone"})).unwrap();
        assert_eq!(config.value.as_flag(), Some(true));
        assert_eq!(config.message.as_deref(), Some("gone"));

        let nullable = OptionShape::Flag { enforcing: false };
        let config = nullable.normalize(&json!({"message": "no nulls"})).unwrap();
        assert_eq!(config.value.as_flag(), Some(false));
        assert!(nullable.is_enforcing(&config.value));
    }

    #[test]
    fn object_form_rejects_unknown_keys() {
        let err = OptionShape::Values
            .normalize(&json!({"values": ["a"], "msg": "typo"}))
            .unwrap_err();
        assert!(err.contains("`msg`"));
    }

    #[test]
    fn object_form_requires_its_key() {
        let err = OptionShape::Count
            .normalize(&json!({"message": "x"}))
            .unwrap_err();
        assert_eq!(err, "missing `value`");
    }

    #[test]
    fn bare_shapes() {
        assert_eq!(OptionShape::Count.bare(&json!(3)).unwrap().as_count(), Some(3));
        assert!(OptionShape::Count.bare(&json!(-1)).is_err());
        assert!(OptionShape::Count.bare(&json!(1.5)).is_err());
        assert!(OptionShape::Number.bare(&json!("42")).is_err());
        assert!(OptionShape::Values.bare(&json!([1, "a", null])).is_ok());
        assert!(OptionShape::Values.bare(&json!([[1]])).is_err());
        assert!(OptionShape::Pattern.bare(&json!("(unclosed")).is_err());
        assert!(OptionShape::Format.bare(&json!("%Y-%m-%d")).is_ok());
        assert!(OptionShape::Format.bare(&json!("%Q")).is_err());
        assert!(OptionShape::Format.bare(&json!("")).is_err());
    }

    #[test]
    fn any_shape_has_no_object_form() {
        let config = OptionShape::Any.normalize(&json!({"message": "kept"})).unwrap();
        assert!(config.message.is_none());
        assert!(matches!(config.value, RuleValue::Any(Value::Object(_))));
    }

    #[test]
    fn patterns_match_the_whole_string() {
        let pattern = Pattern::whole("[a-z]+").unwrap();
        assert!(pattern.is_match("abc"));
        assert!(!pattern.is_match("abc1"));
        assert!(!pattern.is_match("1abc"));
        assert_eq!(pattern.source(), "[a-z]+");

        let alternation = Pattern::whole("a|b").unwrap();
        assert!(!alternation.is_match("ab"));
    }

    #[test]
    fn registry_orders_by_priority_then_id() {
        let registry = RuleRegistry::validation();
        let ids: Vec<_> = registry.iter().map(|d| d.id().to_owned()).collect();
        assert_eq!(&ids[..3], ["required", "nullable", "type"]);
        assert_eq!(ids.last().map(String::as_str), Some("unknownAllowed"));

        let priorities: Vec<_> = registry.iter().map(|d| d.priority()).collect();
        assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = RuleRegistry::validation();
        let err = registry
            .register(RuleDescriptor::new("min", Phase::Value, OptionShape::Number))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::RuleAlreadyRegistered {
                rule: "min".into()
            }
        );
    }

    #[test]
    fn custom_rules_slot_into_priority_order() {
        let registry = RuleRegistry::new(ContextKind::Validation)
            .with_rule(RuleDescriptor::new("late", Phase::Value, OptionShape::Any).with_priority(5))
            .unwrap()
            .with_rule(RuleDescriptor::new("early", Phase::Value, OptionShape::Any).with_priority(1))
            .unwrap();
        let ids: Vec<_> = registry.iter().map(|d| d.id()).collect();
        assert_eq!(ids, ["early", "late"]);
        assert!(registry.contains("early"));
        assert!(!registry.contains("min"));
    }
}

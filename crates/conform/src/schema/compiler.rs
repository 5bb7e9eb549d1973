//! Raw schema definition → [`Schema`].
//!
//! Depth-first descent over the raw definition. At each node the compiler
//! resolves `type`, normalizes every other option into a rule instance
//! (checked against the registry's option shapes), materializes implicit
//! defaults and recurses into `schema`. The first problem aborts
//! compilation with a [`SchemaError`] naming its path.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{CompiledType, Schema, SchemaNode, Shape, TypeName};
use crate::error::SchemaError;
use crate::kind::Kind;
use crate::path::SchemaPath;
use crate::rule::{Phase, RuleConfig, RuleDescriptor, RuleInstance, RuleRegistry, RuleValue};
use crate::types::TypeRegistry;

/// Compiles raw schema definitions against a rule registry and a type
/// registry. Pure: the same inputs always give the same schema or error.
#[derive(Debug, Clone, Copy)]
pub struct SchemaCompiler<'a> {
    rules: &'a RuleRegistry,
    types: &'a TypeRegistry,
}

impl<'a> SchemaCompiler<'a> {
    /// Creates a compiler.
    #[must_use]
    pub fn new(rules: &'a RuleRegistry, types: &'a TypeRegistry) -> Self {
        Self { rules, types }
    }

    /// Compiles `raw` into an immutable schema.
    pub fn compile(&self, raw: &Value) -> Result<Schema, SchemaError> {
        let mut session = Session {
            rules: self.rules,
            types: self.types,
            slots: HashMap::new(),
            resolving: Vec::new(),
            nodes: 0,
        };
        let root = session.node(raw, &SchemaPath::root())?;
        let nodes = session.nodes;
        let types = session.finish();

        tracing::debug!(
            nodes,
            custom_types = types.len(),
            context = ?self.rules.context(),
            "compiled schema"
        );

        Ok(Schema {
            root,
            types,
            context: self.rules.context(),
        })
    }
}

/// A custom type as it is being compiled. Rules are known before the shape,
/// so self references made while compiling the shape can already use them.
struct TypeSlot {
    kind: Kind,
    rules: Vec<RuleInstance>,
    shape: Option<Shape>,
}

struct Session<'a> {
    rules: &'a RuleRegistry,
    types: &'a TypeRegistry,
    slots: HashMap<Arc<str>, TypeSlot>,
    /// Custom types whose base type is still being resolved (alias chain).
    resolving: Vec<String>,
    nodes: usize,
}

impl Session<'_> {
    fn node(&mut self, raw: &Value, path: &SchemaPath) -> Result<SchemaNode, SchemaError> {
        let options = as_options(raw, path)?;
        let type_name = declared_type(options, path)?;
        self.nodes += 1;

        if let Some(kind) = Kind::parse(type_name) {
            let rules = self.rules_for(options, kind, type_name, path, true)?;
            let shape = self.shape(kind, options.get("schema"), path)?;
            return Ok(SchemaNode {
                type_name: TypeName::Builtin(kind),
                kind,
                rules,
                shape,
            });
        }

        reject_local_children(options, type_name, path)?;
        let name = self.resolve_type(type_name, path)?;
        let (kind, inherited) = {
            let slot = &self.slots[&name];
            (slot.kind, slot.rules.clone())
        };
        let local = self.rules_for(options, kind, type_name, path, false)?;

        Ok(SchemaNode {
            type_name: TypeName::Custom(Arc::clone(&name)),
            kind,
            rules: overlay(inherited, local),
            shape: Shape::Named(name),
        })
    }

    /// Makes sure the custom type `name` has a slot and returns its key.
    ///
    /// Declaring a type fixes its kind and rules for the whole alias chain
    /// down to the built-in base. Only then is the base's `schema`
    /// compiled, so references from inside it to any name on the chain
    /// find a slot and stay `Shape::Named` indirections.
    fn resolve_type(&mut self, name: &str, path: &SchemaPath) -> Result<Arc<str>, SchemaError> {
        let (key, base) = self.declare_type(name, path)?;
        if let Some(base) = base {
            self.define_shape(&base)?;
        }
        Ok(key)
    }

    /// Inserts slots for `name` and every alias it goes through. Returns the
    /// key of `name` and, if it was declared by this call, the base type
    /// whose shape is still to be compiled.
    fn declare_type(
        &mut self,
        name: &str,
        path: &SchemaPath,
    ) -> Result<(Arc<str>, Option<Arc<str>>), SchemaError> {
        if let Some((key, _)) = self.slots.get_key_value(name) {
            return Ok((Arc::clone(key), None));
        }
        if self.resolving.iter().any(|pending| pending == name) {
            return Err(SchemaError::CyclicType {
                path: path.clone(),
                name: name.to_owned(),
            });
        }
        let types = self.types;
        let raw = types.resolve(name).ok_or_else(|| SchemaError::UnknownType {
            path: path.clone(),
            name: name.to_owned(),
        })?;

        tracing::trace!(type_name = name, "compiling custom type");
        let type_path = SchemaPath::for_type(name);
        let options = as_options(raw, &type_path)?;
        let base = declared_type(options, &type_path)?;
        let key: Arc<str> = Arc::from(name);

        if let Some(kind) = Kind::parse(base) {
            // `{expected}` in type errors names the custom type, not its kind
            let rules = self.rules_for(options, kind, name, &type_path, true)?;
            self.slots.insert(
                Arc::clone(&key),
                TypeSlot {
                    kind,
                    rules,
                    shape: None,
                },
            );
            return Ok((Arc::clone(&key), Some(key)));
        }

        // An alias of another custom type.
        reject_local_children(options, base, &type_path)?;
        self.resolving.push(name.to_owned());
        let declared = self.declare_type(base, &type_path.join("type"));
        self.resolving.pop();
        let (target, pending) = declared?;

        let (kind, inherited) = {
            let slot = &self.slots[&target];
            (slot.kind, slot.rules.clone())
        };
        let local = self.rules_for(options, kind, base, &type_path, false)?;
        let rules = overlay(inherited, local)
            .into_iter()
            .map(|rule| rule.relabeled(name))
            .collect();
        self.slots.insert(
            Arc::clone(&key),
            TypeSlot {
                kind,
                rules,
                shape: Some(Shape::Named(target)),
            },
        );
        Ok((key, pending))
    }

    /// Compiles the `schema` of a declared type with a built-in base.
    fn define_shape(&mut self, name: &Arc<str>) -> Result<(), SchemaError> {
        let path = SchemaPath::for_type(name);
        let types = self.types;
        let raw = types.resolve(name).ok_or_else(|| SchemaError::UnknownType {
            path: path.clone(),
            name: name.to_string(),
        })?;
        let options = as_options(raw, &path)?;
        let kind = self.slots[name].kind;
        let shape = self.shape(kind, options.get("schema"), &path)?;
        if let Some(slot) = self.slots.get_mut(name) {
            slot.shape = Some(shape);
        }
        Ok(())
    }

    fn shape(
        &mut self,
        kind: Kind,
        raw: Option<&Value>,
        path: &SchemaPath,
    ) -> Result<Shape, SchemaError> {
        let schema_path = path.join("schema");
        match kind {
            Kind::Map => {
                let Some(Value::Object(fields)) = raw else {
                    return Err(SchemaError::invalid_schema(
                        &schema_path,
                        "`map` requires a mapping of field name to schema",
                    ));
                };
                let mut children = IndexMap::with_capacity(fields.len());
                for (name, child) in fields {
                    let node = self.node(child, &schema_path.join(name))?;
                    children.insert(name.clone(), node);
                }
                Ok(Shape::Map(children))
            }
            Kind::List => match raw {
                Some(child @ Value::Object(_)) => {
                    Ok(Shape::List(Box::new(self.node(child, &schema_path)?)))
                }
                _ => Err(SchemaError::invalid_schema(
                    &schema_path,
                    "`list` requires exactly one child schema",
                )),
            },
            Kind::Tuple => match raw {
                Some(Value::Array(items)) => items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| self.node(child, &schema_path.join(index)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Shape::Tuple),
                _ => Err(SchemaError::invalid_schema(
                    &schema_path,
                    "`tuple` requires an ordered sequence of child schemas",
                )),
            },
            _ => match raw {
                None => Ok(Shape::Scalar),
                Some(_) => Err(SchemaError::invalid_option(
                    &schema_path,
                    "schema",
                    format!("type `{kind}` does not take a child schema"),
                )),
            },
        }
    }

    /// Normalizes the rule options of one node.
    ///
    /// With `materialize`, rules the node does not declare are added with
    /// their implicit defaults, and the `type` rule is added carrying
    /// `type_label`. Reference nodes skip this: they inherit those rules
    /// from the custom type.
    fn rules_for(
        &self,
        options: &Map<String, Value>,
        kind: Kind,
        type_label: &str,
        path: &SchemaPath,
        materialize: bool,
    ) -> Result<Vec<RuleInstance>, SchemaError> {
        let mut rules: Vec<RuleInstance> = Vec::with_capacity(options.len() + 4);

        for (key, raw) in options {
            if key == "type" || key == "schema" {
                continue;
            }
            let option_path = path.join(key);
            let (descriptor, config) = if is_index(key) {
                self.indexed_entry(raw, &option_path)?
            } else {
                let descriptor = self.descriptor(key, &option_path)?;
                let config = descriptor
                    .shape()
                    .normalize(raw)
                    .map_err(|reason| SchemaError::invalid_option(&option_path, key.as_str(), reason))?;
                (descriptor, config)
            };

            if !descriptor.applies_to(kind) {
                return Err(SchemaError::RuleNotApplicable {
                    path: option_path,
                    rule: descriptor.id().to_owned(),
                    kind,
                });
            }
            if rules.iter().any(|rule| rule.id() == descriptor.id()) {
                return Err(SchemaError::DuplicateRule {
                    path: option_path,
                    rule: descriptor.id().to_owned(),
                });
            }
            rules.push(RuleInstance::new(descriptor, config));
        }

        if materialize {
            for descriptor in self.rules.iter() {
                if !descriptor.applies_to(kind) || rules.iter().any(|rule| rule.id() == descriptor.id()) {
                    continue;
                }
                let value = match (descriptor.phase(), descriptor.implicit()) {
                    (Phase::Type, _) => RuleValue::TypeName(type_label.to_owned()),
                    (_, Some(value)) => value.clone(),
                    (_, None) => continue,
                };
                rules.push(RuleInstance::new(
                    Arc::clone(descriptor),
                    RuleConfig {
                        value,
                        message: None,
                    },
                ));
            }
        }

        rules.sort_by(RuleInstance::order);
        Ok(rules)
    }

    /// `{"0": {"allowed": [...], "message": "..."}}`
    fn indexed_entry(
        &self,
        raw: &Value,
        path: &SchemaPath,
    ) -> Result<(Arc<RuleDescriptor>, RuleConfig), SchemaError> {
        const SHAPE: &str = "an indexed entry must hold exactly one rule and an optional `message`";

        let Value::Object(entry) = raw else {
            return Err(SchemaError::invalid_schema(path, SHAPE));
        };

        let mut rule = None;
        let mut message = None;
        for (key, value) in entry {
            if key == "message" {
                let text = value.as_str().ok_or_else(|| {
                    SchemaError::invalid_schema(&path.join("message"), "`message` must be a string")
                })?;
                message = Some(text.to_owned());
            } else if rule.replace((key, value)).is_some() {
                return Err(SchemaError::invalid_schema(path, SHAPE));
            }
        }

        let Some((id, value)) = rule else {
            return Err(SchemaError::invalid_schema(path, SHAPE));
        };
        if id == "type" || id == "schema" {
            return Err(SchemaError::invalid_schema(
                path,
                format!("`{id}` cannot be declared through an indexed entry"),
            ));
        }

        let rule_path = path.join(id);
        let descriptor = self.descriptor(id, &rule_path)?;
        let mut config = descriptor
            .shape()
            .normalize(value)
            .map_err(|reason| SchemaError::invalid_option(&rule_path, id.as_str(), reason))?;
        if message.is_some() {
            config.message = message;
        }
        Ok((descriptor, config))
    }

    fn descriptor(&self, id: &str, path: &SchemaPath) -> Result<Arc<RuleDescriptor>, SchemaError> {
        self.rules
            .get(id)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownRule {
                path: path.clone(),
                rule: id.to_owned(),
            })
    }

    fn finish(self) -> HashMap<Arc<str>, CompiledType> {
        self.slots
            .into_iter()
            .map(|(name, slot)| {
                let compiled = CompiledType {
                    name: Arc::clone(&name),
                    kind: slot.kind,
                    rules: slot.rules,
                    shape: slot.shape.unwrap_or(Shape::Scalar),
                };
                (name, compiled)
            })
            .collect()
    }
}

fn as_options<'v>(raw: &'v Value, path: &SchemaPath) -> Result<&'v Map<String, Value>, SchemaError> {
    raw.as_object()
        .ok_or_else(|| SchemaError::invalid_schema(path, "a schema definition must be an object"))
}

fn declared_type<'v>(options: &'v Map<String, Value>, path: &SchemaPath) -> Result<&'v str, SchemaError> {
    match options.get("type") {
        None => Err(SchemaError::MissingOption {
            path: path.clone(),
            option: "type",
        }),
        Some(Value::String(name)) => Ok(name),
        Some(_) => Err(SchemaError::invalid_option(
            &path.join("type"),
            "type",
            "expected a type name",
        )),
    }
}

fn reject_local_children(
    options: &Map<String, Value>,
    type_name: &str,
    path: &SchemaPath,
) -> Result<(), SchemaError> {
    if options.contains_key("schema") {
        return Err(SchemaError::invalid_option(
            &path.join("schema"),
            "schema",
            format!("custom type `{type_name}` already declares its children"),
        ));
    }
    Ok(())
}

fn is_index(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// `base` with every rule in `local` replacing the one with the same id.
fn overlay(mut base: Vec<RuleInstance>, local: Vec<RuleInstance>) -> Vec<RuleInstance> {
    for rule in local {
        match base.iter_mut().find(|existing| existing.id() == rule.id()) {
            Some(existing) => *existing = rule,
            None => base.push(rule),
        }
    }
    base.sort_by(RuleInstance::order);
    base
}

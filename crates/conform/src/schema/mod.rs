//! Compiled schemas.
//!
//! A [`Schema`] is the immutable output of the [`SchemaCompiler`]: a tree of
//! [`SchemaNode`]s plus a table of compiled custom types. Nodes that
//! reference a custom type do not inline it; their shape is
//! [`Shape::Named`] and the engine looks the children up in the table while
//! walking data. That keeps self-referential types finite.

mod compiler;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

pub use compiler::SchemaCompiler;

use crate::kind::Kind;
use crate::rule::{ContextKind, RuleInstance};

/// The declared type of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeName {
    /// One of the built-in kinds.
    Builtin(Kind),
    /// A registered custom type.
    Custom(Arc<str>),
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Builtin(kind) => write!(f, "{kind}"),
            TypeName::Custom(name) => f.write_str(name),
        }
    }
}

/// Children of a node. Populated only when consistent with the node's kind.
#[derive(Debug, Clone)]
pub enum Shape {
    /// No children.
    Scalar,
    /// Declared fields of a map, in declaration order.
    Map(IndexMap<String, SchemaNode>),
    /// The schema shared by every list element.
    List(Box<SchemaNode>),
    /// One schema per tuple position.
    Tuple(Vec<SchemaNode>),
    /// The children of a custom type, looked up in the schema's type table.
    Named(Arc<str>),
}

static SCALAR: Shape = Shape::Scalar;

/// One compiled node.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub(crate) type_name: TypeName,
    pub(crate) kind: Kind,
    pub(crate) rules: Vec<RuleInstance>,
    pub(crate) shape: Shape,
}

impl SchemaNode {
    /// The declared type.
    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// The resolved built-in kind.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// All rules, in execution order.
    #[must_use]
    pub fn rules(&self) -> &[RuleInstance] {
        &self.rules
    }

    /// A rule by identifier.
    #[must_use]
    pub fn rule(&self, id: &str) -> Option<&RuleInstance> {
        self.rules.iter().find(|rule| rule.id() == id)
    }

    /// A rule by identifier, only if it is in its enforcing state.
    #[must_use]
    pub fn active_rule(&self, id: &str) -> Option<&RuleInstance> {
        self.rule(id).filter(|rule| rule.is_active())
    }

    /// The node's own shape. Use [`Schema::shape`] to see through custom
    /// type references.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// A custom type compiled once per schema.
#[derive(Debug, Clone)]
pub struct CompiledType {
    pub(crate) name: Arc<str>,
    pub(crate) kind: Kind,
    pub(crate) rules: Vec<RuleInstance>,
    pub(crate) shape: Shape,
}

impl CompiledType {
    /// The registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The built-in kind the type resolves to.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The type's own rules, before any per-reference overrides.
    #[must_use]
    pub fn rules(&self) -> &[RuleInstance] {
        &self.rules
    }
}

/// An immutable compiled schema. Cheap to share behind an `Arc`; safe to
/// use from many threads at once.
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) root: SchemaNode,
    pub(crate) types: HashMap<Arc<str>, CompiledType>,
    pub(crate) context: ContextKind,
}

impl Schema {
    /// The root node.
    #[must_use]
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// The engine this schema was compiled for.
    #[must_use]
    pub fn context(&self) -> ContextKind {
        self.context
    }

    /// A compiled custom type by name.
    #[must_use]
    pub fn custom_type(&self, name: &str) -> Option<&CompiledType> {
        self.types.get(name)
    }

    /// Number of custom types reachable from the root.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// The effective shape of `node`, following custom type references.
    #[must_use]
    pub fn shape<'a>(&'a self, node: &'a SchemaNode) -> &'a Shape {
        let mut shape = &node.shape;
        while let Shape::Named(name) = shape {
            match self.types.get(name) {
                Some(custom) => shape = &custom.shape,
                None => return &SCALAR,
            }
        }
        shape
    }

    /// Declared fields of a map node.
    #[must_use]
    pub fn fields<'a>(&'a self, node: &'a SchemaNode) -> Option<&'a IndexMap<String, SchemaNode>> {
        match self.shape(node) {
            Shape::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Element schema of a list node.
    #[must_use]
    pub fn item<'a>(&'a self, node: &'a SchemaNode) -> Option<&'a SchemaNode> {
        match self.shape(node) {
            Shape::List(item) => Some(item),
            _ => None,
        }
    }

    /// Positional schemas of a tuple node.
    #[must_use]
    pub fn positions<'a>(&'a self, node: &'a SchemaNode) -> Option<&'a [SchemaNode]> {
        match self.shape(node) {
            Shape::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

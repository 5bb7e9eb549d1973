//! Registry of named, reusable schema fragments (custom types).
//!
//! Definitions are stored raw. The compiler resolves a name only when it
//! meets a reference, so types may refer to themselves or to types that
//! are registered later.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::SchemaError;
use crate::kind::Kind;

/// Named raw schema definitions.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Value>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a custom type. The definition is not checked
    /// until a schema referencing it is compiled.
    pub fn register(&mut self, name: impl Into<String>, definition: Value) -> Result<(), SchemaError> {
        let name = name.into();
        if Kind::parse(&name).is_some() {
            return Err(SchemaError::ReservedTypeName { name });
        }
        if self.types.insert(name.clone(), definition).is_some() {
            tracing::debug!(type_name = %name, "replaced custom type definition");
        }
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_type(mut self, name: impl Into<String>, definition: Value) -> Result<Self, SchemaError> {
        self.register(name, definition)?;
        Ok(self)
    }

    /// The raw definition registered under `name`.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.types.get(name)
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

//! Error types.
//!
//! Two taxonomies live here:
//!
//! - [`SchemaError`]: a malformed schema, raised by the compiler before any
//!   data is examined. Every variant names the schema path of the offending
//!   node.
//! - [`ValidationError`] / [`ValidationErrors`]: data-level failures. They
//!   are never raised mid-walk; the engine collects them and hands the whole
//!   list back to the caller.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kind::Kind;
use crate::path::{Path, SchemaPath};

// ============================================================================
// SCHEMA ERROR
// ============================================================================

/// A schema definition that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A mandatory option (currently only `type`) is absent.
    #[error("{path}: missing required option `{option}`")]
    MissingOption {
        /// Offending node.
        path: SchemaPath,
        /// The option that should have been present.
        option: &'static str,
    },

    /// `type` names neither a built-in kind nor a registered custom type.
    #[error("{path}: unknown type `{name}`")]
    UnknownType {
        /// Offending node.
        path: SchemaPath,
        /// The unresolved type name.
        name: String,
    },

    /// An option key that is not a rule of the active registry.
    #[error("{path}: unknown rule `{rule}`")]
    UnknownRule {
        /// Path of the option.
        path: SchemaPath,
        /// The unrecognised rule identifier.
        rule: String,
    },

    /// A known rule whose options have the wrong shape.
    #[error("{path}: invalid options for rule `{rule}`: {reason}")]
    InvalidOption {
        /// Path of the option.
        path: SchemaPath,
        /// Rule identifier.
        rule: String,
        /// What is wrong with the options.
        reason: String,
    },

    /// A node that is structurally malformed (not an object, a missing or
    /// misshapen `schema` entry, ...).
    #[error("{path}: {reason}")]
    InvalidSchema {
        /// Offending node.
        path: SchemaPath,
        /// What is wrong with it.
        reason: String,
    },

    /// A rule declared on a node of a kind it cannot check.
    #[error("{path}: rule `{rule}` does not apply to type `{kind}`")]
    RuleNotApplicable {
        /// Path of the option.
        path: SchemaPath,
        /// Rule identifier.
        rule: String,
        /// Resolved kind of the node.
        kind: Kind,
    },

    /// The same rule declared twice on one node.
    #[error("{path}: rule `{rule}` is declared more than once")]
    DuplicateRule {
        /// The second declaration of the rule.
        path: SchemaPath,
        /// Rule identifier.
        rule: String,
    },

    /// A custom type registered under a built-in kind name.
    #[error("type name `{name}` is reserved for a built-in type")]
    ReservedTypeName {
        /// The rejected name.
        name: String,
    },

    /// A chain of custom type aliases that never reaches a built-in kind.
    #[error("{path}: type `{name}` is defined in terms of itself")]
    CyclicType {
        /// The reference that closed the cycle.
        path: SchemaPath,
        /// The type that was being resolved.
        name: String,
    },

    /// A rule registered twice in one registry.
    #[error("rule `{rule}` is already registered")]
    RuleAlreadyRegistered {
        /// Rule identifier.
        rule: String,
    },
}

impl SchemaError {
    /// The schema path the error points at, if it has one.
    #[must_use]
    pub fn path(&self) -> Option<&SchemaPath> {
        match self {
            Self::MissingOption { path, .. }
            | Self::UnknownType { path, .. }
            | Self::UnknownRule { path, .. }
            | Self::InvalidOption { path, .. }
            | Self::InvalidSchema { path, .. }
            | Self::RuleNotApplicable { path, .. }
            | Self::DuplicateRule { path, .. }
            | Self::CyclicType { path, .. } => Some(path),
            Self::ReservedTypeName { .. } | Self::RuleAlreadyRegistered { .. } => None,
        }
    }

    pub(crate) fn invalid_schema(path: &SchemaPath, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_option(
        path: &SchemaPath,
        rule: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            path: path.clone(),
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// One failed rule at one location of the validated document.
///
/// Equality is structural over path, rule and message.
///
/// ```rust,ignore
/// let error = ValidationError::new(Path::from_segments(["name"]), "required", "Required.");
/// assert_eq!(error.path.to_string(), "/name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationError {
    /// Where the failure occurred. `path.segments()[0]` is the empty root marker.
    pub path: Path,

    /// Identifier of the failed rule, e.g. `required`, `type`, `allowed`.
    pub rule: Cow<'static, str>,

    /// Fully rendered message, substitutions applied.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(
        path: Path,
        rule: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path,
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.path, self.rule, self.message)
    }
}

// ============================================================================
// ERROR COLLECTION
// ============================================================================

/// Ordered list of validation errors from one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Appends an error.
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// All errors in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Iterates over the errors.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Errors recorded at exactly `path`.
    pub fn at<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| &e.path == path)
    }

    /// Consumes the collection.
    #[must_use]
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }

    /// `Ok(ok_value)` when empty, `Err(self)` otherwise.
    #[must_use = "result must be used"]
    pub fn into_result<T>(self, ok_value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(ok_value)
        } else {
            Err(self)
        }
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Segment;
    use pretty_assertions::assert_eq;

    #[test]
    fn schema_error_names_the_path() {
        let error = SchemaError::MissingOption {
            path: SchemaPath::root().join("schema").join("name"),
            option: "type",
        };
        assert_eq!(
            error.to_string(),
            "/schema/name: missing required option `type`"
        );
        assert_eq!(error.path().map(SchemaPath::as_str), Some("/schema/name"));
    }

    #[test]
    fn reserved_name_has_no_path() {
        let error = SchemaError::ReservedTypeName {
            name: "string".into(),
        };
        assert!(error.path().is_none());
    }

    #[test]
    fn validation_errors_are_structurally_equal() {
        let a = ValidationError::new(Path::from_segments(["name"]), "required", "Required.");
        let b = ValidationError::new(Path::from_segments(["name"]), "required", "Required.");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "[/name] required: Required.");
    }

    #[test]
    fn collection_into_result() {
        let empty = ValidationErrors::new();
        assert_eq!(empty.into_result(7), Ok(7));

        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::new(Path::root(), "type", "Invalid type."));
        assert!(errors.has_errors());
        assert_eq!(errors.at(&Path::root()).count(), 1);
        assert!(errors.clone().into_result(()).is_err());
        assert_eq!(errors.into_vec()[0].rule, "type");
    }

    #[test]
    fn serialized_shape_is_path_rule_message() {
        let error = ValidationError::new(
            Path::from_segments([Segment::from("tags"), Segment::from(0usize)]),
            "allowed",
            "Nope.",
        );
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"path": ["", "tags", 0], "rule": "allowed", "message": "Nope."})
        );
    }
}

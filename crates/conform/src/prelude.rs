//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use conform::prelude::*;
//! ```

// ============================================================================
// FACADES
// ============================================================================

pub use crate::sanitize::{Sanitizer, SanitizerBuilder};
pub use crate::validator::{Validator, ValidatorBuilder};

// ============================================================================
// ERRORS AND PATHS
// ============================================================================

pub use crate::error::{SchemaError, ValidationError, ValidationErrors};
pub use crate::path::{Path, SchemaPath, Segment};

// ============================================================================
// EXTENSION POINTS
// ============================================================================

pub use crate::kind::Kind;
pub use crate::message::{MessageRenderer, Substitution, Substitutions, TemplateRenderer};
pub use crate::probe::{EntryKind, FormatProbe, PathProbe, Probes};
pub use crate::rule::{
    ContextKind, OptionShape, Phase, RuleDescriptor, RuleInput, RuleRegistry, RuleValue, Verdict,
};
pub use crate::schema::{Schema, SchemaCompiler};
pub use crate::types::TypeRegistry;

//! # conform
//!
//! Declarative validation and sanitization for `serde_json::Value` documents.
//!
//! A schema is itself a JSON value: a `type` (built-in kind or registered
//! custom type), an optional `schema` for children and any number of rule
//! options. Schemas are compiled once and checked up front; validation then
//! walks the whole document and reports every violation with its path
//! instead of stopping at the first one.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conform::prelude::*;
//! use serde_json::json;
//!
//! let mut validator = Validator::new(&json!({
//!     "type": "map",
//!     "schema": {
//!         "name": {"type": "string", "minlength": 2},
//!         "size": {"type": "string", "allowed": ["small", "medium"]}
//!     }
//! }))?;
//!
//! assert!(!validator.validate(&json!({"name": "x", "size": "large", "extra": 1})));
//! for error in validator.errors() {
//!     println!("{error}"); // [/name] minlength: The field <name> must be ...
//! }
//! ```
//!
//! ## Layers
//!
//! - [`RuleRegistry`](rule::RuleRegistry): rule descriptors, one registry per
//!   context kind (validation or sanitization)
//! - [`TypeRegistry`](types::TypeRegistry): named raw schema fragments,
//!   resolved lazily so types may be recursive
//! - [`SchemaCompiler`](schema::SchemaCompiler): raw schema →
//!   [`Schema`](schema::Schema), or a [`SchemaError`](error::SchemaError)
//!   naming the offending path
//! - [`engine`]: the recursive walk, collecting errors into a
//!   [`Context`](context::Context)
//! - [`Validator`] / [`Sanitizer`]: facades wiring the above together

pub mod context;
pub mod engine;
pub mod error;
pub mod kind;
pub mod message;
pub mod path;
pub mod prelude;
pub mod probe;
pub mod rule;
pub mod sanitize;
pub mod schema;
pub mod types;
mod validator;

pub use error::{SchemaError, ValidationError, ValidationErrors};
pub use sanitize::{Sanitizer, SanitizerBuilder};
pub use validator::{Validator, ValidatorBuilder};

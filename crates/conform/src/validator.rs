//! The validation facade: compile once, validate many times.

use std::sync::{Arc, LazyLock};

use serde_json::Value;

use crate::context::Context;
use crate::engine;
use crate::error::{SchemaError, ValidationError, ValidationErrors};
use crate::message::{MessageRenderer, TemplateRenderer};
use crate::path::SchemaPath;
use crate::probe::{FormatProbe, PathProbe, Probes};
use crate::rule::{ContextKind, RuleRegistry};
use crate::schema::{Schema, SchemaCompiler};
use crate::types::TypeRegistry;

static VALIDATION_RULES: LazyLock<Arc<RuleRegistry>> =
    LazyLock::new(|| Arc::new(RuleRegistry::validation()));

/// A compiled validation schema plus its collaborators.
///
/// [`validate`](Self::validate) keeps the errors of the last run for
/// [`errors`](Self::errors). [`check`](Self::check) is the stateless form
/// for sharing one validator between threads.
///
/// ```rust,ignore
/// let mut validator = Validator::new(&json!({
///     "type": "map",
///     "schema": {"name": {"type": "string", "minlength": 3}}
/// }))?;
///
/// assert!(!validator.validate(&json!({"name": "al"})));
/// assert_eq!(validator.errors()[0].rule, "minlength");
/// ```
#[derive(Clone)]
pub struct Validator {
    schema: Arc<Schema>,
    renderer: Arc<dyn MessageRenderer>,
    probes: Probes,
    errors: ValidationErrors,
}

impl Validator {
    /// Compiles `raw` with the built-in rules and no custom types.
    pub fn new(raw: &Value) -> Result<Self, SchemaError> {
        Self::builder().build(raw)
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    /// Validates `data`, replacing the errors of any previous run.
    ///
    /// Returns true iff no errors were found.
    pub fn validate(&mut self, data: &Value) -> bool {
        self.errors = self.run(data);
        self.errors.is_empty()
    }

    /// Errors of the last [`validate`](Self::validate) call, in document order.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        self.errors.errors()
    }

    /// Takes the errors of the last run, leaving none behind.
    pub fn take_errors(&mut self) -> ValidationErrors {
        std::mem::take(&mut self.errors)
    }

    /// Validates `data` without touching stored state.
    pub fn check(&self, data: &Value) -> Result<(), ValidationErrors> {
        self.run(data).into_result(())
    }

    /// The compiled schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn run(&self, data: &Value) -> ValidationErrors {
        let mut ctx = Context::new(self.renderer.as_ref(), &self.probes);
        engine::validate(&self.schema, data, &mut ctx);
        ctx.into_errors()
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("schema", &self.schema)
            .field("probes", &self.probes)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Configures a [`Validator`].
#[derive(Clone)]
pub struct ValidatorBuilder {
    rules: Option<Arc<RuleRegistry>>,
    types: TypeRegistry,
    renderer: Arc<dyn MessageRenderer>,
    probes: Probes,
}

impl Default for ValidatorBuilder {
    fn default() -> Self {
        Self {
            rules: None,
            types: TypeRegistry::new(),
            renderer: Arc::new(TemplateRenderer),
            probes: Probes::default(),
        }
    }
}

impl ValidatorBuilder {
    /// Custom types visible to the schema.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    /// Replaces the built-in validation rules, e.g. with a registry that
    /// carries extra rules.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_registry(mut self, rules: Arc<RuleRegistry>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Replaces the `{token}` message renderer.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_renderer(mut self, renderer: impl MessageRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Replaces the filesystem probe behind `file` / `directory`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_path_probe(mut self, probe: impl PathProbe + 'static) -> Self {
        self.probes.paths = Arc::new(probe);
        self
    }

    /// Replaces the format probe behind `email` / `url`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_format_probe(mut self, probe: impl FormatProbe + 'static) -> Self {
        self.probes.formats = Arc::new(probe);
        self
    }

    /// Compiles `raw`.
    pub fn build(self, raw: &Value) -> Result<Validator, SchemaError> {
        let rules = self
            .rules
            .unwrap_or_else(|| Arc::clone(&VALIDATION_RULES));
        if rules.context() != ContextKind::Validation {
            return Err(SchemaError::invalid_schema(
                &SchemaPath::root(),
                "a validator needs a validation rule registry",
            ));
        }
        let schema = SchemaCompiler::new(&rules, &self.types).compile(raw)?;
        Ok(Validator {
            schema: Arc::new(schema),
            renderer: self.renderer,
            probes: self.probes,
            errors: ValidationErrors::new(),
        })
    }
}

impl std::fmt::Debug for ValidatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorBuilder")
            .field("rules", &self.rules.as_ref().map(|rules| rules.len()))
            .field("types", &self.types.len())
            .finish_non_exhaustive()
    }
}

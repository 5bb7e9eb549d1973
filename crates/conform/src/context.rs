//! Per-run validation state.
//!
//! A [`Context`] lives for exactly one validation run. It owns the path
//! stack and the error accumulator and borrows the collaborators, so the
//! compiled schema stays read-only and concurrent runs never share state.

use serde_json::Value;

use crate::error::{ValidationError, ValidationErrors};
use crate::message::{MessageRenderer, Substitution, Substitutions};
use crate::path::{Path, Segment};
use crate::probe::Probes;
use crate::rule::RuleInstance;

/// Mutable state threaded through one validation walk.
pub struct Context<'r> {
    renderer: &'r dyn MessageRenderer,
    probes: &'r Probes,
    path: Path,
    errors: ValidationErrors,
}

impl<'r> Context<'r> {
    /// Creates a fresh context positioned at the document root.
    #[must_use]
    pub fn new(renderer: &'r dyn MessageRenderer, probes: &'r Probes) -> Self {
        Self {
            renderer,
            probes,
            path: Path::root(),
            errors: ValidationErrors::new(),
        }
    }

    /// Descends into a child. Must be paired with [`pop`](Self::pop).
    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.path.push(segment.into());
    }

    /// Returns from a child.
    pub fn pop(&mut self) {
        self.path.pop();
    }

    /// Current location in the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collaborators for value checks.
    #[must_use]
    pub fn probes(&self) -> &Probes {
        self.probes
    }

    /// Errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Number of errors recorded so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Records a failure of `rule` at the current path.
    ///
    /// `{field}` and `{value}` are filled in unless the rule already set them.
    pub fn report(&mut self, rule: &RuleInstance, value: Option<&Value>, substitutions: Substitutions) {
        self.report_raw(rule.id(), rule.template(), value, substitutions);
    }

    /// Records a failure for a rule that has no instance on the node.
    pub(crate) fn report_raw(
        &mut self,
        rule: &str,
        template: &str,
        value: Option<&Value>,
        mut substitutions: Substitutions,
    ) {
        substitutions.insert_default("field", self.path.last().to_string());
        if let Some(value) = value {
            substitutions.insert_default("value", Substitution::value(value));
        }
        let message = self
            .renderer
            .render(&self.path, rule, template, &substitutions);

        tracing::trace!(path = %self.path, rule, "rule failed");
        self.errors
            .add(ValidationError::new(self.path.clone(), rule.to_owned(), message));
    }

    /// Ends the run and hands back the collected errors.
    #[must_use]
    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("path", &self.path)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TemplateRenderer;
    use crate::rule::RuleRegistry;
    use crate::schema::SchemaCompiler;
    use crate::types::TypeRegistry;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn path_stack_mirrors_push_and_pop() {
        let probes = Probes::default();
        let mut ctx = Context::new(&TemplateRenderer, &probes);
        ctx.push("user");
        ctx.push(2usize);
        assert_eq!(ctx.path().to_string(), "/user/2");
        ctx.pop();
        ctx.pop();
        ctx.pop();
        assert!(ctx.path().is_root());
    }

    #[test]
    fn reports_fill_field_and_value() {
        let rules = RuleRegistry::validation();
        let schema = SchemaCompiler::new(&rules, &TypeRegistry::new())
            .compile(&json!({"type": "string", "minlength": {"value": 5, "message": "{field}={value} ({length}<{minlength})"}}))
            .unwrap();
        let rule = schema.root().rule("minlength").unwrap();

        let probes = Probes::default();
        let mut ctx = Context::new(&TemplateRenderer, &probes);
        ctx.push("name");
        ctx.report(
            rule,
            Some(&json!("abc")),
            Substitutions::new().with("minlength", "5").with("length", "3"),
        );

        let errors = ctx.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].message, "name=abc (3<5)");
        assert_eq!(errors.errors()[0].rule, "minlength");
        assert_eq!(errors.errors()[0].path, Path::from_segments(["name"]));
    }
}

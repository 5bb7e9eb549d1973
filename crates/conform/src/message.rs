//! Message templates and rendering.
//!
//! Rules hand the engine a template (their default, or the schema's
//! `message` override) plus a set of [`Substitutions`]. A [`MessageRenderer`]
//! turns the two into the final text. [`TemplateRenderer`] replaces
//! `{name}` tokens and leaves unknown tokens untouched.

use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

use crate::path::Path;

/// A value substituted into a `{token}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitution {
    /// Inserted verbatim.
    Text(String),
    /// Inserted as a comma-joined listing: `"small", "medium"`.
    List(Vec<String>),
}

impl Substitution {
    /// Renders a JSON value: strings verbatim, everything else as compact JSON.
    #[must_use]
    pub fn value(value: &Value) -> Self {
        match value {
            Value::String(s) => Substitution::Text(s.clone()),
            other => Substitution::Text(other.to_string()),
        }
    }

    /// Renders a list of JSON values, each as JSON (strings keep their quotes).
    #[must_use]
    pub fn values(values: &[Value]) -> Self {
        Substitution::List(values.iter().map(Value::to_string).collect())
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Substitution::Text(text) => f.write_str(text),
            Substitution::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<String> for Substitution {
    fn from(text: String) -> Self {
        Substitution::Text(text)
    }
}

impl From<&str> for Substitution {
    fn from(text: &str) -> Self {
        Substitution::Text(text.to_owned())
    }
}

/// Ordered `{token}` → value pairs for one message.
///
/// Typically 1-3 entries, so a vector beats a map here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    entries: Vec<(Cow<'static, str>, Substitution)>,
}

impl Substitutions {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a substitution. A later entry with the same name wins.
    #[must_use = "builder methods must be chained or built"]
    pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Substitution>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds a substitution in place.
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Substitution>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Adds a substitution only if `name` is not set yet.
    pub(crate) fn insert_default(&mut self, name: &'static str, value: impl Into<Substitution>) {
        if self.get(name).is_none() {
            self.entries.push((Cow::Borrowed(name), value.into()));
        }
    }

    /// Looks up a substitution by token name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Substitution> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no substitutions are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// RENDERER
// ============================================================================

/// Turns a message template into the final error message.
pub trait MessageRenderer: Send + Sync {
    /// Renders `template` for a failure of `rule` at `path`.
    fn render(
        &self,
        path: &Path,
        rule: &str,
        template: &str,
        substitutions: &Substitutions,
    ) -> String;
}

/// `{token}` substitution. Unknown tokens and unbalanced braces are copied
/// through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl MessageRenderer for TemplateRenderer {
    fn render(
        &self,
        _path: &Path,
        _rule: &str,
        template: &str,
        substitutions: &Substitutions,
    ) -> String {
        let mut out = String::with_capacity(template.len() + 16);
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let token_end = after.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'));
            match token_end {
                Some(end) if end > 0 && after[end..].starts_with('}') => {
                    let token = &after[..end];
                    match substitutions.get(token) {
                        Some(value) => out.push_str(&value.to_string()),
                        None => {
                            out.push('{');
                            out.push_str(token);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

//! Document paths (where a validation error occurred) and schema paths
//! (where a schema definition is malformed).

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ============================================================================
// DOCUMENT PATH
// ============================================================================

/// One step into a document: a map key or a list/tuple position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// A map key. The root marker is the empty key.
    Field(String),
    /// A list or tuple index.
    Index(usize),
}

impl Segment {
    /// The root marker, always the first segment of a [`Path`].
    #[must_use]
    pub fn root() -> Self {
        Segment::Field(String::new())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => f.write_str(name),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Segment::Field(name.to_owned())
    }
}

impl From<String> for Segment {
    fn from(name: String) -> Self {
        Segment::Field(name)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// Location of a node inside a validated document.
///
/// The first segment is always the empty root marker, so the path of the
/// `name` field of the root map is `["", "name"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    segments: SmallVec<[Segment; 6]>,
}

impl Path {
    /// The root path: a single empty segment.
    #[must_use]
    pub fn root() -> Self {
        let mut segments = SmallVec::new();
        segments.push(Segment::root());
        Self { segments }
    }

    /// Builds a path below the root from the given segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        let mut path = Self::root();
        path.segments.extend(segments.into_iter().map(Into::into));
        path
    }

    pub(crate) fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Removes the deepest segment. The root marker is never removed.
    pub(crate) fn pop(&mut self) -> Option<Segment> {
        if self.segments.len() > 1 {
            self.segments.pop()
        } else {
            None
        }
    }

    /// All segments, root marker first.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The deepest segment (the root marker for the root path).
    #[must_use]
    pub fn last(&self) -> &Segment {
        // `root()` guarantees at least one segment and `pop` never removes it
        &self.segments[self.segments.len() - 1]
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len() - 1
    }

    /// True for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Path {
    /// Renders as a JSON pointer: `/user/tags/0`, or `/` at the root.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for segment in &self.segments[1..] {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

// ============================================================================
// SCHEMA PATH
// ============================================================================

/// Location of a node inside a raw schema definition, used in schema errors.
///
/// Displays as `/schema/name` for the root document and as
/// `#Person/schema/mother` inside a registered custom type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SchemaPath(String);

impl SchemaPath {
    /// The root of the schema passed to the compiler.
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// The root of a registered custom type definition.
    #[must_use]
    pub fn for_type(name: &str) -> Self {
        Self(format!("#{name}"))
    }

    /// A child path one key deeper.
    #[must_use]
    pub fn join(&self, key: impl fmt::Display) -> Self {
        let key = key.to_string().replace('~', "~0").replace('/', "~1");
        Self(format!("{}/{key}", self.0))
    }

    /// The path as written, without the root fallback.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("/")
        } else {
            f.write_str(&self.0)
        }
    }
}

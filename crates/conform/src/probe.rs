//! Opaque single-value predicates the engine delegates to: filesystem
//! existence for `file` / `directory`, syntax checks for `email` / `url`.
//!
//! Both sit behind traits so tests and embedders can substitute their own.

use std::sync::{Arc, LazyLock};

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    ).unwrap()
});

// ============================================================================
// FILESYSTEM
// ============================================================================

/// What a `file` / `directory` rule expects to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// Answers "does this path exist as this kind of entry".
pub trait PathProbe: Send + Sync {
    /// Returns true if `path` exists and is of `kind`.
    fn exists(&self, path: &std::path::Path, kind: EntryKind) -> bool;
}

/// [`PathProbe`] backed by `std::fs` metadata (follows symlinks).
#[derive(Debug, Clone, Copy, Default)]
pub struct StdPathProbe;

impl PathProbe for StdPathProbe {
    fn exists(&self, path: &std::path::Path, kind: EntryKind) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) => match kind {
                EntryKind::File => meta.is_file(),
                EntryKind::Directory => meta.is_dir(),
            },
            Err(_) => false,
        }
    }
}

// ============================================================================
// FORMATS
// ============================================================================

/// Syntactic checks for string formats.
pub trait FormatProbe: Send + Sync {
    /// Returns true if `input` looks like an email address.
    fn is_email(&self, input: &str) -> bool;

    /// Returns true if `input` is an absolute URL with a host.
    fn is_url(&self, input: &str) -> bool;
}

/// Default [`FormatProbe`]: a conservative email regex and the `url` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFormatProbe;

impl FormatProbe for StdFormatProbe {
    fn is_email(&self, input: &str) -> bool {
        EMAIL_REGEX.is_match(input)
    }

    fn is_url(&self, input: &str) -> bool {
        url::Url::parse(input).is_ok_and(|url| url.has_host())
    }
}

/// The collaborators handed to every rule check.
#[derive(Clone)]
pub struct Probes {
    /// Filesystem existence.
    pub paths: Arc<dyn PathProbe>,
    /// String formats.
    pub formats: Arc<dyn FormatProbe>,
}

impl Default for Probes {
    fn default() -> Self {
        Self {
            paths: Arc::new(StdPathProbe),
            formats: Arc::new(StdFormatProbe),
        }
    }
}

impl std::fmt::Debug for Probes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probes")
            .field("paths", &"<dyn PathProbe>")
            .field("formats", &"<dyn FormatProbe>")
            .finish()
    }
}

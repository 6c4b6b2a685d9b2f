//! Diagnostics returned from every flatten/expand call.
//!
//! A call never returns early with a bare error: it returns `Diagnostics`,
//! and callers check [`Diagnostics::has_error`] before trusting the target.

use crate::error::{ErrorKind, FlexError};
use std::fmt;

// ============================================================================
// Paths
// ============================================================================

/// One step of a field-access path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

/// A field-access path such as `Field2.Field1[0].Attr1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn field(&self, name: &str) -> Self {
        self.push(PathSegment::Field(name.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.push(PathSegment::Index(index))
    }

    pub fn key(&self, key: &str) -> Self {
        self.push(PathSegment::Key(key.to_string()))
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

/// Source and target paths advanced in lockstep.
#[derive(Debug, Clone, Default)]
pub(crate) struct Paths {
    pub(crate) source: Path,
    pub(crate) target: Path,
}

impl Paths {
    pub(crate) fn field(&self, source: &str, target: &str) -> Self {
        Self {
            source: self.source.field(source),
            target: self.target.field(target),
        }
    }

    pub(crate) fn index(&self, index: usize) -> Self {
        Self {
            source: self.source.index(index),
            target: self.target.index(index),
        }
    }

    /// Element `source` of the source list lands at `target` in the target list.
    pub(crate) fn indices(&self, source: usize, target: usize) -> Self {
        Self {
            source: self.source.index(source),
            target: self.target.index(target),
        }
    }

    /// Map entry on the source side, list element on the target side.
    pub(crate) fn key_to_index(&self, key: &str, index: usize) -> Self {
        Self {
            source: self.source.key(key),
            target: self.target.index(index),
        }
    }

    /// List element on the source side, map entry on the target side.
    pub(crate) fn index_to_key(&self, index: usize, key: &str) -> Self {
        Self {
            source: self.source.index(index),
            target: self.target.key(key),
        }
    }

    pub(crate) fn source_field(&self, name: &str) -> Self {
        Self {
            source: self.source.field(name),
            target: self.target.clone(),
        }
    }

    pub(crate) fn target_field(&self, name: &str) -> Self {
        Self {
            source: self.source.clone(),
            target: self.target.field(name),
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single leveled event naming the source and target it concerns.
#[derive(Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Present for error diagnostics
    pub error: Option<FlexError>,
    pub source_path: Path,
    pub target_path: Path,
    pub source_type: String,
    pub target_type: String,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(FlexError::kind)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: {}", self.message)?;
        if !self.source_path.is_root() || !self.target_path.is_root() {
            write!(
                f,
                " (source {} {}, target {} {})",
                display_path(&self.source_path),
                self.source_type,
                display_path(&self.target_path),
                self.target_type
            )?;
        } else {
            write!(f, " (source {}, target {})", self.source_type, self.target_type)?;
        }
        Ok(())
    }
}

fn display_path(path: &Path) -> String {
    if path.is_root() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

/// The diagnostics accumulated by one conversion call.
#[derive(Debug, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Append diagnostics from a nested call, e.g. one made by a capability.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok` (possibly holding warnings) when there is no error.
    pub fn into_result(self) -> Result<Self, Self> {
        if self.has_error() {
            Err(self)
        } else {
            Ok(self)
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

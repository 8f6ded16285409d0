//! Core shared types for rejig.
//!
//! This crate is intentionally small and dependency-light: spans, file ids,
//! Java name types, the external type-oracle trait and the cooperative
//! cancellation token used by the longer-running analyses.

mod cancel;
mod names;

use std::fmt;

pub use cancel::{Canceled, CancellationToken};
pub use names::{Name, PackageName, QualifiedName, TypeName};

/// A byte-span into a source string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

/// Identifies one compilation unit within an analysis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }
}

/// Language-level capabilities of the project being refactored.
///
/// Analyses never sniff the toolchain; callers state the source level and the
/// checks gate themselves on it (e.g. varargs parameter types below 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceLevel {
    major: u32,
}

impl SourceLevel {
    pub const JAVA_1_4: SourceLevel = SourceLevel { major: 4 };
    pub const JAVA_5: SourceLevel = SourceLevel { major: 5 };
    pub const JAVA_8: SourceLevel = SourceLevel { major: 8 };

    pub const fn new(major: u32) -> Self {
        Self { major }
    }

    #[must_use]
    pub fn supports_varargs(self) -> bool {
        self.major >= 5
    }

    #[must_use]
    pub fn supports_generics(self) -> bool {
        self.major >= 5
    }
}

/// Oracle over the types visible to the project under refactoring.
///
/// Implemented by the built-in standard-library index (`rejig-jdk`) and by
/// host-provided project indexes. All queries are by name; subtype questions
/// go through `rejig_types::TypeEnv` instead.
pub trait TypeIndex {
    /// Resolve a fully-qualified (dotted) name to a known type.
    fn resolve_type(&self, name: &QualifiedName) -> Option<TypeName>;

    /// Resolve a simple name against a single package.
    fn resolve_type_in_package(&self, package: &PackageName, name: &Name) -> Option<TypeName>;

    /// Whether the package exists at all (used to validate star imports).
    fn package_exists(&self, package: &PackageName) -> bool;

    /// All visible types sharing a simple name, in deterministic order.
    ///
    /// This backs the checker's qualification fallback: when a simple name
    /// fails to resolve in scope, every candidate with that name is
    /// considered and zero/one/many decides the per-slot outcome.
    fn types_with_simple_name(&self, name: &Name) -> Vec<TypeName>;
}

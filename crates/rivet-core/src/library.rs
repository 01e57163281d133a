//! Library identities, descriptions, and dependency edges: the node and
//! edge types of the dependency graph.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use crate::version::{Version, VersionRange};

/// A named, versioned library. Name comparison is case-insensitive.
#[derive(Debug, Clone)]
pub struct LibraryIdentity {
    pub name: String,
    pub version: Version,
}

impl LibraryIdentity {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Case-folded name, used as the identity key everywhere a library is
    /// looked up by name.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

impl PartialEq for LibraryIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.version == other.version
    }
}

impl Eq for LibraryIdentity {}

impl Hash for LibraryIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Which provider family a library description came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryKind {
    Project,
    Package,
    PlatformAssembly,
    Unresolved,
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LibraryKind::Project => "project",
            LibraryKind::Package => "package",
            LibraryKind::PlatformAssembly => "platform",
            LibraryKind::Unresolved => "unresolved",
        };
        f.write_str(s)
    }
}

/// A single declared dependency edge: a name plus an optional version
/// constraint. `None` means unconstrained.
#[derive(Debug, Clone)]
pub struct DependencySpec {
    pub name: String,
    pub range: Option<VersionRange>,
}

impl DependencySpec {
    pub fn new(name: impl Into<String>, range: Option<VersionRange>) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{} {}", self.name, range),
            None => f.write_str(&self.name),
        }
    }
}

/// Everything a provider knows about one library: its identity, where it
/// came from, its declared dependencies in declaration order, and (where
/// known) its location on disk.
///
/// Immutable once returned by a provider.
#[derive(Debug, Clone)]
pub struct LibraryDescription {
    pub identity: LibraryIdentity,
    pub kind: LibraryKind,
    pub dependencies: Vec<DependencySpec>,
    pub resolved_path: Option<PathBuf>,
}

impl LibraryDescription {
    pub fn new(identity: LibraryIdentity, kind: LibraryKind) -> Self {
        Self {
            identity,
            kind,
            dependencies: Vec::new(),
            resolved_path: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<DependencySpec>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_resolved_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resolved_path = Some(path.into());
        self
    }
}

/// The framework a resolution or build targets, e.g. `rivet-1.0` or
/// `portable-0.9`. An opaque, case-sensitive tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetFramework(String);

impl TargetFramework {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetFramework {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

//! Project manifest (`rivet.toml`) parsing.
//!
//! The manifest schema is deliberately minimal: package identity plus a
//! dependency table. Richer manifest formats are the concern of outer
//! tooling; the resolver only needs names and version constraints.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rivet_util::errors::RivetError;

use crate::library::{DependencySpec, LibraryIdentity};
use crate::version::{Version, VersionRange};

/// The parsed representation of a `rivet.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub package: PackageMetadata,

    /// Dependency table: name -> version constraint. A bare version is an
    /// exact constraint; interval syntax (`[1.0,2.0)`) is accepted.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// Package identity from the `[package]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectManifest {
    /// Parse manifest text.
    pub fn parse_toml(text: &str) -> Result<Self, RivetError> {
        toml::from_str(text).map_err(|e| RivetError::Manifest {
            message: e.to_string(),
        })
    }

    /// Load and parse a manifest file.
    pub fn from_path(path: &Path) -> Result<Self, RivetError> {
        let text = std::fs::read_to_string(path).map_err(|e| RivetError::Manifest {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::parse_toml(&text)
    }

    /// The package identity with its version parsed.
    pub fn identity(&self) -> Result<LibraryIdentity, RivetError> {
        let version: Version = self.package.version.parse()?;
        Ok(LibraryIdentity::new(self.package.name.clone(), version))
    }

    /// Dependency edges with their constraints parsed, in table order.
    pub fn dependency_specs(&self) -> Result<Vec<DependencySpec>, RivetError> {
        self.dependencies
            .iter()
            .map(|(name, constraint)| {
                let range = VersionRange::parse(constraint)?;
                Ok(DependencySpec::new(name.clone(), Some(range)))
            })
            .collect()
    }
}

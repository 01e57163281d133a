//! Dependency providers: pluggable sources of library descriptions.
//!
//! Providers are tried in a fixed, caller-supplied priority order: the
//! first one that answers wins for a given name and constraint. The
//! conventional order is project references, then the package store,
//! then platform assemblies, then the unresolved placeholder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rivet_core::library::{
    LibraryDescription, LibraryIdentity, LibraryKind, TargetFramework,
};
use rivet_core::version::{Version, VersionRange};
use rivet_core::workspace::Workspace;
use rivet_core::MANIFEST_FILE;
use rivet_util::errors::{RivetError, RivetResult};

/// A polymorphic source of library descriptions.
pub trait DependencyProvider: Send + Sync {
    /// Look up a description for `name` satisfying `range` (`None` means
    /// unconstrained). `Ok(None)` means this provider cannot supply the
    /// library; an error is fatal to the whole resolution request.
    fn get_description(
        &self,
        name: &str,
        range: Option<&VersionRange>,
        target: &TargetFramework,
    ) -> RivetResult<Option<Arc<LibraryDescription>>>;

    /// Called once after the populate pass with the final flattened set,
    /// letting the provider record which identities were selected.
    fn initialize(
        &self,
        resolved: &[Arc<LibraryDescription>],
        target: &TargetFramework,
    ) -> RivetResult<()>;
}

/// Serves descriptions for the projects of a workspace.
pub struct ProjectReferenceProvider {
    projects: HashMap<String, Arc<LibraryDescription>>,
    selected: Mutex<Vec<LibraryIdentity>>,
}

impl ProjectReferenceProvider {
    pub fn new(descriptions: Vec<LibraryDescription>) -> Self {
        let projects = descriptions
            .into_iter()
            .map(|d| (d.identity.key(), Arc::new(d)))
            .collect();
        Self {
            projects,
            selected: Mutex::new(Vec::new()),
        }
    }

    /// Build project descriptions from every member of a workspace.
    pub fn from_workspace(workspace: &Workspace) -> RivetResult<Self> {
        let mut descriptions = Vec::new();
        for project in &workspace.members {
            let description =
                LibraryDescription::new(project.manifest.identity()?, LibraryKind::Project)
                    .with_dependencies(project.manifest.dependency_specs()?)
                    .with_resolved_path(&project.root_dir);
            descriptions.push(description);
        }
        Ok(Self::new(descriptions))
    }

    /// The project identities selected by the last resolution.
    pub fn selected(&self) -> Vec<LibraryIdentity> {
        self.selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DependencyProvider for ProjectReferenceProvider {
    fn get_description(
        &self,
        name: &str,
        range: Option<&VersionRange>,
        _target: &TargetFramework,
    ) -> RivetResult<Option<Arc<LibraryDescription>>> {
        let Some(description) = self.projects.get(&name.to_lowercase()) else {
            return Ok(None);
        };
        match range {
            Some(range) if !range.satisfies(&description.identity.version) => Ok(None),
            _ => Ok(Some(description.clone())),
        }
    }

    fn initialize(
        &self,
        resolved: &[Arc<LibraryDescription>],
        _target: &TargetFramework,
    ) -> RivetResult<()> {
        let mut selected = self
            .selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        selected.clear();
        selected.extend(
            resolved
                .iter()
                .filter(|d| self.projects.contains_key(&d.identity.key()))
                .filter(|d| d.kind == LibraryKind::Project)
                .map(|d| d.identity.clone()),
        );
        Ok(())
    }
}

/// Serves packages from a local store laid out `<root>/<name>/<version>/`,
/// each version directory carrying its own manifest.
pub struct PackageProvider {
    root: PathBuf,
}

impl PackageProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store directory for `name`, matched case-insensitively.
    fn package_dir(&self, name: &str) -> Option<PathBuf> {
        let wanted = name.to_lowercase();
        let entries = std::fs::read_dir(&self.root).ok()?;
        entries
            .flatten()
            .map(|e| e.path())
            .find(|p| {
                p.is_dir()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.to_lowercase() == wanted)
            })
    }

    /// All versions of a package present in the store, with their dirs.
    fn available_versions(&self, package_dir: &Path) -> Vec<(Version, PathBuf)> {
        let Ok(entries) = std::fs::read_dir(package_dir) else {
            return Vec::new();
        };
        let mut versions: Vec<(Version, PathBuf)> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter_map(|p| {
                let parsed = p.file_name()?.to_str()?.parse::<Version>().ok()?;
                Some((parsed, p))
            })
            .collect();
        versions.sort_by(|a, b| a.0.cmp(&b.0));
        versions
    }
}

impl DependencyProvider for PackageProvider {
    fn get_description(
        &self,
        name: &str,
        range: Option<&VersionRange>,
        _target: &TargetFramework,
    ) -> RivetResult<Option<Arc<LibraryDescription>>> {
        let Some(package_dir) = self.package_dir(name) else {
            return Ok(None);
        };

        // Highest version satisfying the constraint wins.
        let best = self
            .available_versions(&package_dir)
            .into_iter()
            .rev()
            .find(|(version, _)| range.map_or(true, |r| r.satisfies(version)));
        let Some((version, version_dir)) = best else {
            return Ok(None);
        };

        let manifest_path = version_dir.join(MANIFEST_FILE);
        let description = if manifest_path.is_file() {
            let manifest = rivet_core::manifest::ProjectManifest::from_path(&manifest_path)
                .map_err(|e| RivetError::Provider {
                    message: format!("package {name}@{version}: {e}"),
                })?;
            LibraryDescription::new(
                LibraryIdentity::new(manifest.package.name.clone(), version),
                LibraryKind::Package,
            )
            .with_dependencies(manifest.dependency_specs().map_err(|e| {
                RivetError::Provider {
                    message: format!("package {name}: {e}"),
                }
            })?)
        } else {
            // A bare payload directory is a leaf package
            LibraryDescription::new(
                LibraryIdentity::new(name.to_string(), version),
                LibraryKind::Package,
            )
        };

        Ok(Some(Arc::new(
            description.with_resolved_path(version_dir),
        )))
    }

    fn initialize(
        &self,
        _resolved: &[Arc<LibraryDescription>],
        _target: &TargetFramework,
    ) -> RivetResult<()> {
        Ok(())
    }
}

/// Serves the platform-supplied assembly set for one target framework.
pub struct PlatformAssemblyProvider {
    target: TargetFramework,
    assemblies: HashMap<String, Arc<LibraryDescription>>,
}

impl PlatformAssemblyProvider {
    pub fn new(
        target: TargetFramework,
        assemblies: impl IntoIterator<Item = (String, Version, PathBuf)>,
    ) -> Self {
        let assemblies = assemblies
            .into_iter()
            .map(|(name, version, path)| {
                let description = LibraryDescription::new(
                    LibraryIdentity::new(name, version),
                    LibraryKind::PlatformAssembly,
                )
                .with_resolved_path(path);
                (description.identity.key(), Arc::new(description))
            })
            .collect();
        Self { target, assemblies }
    }
}

impl DependencyProvider for PlatformAssemblyProvider {
    fn get_description(
        &self,
        name: &str,
        range: Option<&VersionRange>,
        target: &TargetFramework,
    ) -> RivetResult<Option<Arc<LibraryDescription>>> {
        if *target != self.target {
            return Ok(None);
        }
        let Some(description) = self.assemblies.get(&name.to_lowercase()) else {
            return Ok(None);
        };
        match range {
            Some(range) if !range.satisfies(&description.identity.version) => Ok(None),
            _ => Ok(Some(description.clone())),
        }
    }

    fn initialize(
        &self,
        _resolved: &[Arc<LibraryDescription>],
        _target: &TargetFramework,
    ) -> RivetResult<()> {
        Ok(())
    }
}

/// Terminal placeholder: answers every query with an `Unresolved`
/// description so missing libraries stay visible in the graph. Include
/// it last, or not at all to get the silent-drop policy instead.
pub struct UnresolvedProvider;

impl DependencyProvider for UnresolvedProvider {
    fn get_description(
        &self,
        name: &str,
        range: Option<&VersionRange>,
        _target: &TargetFramework,
    ) -> RivetResult<Option<Arc<LibraryDescription>>> {
        // An exact constraint keeps its version; anything else gets zero
        let version = range
            .and_then(|r| r.as_exact())
            .cloned()
            .unwrap_or_default();
        Ok(Some(Arc::new(LibraryDescription::new(
            LibraryIdentity::new(name.to_string(), version),
            LibraryKind::Unresolved,
        ))))
    }

    fn initialize(
        &self,
        _resolved: &[Arc<LibraryDescription>],
        _target: &TargetFramework,
    ) -> RivetResult<()> {
        Ok(())
    }
}

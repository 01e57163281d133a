//! Command dispatch and handler modules.

mod build;
mod resolve;
mod tree;

use std::path::{Path, PathBuf};

use miette::Result;

use rivet_core::library::{LibraryIdentity, TargetFramework};
use rivet_core::workspace::Workspace;
use rivet_core::MANIFEST_FILE;
use rivet_resolver::provider::{
    DependencyProvider, PackageProvider, ProjectReferenceProvider, UnresolvedProvider,
};
use rivet_resolver::ResolvedGraph;
use rivet_util::errors::RivetError;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Resolve {
            dir,
            packages,
            target,
        } => resolve::exec(dir.as_deref(), packages.as_deref(), &target),
        Command::Tree {
            dir,
            packages,
            target,
            depth,
            path,
        } => tree::exec(
            dir.as_deref(),
            packages.as_deref(),
            &target,
            depth,
            path.as_deref(),
        ),
        Command::Build {
            dir,
            packages,
            target,
            config,
        } => build::exec(dir.as_deref(), packages.as_deref(), &target, &config),
    }
}

/// Locate the project root: the given directory, or the nearest ancestor
/// of the current directory carrying a manifest.
fn project_root(dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = dir {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(RivetError::Io)?;
    rivet_util::fs::find_ancestor_with(&cwd, MANIFEST_FILE).ok_or_else(|| {
        RivetError::Manifest {
            message: format!("No {MANIFEST_FILE} found in the current directory or any ancestor"),
        }
        .into()
    })
}

/// Discover the workspace and resolve its root project.
///
/// Provider priority: project references, then the package store (when
/// given), then the unresolved placeholder so missing libraries stay
/// visible in the output.
fn resolve_workspace(
    dir: Option<&Path>,
    packages: Option<&Path>,
    target_name: &str,
) -> Result<(LibraryIdentity, ResolvedGraph)> {
    let root = project_root(dir)?;
    let workspace = Workspace::discover(&root)?;
    let root_project = workspace.root_project().ok_or_else(|| RivetError::Manifest {
        message: format!("No {MANIFEST_FILE} found in {}", root.display()),
    })?;
    let root_identity = root_project.manifest.identity()?;

    let mut providers: Vec<Box<dyn DependencyProvider>> = Vec::new();
    providers.push(Box::new(ProjectReferenceProvider::from_workspace(
        &workspace,
    )?));
    if let Some(store) = packages {
        providers.push(Box::new(PackageProvider::new(store)));
    }
    providers.push(Box::new(UnresolvedProvider));

    let target = TargetFramework::new(target_name);
    let graph = rivet_resolver::resolve(
        &root_identity.name,
        &root_identity.version,
        &target,
        &providers,
    )?;

    Ok((root_identity, graph))
}

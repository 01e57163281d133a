//! Workspace discovery: a root project plus sibling member projects.

use std::path::{Path, PathBuf};

use rivet_util::errors::RivetError;

use crate::manifest::ProjectManifest;
use crate::MANIFEST_FILE;

/// A project on disk: its root directory plus parsed manifest.
#[derive(Debug, Clone)]
pub struct Project {
    pub root_dir: PathBuf,
    pub manifest: ProjectManifest,
}

impl Project {
    /// Load the project rooted at `dir` (which must contain a manifest).
    pub fn load(dir: &Path) -> Result<Self, RivetError> {
        let manifest = ProjectManifest::from_path(&dir.join(MANIFEST_FILE))?;
        Ok(Self {
            root_dir: dir.to_path_buf(),
            manifest,
        })
    }
}

/// A workspace: the root project and every member project found next to it.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root_dir: PathBuf,
    pub members: Vec<Project>,
}

impl Workspace {
    /// Discover projects under `root`: the root itself (if it carries a
    /// manifest) and every immediate subdirectory that does.
    pub fn discover(root: &Path) -> Result<Self, RivetError> {
        let mut members = Vec::new();

        if root.join(MANIFEST_FILE).is_file() {
            members.push(Project::load(root)?);
        }

        let mut subdirs: Vec<PathBuf> = std::fs::read_dir(root)
            .map_err(RivetError::Io)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir() && p.join(MANIFEST_FILE).is_file())
            .collect();
        subdirs.sort();

        for dir in subdirs {
            members.push(Project::load(&dir)?);
        }

        Ok(Self {
            root_dir: root.to_path_buf(),
            members,
        })
    }

    /// The project whose directory is the workspace root, if any.
    pub fn root_project(&self) -> Option<&Project> {
        self.members.iter().find(|p| p.root_dir == self.root_dir)
    }

    /// Find a member by package name, case-insensitive.
    pub fn member(&self, name: &str) -> Option<&Project> {
        self.members
            .iter()
            .find(|p| p.manifest.package.name.eq_ignore_ascii_case(name))
    }
}

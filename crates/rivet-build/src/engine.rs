//! Memoized compile and export computations.
//!
//! `export` reads `compile` through the cache, so an export entry
//! transitively depends on every source-file timestamp the compile
//! entry declared. Touching a source (or firing the project's named
//! trigger) invalidates both on next access.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rivet_cache::{Cache, FileWriteTimeDependency, NamedTriggerRegistry};
use rivet_core::library::{LibraryDescription, TargetFramework};
use rivet_util::errors::{RivetError, RivetResult};

use crate::fingerprint::{self, Fingerprint};

/// File extension of toolchain source files.
pub const SOURCE_EXTENSION: &str = "rv";

/// Cache key for one build computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildKey {
    /// Case-folded library name.
    pub library: String,
    pub target: TargetFramework,
    pub configuration: String,
}

impl BuildKey {
    fn new(library: &LibraryDescription, target: &TargetFramework, configuration: &str) -> Self {
        Self {
            library: library.identity.key(),
            target: target.clone(),
            configuration: configuration.to_string(),
        }
    }
}

/// Output of the compile step for one library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    pub fingerprint: Fingerprint,
    pub sources: Vec<PathBuf>,
}

/// Output of the export step: what downstream consumers link against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub fingerprint: Fingerprint,
    pub source_count: usize,
}

/// How many factories actually ran, as opposed to being served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub compilations: usize,
    pub exports: usize,
}

/// The memoizing build layer over resolved libraries.
pub struct BuildEngine {
    compilations: Cache<BuildKey, Arc<CompiledUnit>>,
    exports: Cache<BuildKey, Arc<ExportArtifact>>,
    triggers: Arc<NamedTriggerRegistry>,
    compile_runs: AtomicUsize,
    export_runs: AtomicUsize,
}

impl Default for BuildEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildEngine {
    pub fn new() -> Self {
        Self::with_triggers(Arc::new(NamedTriggerRegistry::new()))
    }

    /// Share a trigger registry with the file-watch collaborator.
    pub fn with_triggers(triggers: Arc<NamedTriggerRegistry>) -> Self {
        Self {
            compilations: Cache::new(),
            exports: Cache::new(),
            triggers,
            compile_runs: AtomicUsize::new(0),
            export_runs: AtomicUsize::new(0),
        }
    }

    pub fn triggers(&self) -> &NamedTriggerRegistry {
        &self.triggers
    }

    pub fn stats(&self) -> BuildStats {
        BuildStats {
            compilations: self.compile_runs.load(Ordering::SeqCst),
            exports: self.export_runs.load(Ordering::SeqCst),
        }
    }

    /// Compile a library's sources, or reuse the cached unit if nothing
    /// it depends on has changed.
    pub fn compile(
        &self,
        library: &LibraryDescription,
        target: &TargetFramework,
        configuration: &str,
    ) -> RivetResult<Arc<CompiledUnit>> {
        let key = BuildKey::new(library, target, configuration);
        let trigger_name = format!("project:{}", library.identity.key());

        self.compilations.get(key, |ctx| {
            self.compile_runs.fetch_add(1, Ordering::SeqCst);

            let root = library.resolved_path.as_ref().ok_or_else(|| {
                RivetError::Cache {
                    message: format!("library {} has no resolved path", library.identity),
                }
            })?;
            let sources =
                rivet_util::fs::files_with_extension(&root.join("src"), SOURCE_EXTENSION);

            for source in &sources {
                ctx.add_dependency(Arc::new(FileWriteTimeDependency::new(source)));
            }
            // a watcher signal for the whole project also invalidates
            ctx.add_dependency(self.triggers.dependency(&trigger_name));

            let fingerprint =
                fingerprint::compute(&library.identity, target, configuration, &sources)?;
            tracing::debug!(
                library = %library.identity,
                sources = sources.len(),
                "compiled"
            );
            Ok(Arc::new(CompiledUnit {
                fingerprint,
                sources,
            }))
        })
    }

    /// Derive a library's export artifact, compiling first if needed.
    pub fn export(
        &self,
        library: &LibraryDescription,
        target: &TargetFramework,
        configuration: &str,
    ) -> RivetResult<Arc<ExportArtifact>> {
        let key = BuildKey::new(library, target, configuration);

        self.exports.get(key, |_ctx| {
            self.export_runs.fetch_add(1, Ordering::SeqCst);
            // nested cache read: the compile entry's dependencies become ours
            let compiled = self.compile(library, target, configuration)?;
            Ok(Arc::new(ExportArtifact {
                fingerprint: compiled.fingerprint.clone(),
                source_count: compiled.sources.len(),
            }))
        })
    }
}

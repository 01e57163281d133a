//! Handler for `rivet build`.

use std::path::Path;

use miette::Result;

use rivet_build::BuildEngine;
use rivet_core::library::{LibraryKind, TargetFramework};

/// Export the root project and every resolved project reference through
/// the memoizing build layer.
pub fn exec(dir: Option<&Path>, packages: Option<&Path>, target: &str, config: &str) -> Result<()> {
    let (root_identity, graph) = super::resolve_workspace(dir, packages, target)?;
    let target = TargetFramework::new(target);
    let engine = BuildEngine::new();

    let mut exported = 0usize;
    for library in graph.all_libraries() {
        if library.kind != LibraryKind::Project {
            continue;
        }
        let artifact = engine.export(library, &target, config)?;
        println!(
            "  {} [{config}] {} sources, fingerprint {}",
            library.identity,
            artifact.source_count,
            &artifact.fingerprint.hash[..12]
        );
        exported += 1;
    }

    let stats = engine.stats();
    println!(
        "Built {root_identity}: {exported} libraries exported, {} compiled",
        stats.compilations
    );
    Ok(())
}

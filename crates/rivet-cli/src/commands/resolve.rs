//! Handler for `rivet resolve`.

use std::path::Path;

use miette::Result;

/// Resolve the workspace and print the flattened library set.
pub fn exec(dir: Option<&Path>, packages: Option<&Path>, target: &str) -> Result<()> {
    let (root_identity, graph) = super::resolve_workspace(dir, packages, target)?;

    println!("Resolved {} libraries for {root_identity}:", graph.len());
    for library in graph.libraries() {
        match &library.resolved_path {
            Some(path) => println!(
                "  {} ({}) {}",
                library.identity,
                library.kind,
                path.display()
            ),
            None => println!("  {} ({})", library.identity, library.kind),
        }
    }

    if !graph.conflicts.is_empty() {
        println!();
        print!("{}", graph.conflicts);
    }

    Ok(())
}

//! Handler for `rivet tree`.

use std::path::Path;

use miette::Result;

use rivet_util::errors::RivetError;

/// Print the resolved dependency tree, or the root-to-library path when
/// `path` is given.
pub fn exec(
    dir: Option<&Path>,
    packages: Option<&Path>,
    target: &str,
    depth: Option<usize>,
    path: Option<&str>,
) -> Result<()> {
    let (_, graph) = super::resolve_workspace(dir, packages, target)?;

    if let Some(name) = path {
        let chain = graph.find_path(name).ok_or_else(|| RivetError::Resolution {
            message: format!("{name} is not part of the resolved graph"),
        })?;
        let rendered: Vec<String> = chain.iter().map(|node| node.to_string()).collect();
        println!("{}", rendered.join(" -> "));
        return Ok(());
    }

    print!("{}", graph.print_tree(depth));
    Ok(())
}

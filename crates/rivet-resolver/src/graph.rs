//! The flattened dependency graph produced by resolution.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use rivet_core::library::{LibraryDescription, LibraryIdentity, LibraryKind};

use crate::conflict::ConflictReport;

/// A node in the resolved dependency graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedNode {
    pub identity: LibraryIdentity,
    pub kind: LibraryKind,
    pub resolved_path: Option<PathBuf>,
}

impl ResolvedNode {
    pub fn from_description(description: &LibraryDescription) -> Self {
        Self {
            identity: description.identity.clone(),
            kind: description.kind,
            resolved_path: description.resolved_path.clone(),
        }
    }

    /// Case-folded library name, the graph's lookup key.
    pub fn key(&self) -> String {
        self.identity.key()
    }
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity)?;
        if self.kind == LibraryKind::Unresolved {
            write!(f, " (unresolved)")?;
        }
        Ok(())
    }
}

/// One authoritative description per library name, plus the retained
/// dependency edges, backed by petgraph.
pub struct ResolvedGraph {
    graph: DiGraph<ResolvedNode, ()>,
    /// Lookup from case-folded name to node index.
    index: HashMap<String, NodeIndex>,
    root: Option<NodeIndex>,
    /// Winning description per case-folded name (including the root's).
    descriptions: HashMap<String, Arc<LibraryDescription>>,
    pub conflicts: ConflictReport,
}

impl ResolvedGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            root: None,
            descriptions: HashMap::new(),
            conflicts: ConflictReport::new(),
        }
    }

    /// Add a library to the graph. If the name already exists, returns
    /// the existing index.
    pub fn add_library(&mut self, description: Arc<LibraryDescription>) -> NodeIndex {
        let key = description.identity.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(ResolvedNode::from_description(&description));
        self.index.insert(key.clone(), idx);
        self.descriptions.insert(key, description);
        idx
    }

    /// Mark the root library (the resolution request's subject).
    pub fn set_root(&mut self, idx: NodeIndex) {
        self.root = Some(idx);
    }

    pub fn root(&self) -> Option<&ResolvedNode> {
        self.root.map(|idx| &self.graph[idx])
    }

    /// Add a retained dependency edge. Duplicate edges are ignored.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Look up a library by name, case-insensitive.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(&name.to_lowercase()).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &ResolvedNode {
        &self.graph[idx]
    }

    /// The winning description for a name, case-insensitive.
    pub fn library(&self, name: &str) -> Option<&Arc<LibraryDescription>> {
        self.descriptions.get(&name.to_lowercase())
    }

    /// Every winning description including the root's, sorted by name.
    pub fn all_libraries(&self) -> Vec<&Arc<LibraryDescription>> {
        let mut libraries: Vec<_> = self.descriptions.values().collect();
        libraries.sort_by_key(|d| d.identity.key());
        libraries
    }

    /// All winning descriptions except the root's, sorted by name.
    pub fn libraries(&self) -> Vec<&Arc<LibraryDescription>> {
        let root_key = self.root().map(|n| n.key());
        let mut libraries: Vec<_> = self
            .descriptions
            .values()
            .filter(|d| Some(d.identity.key()) != root_key)
            .collect();
        libraries.sort_by_key(|d| d.identity.key());
        libraries
    }

    /// Direct dependencies of a node, in retained-edge order.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut deps: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        // petgraph iterates edges most-recent-first; restore insertion order
        deps.reverse();
        deps
    }

    /// Number of resolved libraries (excluding the root).
    pub fn len(&self) -> usize {
        let total = self.graph.node_count();
        if self.root.is_some() {
            total.saturating_sub(1)
        } else {
            total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the dependency tree, optionally capped at `max_depth`.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let root = match self.root {
            Some(r) => r,
            None => return output,
        };

        output.push_str(&format!("{}\n", self.graph[root]));

        let mut visited = HashSet::new();
        visited.insert(root);

        let deps = self.dependencies_of(root);
        let count = deps.len();
        for (i, idx) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(&mut output, *idx, "", is_last, 1, max_depth, &mut visited);
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.graph[idx]));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, child) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                *child,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Find the path from the root to a library, by name.
    pub fn find_path(&self, name: &str) -> Option<Vec<&ResolvedNode>> {
        let root = self.root?;
        let target = self.find(name)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for child in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        visited.remove(&current);
        false
    }
}

impl Default for ResolvedGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_core::library::LibraryIdentity;

    fn desc(name: &str, version: &str) -> Arc<LibraryDescription> {
        Arc::new(LibraryDescription::new(
            LibraryIdentity::new(name, version.parse().unwrap()),
            LibraryKind::Package,
        ))
    }

    #[test]
    fn add_and_find() {
        let mut g = ResolvedGraph::new();
        let idx = g.add_library(desc("Lib", "1.0.0"));
        assert_eq!(g.find("lib"), Some(idx));
        assert_eq!(g.node(idx).identity.version, "1.0".parse().unwrap());
        assert!(g.library("LIB").is_some());
    }

    #[test]
    fn duplicate_add_returns_same_index() {
        let mut g = ResolvedGraph::new();
        let idx1 = g.add_library(desc("lib", "1.0.0"));
        let idx2 = g.add_library(desc("lib", "1.0.0"));
        assert_eq!(idx1, idx2);
    }

    #[test]
    fn libraries_excludes_root() {
        let mut g = ResolvedGraph::new();
        let root = g.add_library(desc("app", "1.0.0"));
        g.set_root(root);
        g.add_library(desc("lib", "2.0.0"));

        assert_eq!(g.len(), 1);
        let libs = g.libraries();
        assert_eq!(libs.len(), 1);
        assert_eq!(libs[0].identity.name, "lib");
    }

    #[test]
    fn tree_printing() {
        let mut g = ResolvedGraph::new();
        let root = g.add_library(desc("app", "1.0.0"));
        g.set_root(root);
        let a = g.add_library(desc("a", "1.0.0"));
        let b = g.add_library(desc("b", "2.0.0"));
        let c = g.add_library(desc("c", "3.0.0"));
        g.add_edge(root, a);
        g.add_edge(root, b);
        g.add_edge(a, c);

        let tree = g.print_tree(None);
        assert!(tree.contains("app@1.0.0"));
        assert!(tree.contains("├── a@1.0.0"));
        assert!(tree.contains("│   └── c@3.0.0"));
        assert!(tree.contains("└── b@2.0.0"));
    }

    #[test]
    fn tree_printing_cuts_cycles() {
        let mut g = ResolvedGraph::new();
        let root = g.add_library(desc("app", "1.0.0"));
        g.set_root(root);
        let a = g.add_library(desc("a", "1.0.0"));
        let b = g.add_library(desc("b", "1.0.0"));
        g.add_edge(root, a);
        g.add_edge(a, b);
        g.add_edge(b, a);

        let tree = g.print_tree(None);
        // a appears under root and once more under b, then the walk stops
        assert_eq!(tree.matches("a@1.0.0").count(), 2);
    }

    #[test]
    fn unresolved_marker_in_display() {
        let node = ResolvedNode {
            identity: LibraryIdentity::new("ghost", "0.0.0".parse().unwrap()),
            kind: LibraryKind::Unresolved,
            resolved_path: None,
        };
        assert_eq!(node.to_string(), "ghost@0.0.0 (unresolved)");
    }

    #[test]
    fn find_path_exists() {
        let mut g = ResolvedGraph::new();
        let root = g.add_library(desc("app", "1.0.0"));
        g.set_root(root);
        let a = g.add_library(desc("a", "1.0.0"));
        let b = g.add_library(desc("b", "1.0.0"));
        g.add_edge(root, a);
        g.add_edge(a, b);

        let path = g.find_path("b").unwrap();
        let names: Vec<_> = path.iter().map(|n| n.identity.name.as_str()).collect();
        assert_eq!(names, ["app", "a", "b"]);
    }

    #[test]
    fn find_path_not_found() {
        let mut g = ResolvedGraph::new();
        let root = g.add_library(desc("app", "1.0.0"));
        g.set_root(root);
        assert!(g.find_path("missing").is_none());
    }
}

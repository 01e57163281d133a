//! Dependency resolution engine: nearest-wins conflict resolution over a
//! potentially cyclic, multi-version dependency graph, flattened to one
//! authoritative version per library name.
//!
//! Descriptions come from pluggable [`provider::DependencyProvider`]s
//! tried in a fixed priority order (typically: project references, then
//! packages, then platform assemblies, then the unresolved placeholder).

pub mod conflict;
pub mod graph;
pub mod provider;
pub mod walker;

pub use graph::ResolvedGraph;
pub use walker::resolve;

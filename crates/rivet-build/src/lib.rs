//! Cache-backed build layer.
//!
//! Compilation and export are memoized through `rivet-cache`, keyed by
//! (library, target framework, configuration). Each computation declares
//! file-timestamp dependencies on the library's sources plus the
//! project's named trigger, so touching a source or firing the watcher
//! signal invalidates exactly the affected entries on next access.

pub mod engine;
pub mod fingerprint;

pub use engine::{BuildEngine, BuildKey, BuildStats, CompiledUnit, ExportArtifact};
pub use fingerprint::Fingerprint;

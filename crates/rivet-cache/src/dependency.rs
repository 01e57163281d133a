//! Invalidation predicates attached to cache entries.
//!
//! Two standard implementations: a file last-write-time probe, and a
//! named trigger fired by an external signal (typically a file watcher
//! that knows *something* under a root changed without pinpointing what).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;

/// A predicate answering "has the input this cache entry relied on changed?"
pub trait CacheDependency: Send + Sync {
    fn has_changed(&self) -> bool;
}

/// Tracks a single path's last-write time, captured at construction.
///
/// A file that is missing at construction and still missing later counts
/// as unchanged; appearing or disappearing counts as changed.
pub struct FileWriteTimeDependency {
    path: PathBuf,
    captured: Option<SystemTime>,
}

impl FileWriteTimeDependency {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let captured = rivet_util::fs::write_time(&path);
        Self { path, captured }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl CacheDependency for FileWriteTimeDependency {
    fn has_changed(&self) -> bool {
        rivet_util::fs::write_time(&self.path) != self.captured
    }
}

/// A dependency that is inert until its trigger fires, then reports
/// changed forever. Handed out by [`NamedTriggerRegistry`].
pub struct TriggerDependency {
    fired: Arc<AtomicBool>,
}

impl CacheDependency for TriggerDependency {
    fn has_changed(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Registry of named triggers for external change signals.
///
/// Every [`dependency`](Self::dependency) call for a name shares that
/// name's current generation flag. Firing the trigger flips the flag and
/// retires the generation: the next `dependency` call under the same
/// name starts fresh.
#[derive(Default)]
pub struct NamedTriggerRegistry {
    live: DashMap<String, Arc<AtomicBool>>,
}

impl NamedTriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dependency tied to the current generation of `name`.
    pub fn dependency(&self, name: &str) -> Arc<TriggerDependency> {
        let fired = self
            .live
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone();
        Arc::new(TriggerDependency { fired })
    }

    /// Fire the named trigger. A no-op if no dependency was ever handed
    /// out under `name` (or its generation already fired).
    pub fn trigger(&self, name: &str) {
        if let Some((_, fired)) = self.live.remove(name) {
            tracing::debug!(trigger = name, "cache trigger fired");
            fired.store(true, Ordering::Release);
        }
    }
}

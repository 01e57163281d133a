//! Memoizing cache with dependency-tracked invalidation.
//!
//! Build steps store expensive derived values here keyed by arbitrary
//! hashable keys. Staleness is not time-based: each entry carries the
//! set of [`CacheDependency`] predicates its factory declared, and the
//! entry is recomputed when any of them reports a change.
//!
//! Nested `get` calls propagate their dependencies onto the enclosing
//! computation's context automatically, so an entry that reads another
//! entry transitively depends on everything that entry depends on.

pub mod cache;
pub mod context;
pub mod dependency;

pub use cache::Cache;
pub use context::CacheContext;
pub use dependency::{
    CacheDependency, FileWriteTimeDependency, NamedTriggerRegistry, TriggerDependency,
};

//! The keyed memoizing store.
//!
//! One slot per key; the slot's mutex serializes computation so at most
//! one live result per key is ever observable. Concurrent first-time
//! readers race to insert the slot, then all block on the winner's
//! computation. `get` is synchronous and thread-blocking; a factory must
//! not read its own key (that self-deadlocks), but reads of other keys,
//! on this or any other cache, nest freely.

use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

use rivet_util::errors::RivetResult;

use crate::context::{register_on_active, CacheContext, ContextScope};
use crate::dependency::CacheDependency;

/// A computed value plus the invalidation predicates its factory declared.
struct CacheEntry<V> {
    value: V,
    dependencies: Vec<Arc<dyn CacheDependency>>,
}

impl<V> CacheEntry<V> {
    fn is_stale(&self) -> bool {
        self.dependencies.iter().any(|d| d.has_changed())
    }
}

/// One key's slot. `None` means absent (never computed, or the last
/// factory failed); the mutex is held for the whole computation.
struct Slot<V> {
    entry: Mutex<Option<CacheEntry<V>>>,
}

impl<V> Slot<V> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entry: Mutex::new(None),
        })
    }
}

/// Compute-once, reuse-until-stale storage for keyed values.
///
/// Values are cloned out on every read; use `Arc<T>` values for anything
/// non-trivial.
pub struct Cache<K, V> {
    slots: DashMap<K, Arc<Slot<V>>>,
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Return the cached value for `key`, computing it via `factory` if
    /// absent or stale. The factory receives a [`CacheContext`] on which
    /// it declares what must stay unchanged for the result to stay valid.
    pub fn get<F>(&self, key: K, factory: F) -> RivetResult<V>
    where
        F: FnOnce(&CacheContext) -> RivetResult<V>,
    {
        self.get_or_update(key, |ctx, _previous| factory(ctx))
    }

    /// Like [`get`](Self::get), but on recomputation the factory also
    /// receives the previous (now stale) value, enabling incremental
    /// merge instead of a full rebuild.
    pub fn get_or_update<F>(&self, key: K, factory: F) -> RivetResult<V>
    where
        F: FnOnce(&CacheContext, Option<&V>) -> RivetResult<V>,
    {
        // Insert-if-absent, then drop the shard guard before taking the
        // slot lock so a long factory never blocks unrelated keys.
        let slot = self
            .slots
            .entry(key)
            .or_insert_with(Slot::new)
            .clone();

        let mut entry = lock(&slot.entry);

        if let Some(existing) = entry.as_ref() {
            if !existing.is_stale() {
                register_on_active(&existing.dependencies);
                return Ok(existing.value.clone());
            }
        }

        // Absent or stale: recompute under the slot lock. The previous
        // entry is detached first so a failed factory leaves the key
        // absent, not poisoned.
        let previous = entry.take();

        let scope = ContextScope::push();
        let result = factory(scope.context(), previous.as_ref().map(|e| &e.value));
        let dependencies = scope.context().take_dependencies();
        drop(scope);
        drop(previous);

        let value = result?;
        register_on_active(&dependencies);
        *entry = Some(CacheEntry {
            value: value.clone(),
            dependencies,
        });
        Ok(value)
    }

    /// Number of keys currently holding a computed value.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| lock(&slot.entry).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{FileWriteTimeDependency, NamedTriggerRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};

    fn touch(path: &std::path::Path, offset_secs: u64) {
        let handle = std::fs::OpenOptions::new().write(true).open(path).unwrap();
        handle
            .set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
            .unwrap();
    }

    #[test]
    fn factory_runs_once() {
        let cache: Cache<&str, i32> = Cache::new();
        let runs = AtomicUsize::new(0);

        let first = cache
            .get("k", |_ctx| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            })
            .unwrap();
        let second = cache
            .get("k", |_ctx| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .unwrap();

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn file_change_invalidates() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("input.txt");
        std::fs::write(&file, b"v1").unwrap();

        let cache: Cache<&str, String> = Cache::new();
        let runs = AtomicUsize::new(0);

        let compute = |cache: &Cache<&str, String>| {
            cache
                .get("k", |ctx| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    ctx.add_dependency(Arc::new(FileWriteTimeDependency::new(&file)));
                    Ok(std::fs::read_to_string(&file).unwrap())
                })
                .unwrap()
        };

        assert_eq!(compute(&cache), "v1");
        assert_eq!(compute(&cache), "v1");
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        std::fs::write(&file, b"v2").unwrap();
        touch(&file, 5);

        assert_eq!(compute(&cache), "v2");
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn trigger_invalidates() {
        let registry = NamedTriggerRegistry::new();
        let cache: Cache<&str, i32> = Cache::new();
        let runs = AtomicUsize::new(0);

        let compute = |expected: i32| {
            cache
                .get("k", |ctx| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    ctx.add_dependency(registry.dependency("root"));
                    Ok(expected)
                })
                .unwrap()
        };

        assert_eq!(compute(1), 1);
        assert_eq!(compute(2), 1);

        registry.trigger("root");
        assert_eq!(compute(3), 3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_get_propagates_dependencies() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("leaf.txt");
        std::fs::write(&file, b"x").unwrap();

        let inner: Arc<Cache<&str, i32>> = Arc::new(Cache::new());
        let outer: Cache<&str, i32> = Cache::new();
        let outer_runs = AtomicUsize::new(0);

        let compute_outer = |outer: &Cache<&str, i32>| {
            let inner = inner.clone();
            outer
                .get("p", |_ctx| {
                    outer_runs.fetch_add(1, Ordering::SeqCst);
                    inner.get("q", |ctx| {
                        ctx.add_dependency(Arc::new(FileWriteTimeDependency::new(&file)));
                        Ok(7)
                    })
                })
                .unwrap()
        };

        assert_eq!(compute_outer(&outer), 7);
        assert_eq!(compute_outer(&outer), 7);
        assert_eq!(outer_runs.load(Ordering::SeqCst), 1);

        // touching the leaf invalidates the outer entry even though only
        // the inner factory declared the file
        touch(&file, 5);
        assert_eq!(compute_outer(&outer), 7);
        assert_eq!(outer_runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_hit_still_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("leaf.txt");
        std::fs::write(&file, b"x").unwrap();

        let inner: Arc<Cache<&str, i32>> = Arc::new(Cache::new());
        let outer: Cache<&str, i32> = Cache::new();

        // warm the inner entry outside any context
        inner
            .get("q", |ctx| {
                ctx.add_dependency(Arc::new(FileWriteTimeDependency::new(&file)));
                Ok(7)
            })
            .unwrap();

        let outer_runs = AtomicUsize::new(0);
        let compute_outer = |outer: &Cache<&str, i32>| {
            let inner = inner.clone();
            outer
                .get("p", |_ctx| {
                    outer_runs.fetch_add(1, Ordering::SeqCst);
                    inner.get("q", |ctx| {
                        ctx.add_dependency(Arc::new(FileWriteTimeDependency::new(&file)));
                        Ok(7)
                    })
                })
                .unwrap()
        };

        // the outer computation sees an inner *hit*, and must still
        // inherit the file dependency from it
        assert_eq!(compute_outer(&outer), 7);
        touch(&file, 5);
        compute_outer(&outer);
        assert_eq!(outer_runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn factory_error_leaves_no_entry() {
        let cache: Cache<&str, i32> = Cache::new();

        let err = cache.get("k", |_ctx| {
            Err(miette::miette!("boom"))
        });
        assert!(err.is_err());
        assert_eq!(cache.len(), 0);

        // next attempt retries from scratch
        let ok = cache.get("k", |_ctx| Ok(5)).unwrap();
        assert_eq!(ok, 5);
    }

    #[test]
    fn recompute_receives_previous_value() {
        let registry = NamedTriggerRegistry::new();
        let cache: Cache<&str, Vec<i32>> = Cache::new();

        let compute = |next: i32| {
            cache
                .get_or_update("k", |ctx, previous| {
                    ctx.add_dependency(registry.dependency("gen"));
                    let mut items = previous.cloned().unwrap_or_default();
                    items.push(next);
                    Ok(items)
                })
                .unwrap()
        };

        assert_eq!(compute(1), vec![1]);
        registry.trigger("gen");
        // incremental merge on top of the stale value
        assert_eq!(compute(2), vec![1, 2]);
    }

    #[test]
    fn concurrent_readers_converge_on_one_computation() {
        let cache: Arc<Cache<&str, usize>> = Arc::new(Cache::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let runs = runs.clone();
                std::thread::spawn(move || {
                    cache
                        .get("k", |_ctx| {
                            runs.fetch_add(1, Ordering::SeqCst);
                            // widen the race window
                            std::thread::sleep(Duration::from_millis(20));
                            Ok(7usize)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let cache: Cache<(&str, u32), i32> = Cache::new();
        cache.get(("a", 1), |_| Ok(1)).unwrap();
        cache.get(("a", 2), |_| Ok(2)).unwrap();
        assert_eq!(cache.len(), 2);

        let err = cache.get(("b", 1), |_| Err::<i32, _>(miette::miette!("no")));
        assert!(err.is_err());
        // unrelated entries are untouched
        assert_eq!(cache.get(("a", 1), |_| Ok(99)).unwrap(), 1);
    }
}

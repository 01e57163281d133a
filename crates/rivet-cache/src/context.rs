//! Ambient computation context for dependency propagation.
//!
//! Each thread carries a stack of active contexts. The cache pushes a
//! fresh context around every factory invocation and pops it when the
//! factory returns, success or not. When a `get` completes, the entry's
//! dependencies are registered onto whatever context is active at that
//! point (the enclosing computation), which is what makes staleness
//! propagate through nested cache reads without the outer factory
//! knowing about the inner one.

use std::cell::RefCell;
use std::sync::{Arc, Mutex, PoisonError};

use crate::dependency::CacheDependency;

/// Dependency collector handed to cache factories.
pub struct CacheContext {
    dependencies: Mutex<Vec<Arc<dyn CacheDependency>>>,
}

impl CacheContext {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            dependencies: Mutex::new(Vec::new()),
        })
    }

    /// Declare that the current computation depends on `dependency`:
    /// the cached result stays valid only while it reports unchanged.
    pub fn add_dependency(&self, dependency: Arc<dyn CacheDependency>) {
        self.dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dependency);
    }

    pub(crate) fn take_dependencies(&self) -> Vec<Arc<dyn CacheDependency>> {
        std::mem::take(
            &mut *self
                .dependencies
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Arc<CacheContext>>> = const { RefCell::new(Vec::new()) };
}

/// Register `dependencies` onto the innermost active context of this
/// thread, if any. Called after a `get` completes (hit or compute), once
/// the completed computation's own context has been popped.
pub(crate) fn register_on_active(dependencies: &[Arc<dyn CacheDependency>]) {
    CONTEXT_STACK.with(|stack| {
        if let Some(active) = stack.borrow().last() {
            for dependency in dependencies {
                active.add_dependency(dependency.clone());
            }
        }
    });
}

/// RAII frame for one factory invocation: pushes a fresh context on
/// construction, pops it on drop (also on the error path).
pub(crate) struct ContextScope {
    context: Arc<CacheContext>,
}

impl ContextScope {
    pub(crate) fn push() -> Self {
        let context = CacheContext::new();
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(context.clone()));
        Self { context }
    }

    pub(crate) fn context(&self) -> &CacheContext {
        &self.context
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert!(popped.is_some_and(|c| Arc::ptr_eq(&c, &self.context)));
        });
    }
}

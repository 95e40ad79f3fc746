//! Per-runtime cache of bound host functions.
//!
//! Reading a method as a property hands the runtime a function value. The
//! same method is typically read many times from the same runtime (calls in
//! a loop), so the bound [`HostFunction`] is memoized per `(runtime, name)`.
//! Functions are not shared across runtimes.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::dispatch::{HostFn, HostFunction};
use crate::runtime::{Runtime, RuntimeId};

/// Bound functions keyed by runtime, then by name.
#[derive(Default)]
pub struct FunctionCache {
    entries: DashMap<RuntimeId, FxHashMap<String, Arc<HostFunction>>>,
}

impl FunctionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the function bound to `runtime` for `name`, building it from
    /// `function` on a miss.
    ///
    /// A cached function is reused only while its runtime is alive and is the
    /// same instance the function was built for. Anything else is rebuilt in
    /// place.
    pub fn get_or_create(
        &self,
        runtime: &Runtime,
        name: &str,
        length: usize,
        function: &HostFn,
    ) -> Arc<HostFunction> {
        let mut slot = self.entries.entry(runtime.id()).or_default();
        if let Some(cached) = slot.get(name) {
            let owner = cached.runtime();
            if runtime.is_alive() && owner.refers_to(runtime) && owner.is_alive() {
                trace!(runtime = %runtime.id(), name, "Function cache hit");
                return cached.clone();
            }
            debug!(runtime = %runtime.id(), name, "Stale runtime in function cache, rebuilding");
        }

        let bound = Arc::new(HostFunction::new(name, length, runtime, function.clone()));
        slot.insert(name.to_string(), bound.clone());
        bound
    }

    /// Number of functions cached for `runtime`.
    pub fn len_for(&self, runtime: RuntimeId) -> usize {
        self.entries.get(&runtime).map(|slot| slot.len()).unwrap_or(0)
    }

    /// Number of runtimes with at least one cache slot.
    pub fn runtime_count(&self) -> usize {
        self.entries.len()
    }

    /// Drop every cached function.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HybridResult;
    use crate::runtime::RuntimeRegistry;
    use crate::value::Value;

    fn host_fn() -> HostFn {
        Arc::new(|_: &Runtime, _: &Value, _: &[Value]| -> HybridResult<Value> { Ok(Value::Null) })
    }

    #[test]
    fn test_hit_returns_same_function() {
        let registry = RuntimeRegistry::new();
        let rt = Runtime::new(&registry, "main");
        let cache = FunctionCache::new();
        let f = host_fn();

        let first = cache.get_or_create(&rt, "m", 0, &f);
        let second = cache.get_or_create(&rt, "m", 0, &f);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len_for(rt.id()), 1);
    }

    #[test]
    fn test_runtimes_get_distinct_functions() {
        let registry = RuntimeRegistry::new();
        let main = Runtime::new(&registry, "main");
        let worker = Runtime::new(&registry, "worker");
        let cache = FunctionCache::new();
        let f = host_fn();

        let a = cache.get_or_create(&main, "m", 0, &f);
        let b = cache.get_or_create(&worker, "m", 0, &f);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.runtime_count(), 2);
    }

    #[test]
    fn test_dead_runtime_entry_is_rebuilt() {
        let registry = RuntimeRegistry::new();
        let id = registry.allocate_id();
        registry.register(id);
        let rt = Runtime::with_liveness(id, "worklet", registry.clone());
        let cache = FunctionCache::new();
        let f = host_fn();

        let first = cache.get_or_create(&rt, "m", 0, &f);
        registry.unregister(id);
        registry.register(id);
        let replacement = Runtime::with_liveness(id, "worklet", registry.clone());
        drop(rt);

        let second = cache.get_or_create(&replacement, "m", 0, &f);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.runtime().refers_to(&replacement));
        assert_eq!(cache.len_for(id), 1);
    }
}

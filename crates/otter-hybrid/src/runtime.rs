//! Runtime identity and liveness tracking.
//!
//! A hybrid object may be observed from several runtimes at once (the main
//! JS thread plus worker isolates). Each runtime gets a [`RuntimeId`] issued
//! from a monotonic counter, so an id is never shared by two runtimes even
//! when the engine reuses memory after teardown.
//!
//! Objects never own the runtimes that touch them. They keep a
//! [`WeakRuntime`], which can only answer "is this runtime still alive?" and
//! is checked against a [`RuntimeLiveness`] registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashSet;
use tracing::debug;

/// Unique runtime identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeId(u64);

impl RuntimeId {
    /// Wrap a raw id issued by an external identity scheme.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Answers whether a runtime id still refers to a usable runtime.
pub trait RuntimeLiveness: Send + Sync {
    /// Check whether `id` is alive.
    fn is_alive(&self, id: RuntimeId) -> bool;
}

/// Default liveness registry.
///
/// Issues ids and tracks which runtimes are currently registered. Runtimes
/// created with [`Runtime::new`] register themselves and unregister when the
/// last handle drops.
pub struct RuntimeRegistry {
    live: DashSet<RuntimeId>,
    next_id: AtomicU64,
}

impl RuntimeRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            live: DashSet::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Allocate a new runtime id.
    pub fn allocate_id(&self) -> RuntimeId {
        RuntimeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Mark a runtime as alive.
    pub fn register(&self, id: RuntimeId) {
        self.live.insert(id);
    }

    /// Mark a runtime as torn down.
    pub fn unregister(&self, id: RuntimeId) -> bool {
        self.live.remove(&id).is_some()
    }

    /// Number of live runtimes.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl RuntimeLiveness for RuntimeRegistry {
    fn is_alive(&self, id: RuntimeId) -> bool {
        self.live.contains(&id)
    }
}

struct RuntimeInner {
    id: RuntimeId,
    name: String,
    liveness: Arc<dyn RuntimeLiveness>,
    /// Set when this runtime registered itself and must unregister on drop.
    owner: Option<Arc<RuntimeRegistry>>,
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        if let Some(registry) = self.owner.take() {
            registry.unregister(self.id);
        }
        debug!(runtime = %self.id, name = %self.name, "Runtime dropped");
    }
}

/// Handle to a runtime instance.
///
/// Cheap to clone. The runtime stays registered until every clone drops.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create and register a runtime in `registry`.
    pub fn new(registry: &Arc<RuntimeRegistry>, name: impl Into<String>) -> Self {
        let id = registry.allocate_id();
        registry.register(id);
        let name = name.into();
        debug!(runtime = %id, name = %name, "Runtime registered");
        Self {
            inner: Arc::new(RuntimeInner {
                id,
                name,
                liveness: registry.clone(),
                owner: Some(registry.clone()),
            }),
        }
    }

    /// Create a runtime whose identity and liveness are managed elsewhere.
    ///
    /// Nothing is registered or unregistered by this handle.
    pub fn with_liveness(
        id: RuntimeId,
        name: impl Into<String>,
        liveness: Arc<dyn RuntimeLiveness>,
    ) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                id,
                name: name.into(),
                liveness,
                owner: None,
            }),
        }
    }

    /// Get the runtime id.
    pub fn id(&self) -> RuntimeId {
        self.inner.id
    }

    /// Get the runtime name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Ask the liveness registry whether this runtime is still valid.
    pub fn is_alive(&self) -> bool {
        self.inner.liveness.is_alive(self.inner.id)
    }

    /// Create a non-owning back-reference.
    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

/// Non-owning back-reference to a runtime.
///
/// Never dereferenced. It only answers whether the runtime it was created
/// from is still alive and whether a given handle is that same instance.
#[derive(Clone)]
pub struct WeakRuntime {
    id: RuntimeId,
    inner: Weak<RuntimeInner>,
}

impl WeakRuntime {
    /// Id of the referenced runtime.
    pub fn id(&self) -> RuntimeId {
        self.id
    }

    /// True while the runtime has handles and its liveness registry
    /// still reports it alive.
    pub fn is_alive(&self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.liveness.is_alive(inner.id),
            None => false,
        }
    }

    /// Check whether `runtime` is the same instance this reference was taken from.
    ///
    /// Two runtimes sharing an externally issued id are still different
    /// instances.
    pub fn refers_to(&self, runtime: &Runtime) -> bool {
        self.id == runtime.id() && std::ptr::eq(self.inner.as_ptr(), Arc::as_ptr(&runtime.inner))
    }
}

impl fmt::Debug for WeakRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRuntime")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

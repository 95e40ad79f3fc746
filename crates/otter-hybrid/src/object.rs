//! Hybrid objects and the host object protocol.
//!
//! A hybrid object is a plain Rust struct that embeds a [`HybridCore`] and
//! implements [`HybridObject`]. The blanket [`HostObject`] impl then provides
//! the three operations an engine needs to treat it as one of its own
//! objects: `get`, `set` and `property_names`.
//!
//! ```ignore
//! struct User {
//!     core: HybridCore,
//!     name: Mutex<String>,
//! }
//!
//! impl User {
//!     fn age(&self) -> i32 {
//!         23
//!     }
//! }
//!
//! impl HybridObject for User {
//!     fn hybrid_core(&self) -> &HybridCore {
//!         &self.core
//!     }
//!
//!     fn load_hybrid_methods(&self, reg: &mut Registrar<'_, Self>) -> HybridResult<()> {
//!         reg.register_method("getAge", Self::age)?;
//!         Ok(())
//!     }
//! }
//!
//! let user = make_hybrid(User { core: HybridCore::new("User"), .. });
//! let value = Value::object(user);
//! ```
//!
//! # Ownership
//!
//! Hybrid objects must be published through [`make_hybrid`], which puts them
//! in an `Arc` and records a weak self reference. Bound functions reach the
//! instance through that weak reference, so caches held by the object never
//! keep it alive. Protocol calls on an object that bypassed the factory fail
//! with [`HybridError::NotShared`].

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::cache::FunctionCache;
use crate::config::HybridConfig;
use crate::dispatch::{HostFn, invoke};
use crate::error::{HybridError, HybridResult};
use crate::lazy_init::{InitState, LazyInit};
use crate::registry::{HybridTables, Registrar};
use crate::runtime::{Runtime, WeakRuntime};
use crate::value::{PropertyKey, Value};

/// Name under which the built-in string conversion is exposed.
const TO_STRING: &str = "toString";

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Bridge state embedded in every hybrid object.
pub struct HybridCore {
    name: String,
    instance_id: u64,
    config: HybridConfig,
    tables: LazyInit<HybridTables>,
    cache: FunctionCache,
    to_string_fn: OnceCell<HostFn>,
    creation_runtime: OnceCell<WeakRuntime>,
    this: OnceCell<Weak<dyn Any + Send + Sync>>,
}

impl HybridCore {
    /// Create bridge state tagged `name`, with default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, HybridConfig::default())
    }

    /// Create bridge state with an explicit configuration.
    pub fn with_config(name: impl Into<String>, config: HybridConfig) -> Self {
        let name = name.into();
        let instance_id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(tag = %name, instance = instance_id, "Creating hybrid object");
        Self {
            name,
            instance_id,
            config,
            tables: LazyInit::new(),
            cache: FunctionCache::new(),
            to_string_fn: OnceCell::new(),
            creation_runtime: OnceCell::new(),
            this: OnceCell::new(),
        }
    }

    /// Tag name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-wide instance counter, for diagnostics only.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn config(&self) -> HybridConfig {
        self.config
    }

    pub fn init_state(&self) -> InitState {
        self.tables.state()
    }

    /// Registered members, if setup already ran.
    pub fn tables(&self) -> Option<&HybridTables> {
        self.tables.get()
    }

    /// Runtime that triggered the successful setup.
    pub fn creation_runtime(&self) -> Option<&WeakRuntime> {
        self.creation_runtime.get()
    }

    /// Whether the creation runtime is still alive. False before setup.
    pub fn is_runtime_alive(&self) -> bool {
        self.creation_runtime
            .get()
            .is_some_and(WeakRuntime::is_alive)
    }

    /// Number of bound functions cached for `runtime`.
    pub fn cached_function_count(&self, runtime: &Runtime) -> usize {
        self.cache.len_for(runtime.id())
    }

    /// Number of runtimes that have bound functions cached.
    pub fn cached_runtime_count(&self) -> usize {
        self.cache.runtime_count()
    }

    /// Typed shared handle to the object embedding this core.
    ///
    /// Fails with `NotShared` unless the object was created by
    /// [`make_hybrid`] and is still alive.
    pub fn shared<T: Any + Send + Sync>(&self) -> HybridResult<Arc<T>> {
        let this = self.this.get().ok_or(HybridError::NotShared)?;
        this.upgrade()
            .ok_or(HybridError::ObjectDropped)?
            .downcast::<T>()
            .map_err(|_| HybridError::NotShared)
    }

    fn bind(&self, this: Weak<dyn Any + Send + Sync>) {
        if self.this.set(this).is_err() {
            debug!(tag = %self.name, instance = self.instance_id, "Hybrid object already bound");
        }
    }

    /// Run setup once and return the frozen tables.
    fn ensure_initialized<T: HybridObject>(&self, obj: &T, runtime: &Runtime) -> HybridResult<&HybridTables> {
        self.tables.get_or_try_init(|| {
            let instance = Arc::downgrade(&self.shared::<T>()?);
            debug!(
                tag = %self.name,
                instance = self.instance_id,
                runtime = %runtime.id(),
                "Loading hybrid methods"
            );

            let mut tables = HybridTables::new();
            let mut registrar = Registrar::new(&mut tables, instance, self.config);
            let loaded = invoke(self.config, || obj.load_hybrid_methods(&mut registrar)).and_then(|r| r);
            if let Err(err) = loaded {
                debug!(tag = %self.name, instance = self.instance_id, error = %err, "Hybrid setup failed");
                return Err(err);
            }

            let _ = self.creation_runtime.set(runtime.downgrade());
            debug!(
                tag = %self.name,
                instance = self.instance_id,
                members = tables.len(),
                "Hybrid methods loaded"
            );
            Ok(tables)
        })
    }

    fn to_string_fn<T: HybridObject>(&self) -> HybridResult<&HostFn> {
        self.to_string_fn.get_or_try_init(|| {
            let instance = Arc::downgrade(&self.shared::<T>()?);
            let function: HostFn = Arc::new(
                move |runtime: &Runtime, _this: &Value, _args: &[Value]| -> HybridResult<Value> {
                    let obj = instance.upgrade().ok_or(HybridError::ObjectDropped)?;
                    Ok(Value::String(obj.describe(runtime)))
                },
            );
            Ok(function)
        })
    }
}

impl Drop for HybridCore {
    fn drop(&mut self) {
        debug!(tag = %self.name, instance = self.instance_id, "Deleting hybrid object");
    }
}

/// A native object exposed to dynamic runtimes.
pub trait HybridObject: Send + Sync + Sized + 'static {
    /// Bridge state of this object.
    fn hybrid_core(&self) -> &HybridCore;

    /// Register the methods and properties visible to the runtime.
    ///
    /// Called exactly once per object, on first access from any runtime.
    /// An error aborts setup; nothing registered so far is kept and the next
    /// access runs setup again. Must not access this object through the
    /// host object protocol.
    fn load_hybrid_methods(&self, registrar: &mut Registrar<'_, Self>) -> HybridResult<()>;

    /// String representation, exposed to the runtime as `toString()`.
    fn describe(&self, _runtime: &Runtime) -> String {
        let core = self.hybrid_core();
        format!("[HybridObject {}#{}]", core.name(), core.instance_id())
    }

    /// Typed shared handle to this object.
    ///
    /// Only valid for objects created with [`make_hybrid`]; otherwise fails
    /// with `NotShared`.
    fn shared(&self) -> HybridResult<Arc<Self>> {
        self.hybrid_core().shared::<Self>()
    }

    /// Whether the runtime that first initialized this object is still alive.
    fn is_runtime_alive(&self) -> bool {
        self.hybrid_core().is_runtime_alive()
    }
}

/// Put a hybrid object under shared ownership.
///
/// This is the only supported way to hand a hybrid object to a runtime.
pub fn make_hybrid<T: HybridObject>(object: T) -> Arc<T> {
    let arc = Arc::new(object);
    let this: Weak<dyn Any + Send + Sync> = Arc::downgrade(&arc) as Weak<dyn Any + Send + Sync>;
    arc.hybrid_core().bind(this);
    arc
}

/// Operations an engine invokes on a host-provided object.
pub trait HostObject: Send + Sync + 'static {
    /// Read a property. Absent names produce `Value::Undefined`.
    fn get(&self, runtime: &Runtime, name: &str) -> HybridResult<Value>;

    /// Assign a property. Names without a setter fail with `NoSuchSetter`.
    fn set(&self, runtime: &Runtime, name: &str, value: &Value) -> HybridResult<()>;

    /// Enumerate property names.
    fn property_names(&self, runtime: &Runtime) -> HybridResult<Vec<PropertyKey>>;

    /// Debug representation of the object.
    fn to_js_string(&self, runtime: &Runtime) -> String;

    /// Convert into `Any` for downcasting back to the concrete type.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: HybridObject> HostObject for T {
    fn get(&self, runtime: &Runtime, name: &str) -> HybridResult<Value> {
        let core = self.hybrid_core();
        let tables = core.ensure_initialized(self, runtime)?;

        if let Some(entry) = tables.method(name) {
            let function = core
                .cache
                .get_or_create(runtime, name, entry.arity(), entry.function());
            return Ok(Value::Function(function));
        }

        if let Some(getter) = tables.getter(name) {
            return getter(runtime, &Value::Undefined, &[]);
        }

        if name == TO_STRING {
            let function = core.to_string_fn::<T>()?;
            return Ok(Value::Function(core.cache.get_or_create(runtime, name, 0, function)));
        }

        Ok(Value::Undefined)
    }

    fn set(&self, runtime: &Runtime, name: &str, value: &Value) -> HybridResult<()> {
        let core = self.hybrid_core();
        let tables = core.ensure_initialized(self, runtime)?;

        match tables.setter(name) {
            Some(setter) => {
                setter(runtime, &Value::Undefined, std::slice::from_ref(value))?;
                Ok(())
            }
            None => Err(HybridError::no_such_setter(name)),
        }
    }

    fn property_names(&self, runtime: &Runtime) -> HybridResult<Vec<PropertyKey>> {
        let core = self.hybrid_core();
        let tables = core.ensure_initialized(self, runtime)?;
        Ok(tables.names().into_iter().map(PropertyKey::from).collect())
    }

    fn to_js_string(&self, runtime: &Runtime) -> String {
        self.describe(runtime)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

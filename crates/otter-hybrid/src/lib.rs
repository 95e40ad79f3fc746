//! otter-hybrid - typed Rust objects exposed to dynamic JavaScript runtimes.
//!
//! A hybrid object is a native struct whose methods and properties are
//! registered once, by name, and then served to any number of runtimes
//! through a small host object protocol (`get`, `set`, `property_names`).
//!
//! # Features
//!
//! - **Typed registration**: plain `Fn(&Self, A1, .., An) -> R` methods, with
//!   argument and result conversion via [`FromJs`] / [`IntoJs`]
//! - **Raw escape hatch**: methods taking `(runtime, this, args)` directly
//! - **Lazy setup**: members are registered on first access, exactly once,
//!   even under concurrent first access
//! - **Per-runtime function cache**: reading a method twice from the same
//!   runtime yields the same function; dead runtimes are detected and their
//!   entries rebuilt
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! use otter_hybrid::prelude::*;
//!
//! struct Counter {
//!     core: HybridCore,
//!     count: AtomicU32,
//! }
//!
//! impl Counter {
//!     fn increment(&self, by: u32) -> u32 {
//!         self.count.fetch_add(by, Ordering::SeqCst) + by
//!     }
//!
//!     fn count(&self) -> u32 {
//!         self.count.load(Ordering::SeqCst)
//!     }
//! }
//!
//! impl HybridObject for Counter {
//!     fn hybrid_core(&self) -> &HybridCore {
//!         &self.core
//!     }
//!
//!     fn load_hybrid_methods(&self, reg: &mut Registrar<'_, Self>) -> HybridResult<()> {
//!         reg.register_method("increment", Counter::increment)?
//!             .register_getter("count", Counter::count)?;
//!         Ok(())
//!     }
//! }
//!
//! let registry = RuntimeRegistry::new();
//! let rt = Runtime::new(&registry, "main");
//! let counter = make_hybrid(Counter {
//!     core: HybridCore::new("Counter"),
//!     count: AtomicU32::new(0),
//! });
//!
//! let increment = counter.get(&rt, "increment")?;
//! if let Some(f) = increment.as_function() {
//!     f.call(&rt, &Value::Undefined, &[Value::Number(2.0)])?;
//! }
//! assert_eq!(counter.get(&rt, "count")?, Value::Number(2.0));
//! # Ok::<(), HybridError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                HostObject (get / set / names)                │
//! └─────────────────────────────────────────────────────────────┘
//!                           ↓
//! ┌──────────────────┐  ┌──────────────────┐  ┌────────────────┐
//! │    LazyInit      │→ │  HybridTables    │→ │ FunctionCache  │
//! │ (setup, once)    │  │ methods/getters/ │  │ per runtime,   │
//! │                  │  │ setters          │  │ per name       │
//! └──────────────────┘  └──────────────────┘  └────────────────┘
//!                           ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │           NativeMethod adapters (FromJs / IntoJs)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
mod lazy_init;
pub mod object;
pub mod registry;
pub mod runtime;
pub mod value;

pub use cache::FunctionCache;
pub use config::HybridConfig;
pub use convert::{FromJs, IntoJs};
pub use dispatch::{HostFn, HostFunction, NativeMethod, Raw, Typed};
pub use error::{HybridError, HybridResult, MemberKind};
pub use lazy_init::InitState;
pub use object::{HostObject, HybridCore, HybridObject, make_hybrid};
pub use registry::{HybridTables, MethodEntry, Registrar};
pub use runtime::{Runtime, RuntimeId, RuntimeLiveness, RuntimeRegistry, WeakRuntime};
pub use value::{PropertyKey, Value};

pub mod prelude {
    pub use crate::config::HybridConfig;
    pub use crate::convert::{FromJs, IntoJs};
    pub use crate::dispatch::{HostFn, HostFunction};
    pub use crate::error::{HybridError, HybridResult};
    pub use crate::object::{HostObject, HybridCore, HybridObject, make_hybrid};
    pub use crate::registry::Registrar;
    pub use crate::runtime::{Runtime, RuntimeId, RuntimeRegistry, WeakRuntime};
    pub use crate::value::{PropertyKey, Value};
}

//! Dispatch adapters: typed Rust methods behind the uniform host calling convention.
//!
//! Every registered member is erased into a [`HostFn`], which receives the
//! calling runtime, the `this` value and the argument slice. Typed methods
//! `Fn(&T, A1, .., An) -> R` get their arguments converted with [`FromJs`]
//! and their result with [`IntoJs`]. Methods that already have the uniform
//! shape `Fn(&T, &Runtime, &Value, &[Value]) -> HybridResult<Value>` are
//! forwarded untouched, which gives full manual control over arguments.
//!
//! Adapters hold a `Weak` handle to their instance, so a hybrid object's own
//! tables and caches never keep it alive.

use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use tracing::{trace, warn};

use crate::config::HybridConfig;
use crate::convert::{FromJs, IntoJs};
use crate::error::{HybridError, HybridResult};
use crate::runtime::{Runtime, WeakRuntime};
use crate::value::Value;

/// Uniform host callable: `(runtime, this, args) -> value`.
pub type HostFn = Arc<dyn Fn(&Runtime, &Value, &[Value]) -> HybridResult<Value> + Send + Sync>;

/// Marker for methods whose arguments and result are converted.
pub struct Typed<Args, R>(PhantomData<fn(Args) -> R>);

/// Marker for methods that take the uniform signature and skip conversion.
pub struct Raw;

/// A Rust method that can be erased into a [`HostFn`] bound to an instance of `T`.
///
/// Implemented for `Fn(&T, A1, .., An) -> R` up to eight arguments, and for
/// the raw signature `Fn(&T, &Runtime, &Value, &[Value]) -> HybridResult<Value>`.
/// `Marker` only disambiguates the two families; it is always inferred.
pub trait NativeMethod<T, Marker>: Send + Sync + 'static {
    /// Declared parameter count.
    const ARITY: usize;

    /// Erase into a uniform callable bound to `instance`.
    fn into_host_fn(self, instance: Weak<T>, config: HybridConfig) -> HostFn;
}

fn check_arity(expected: usize, actual: usize, config: HybridConfig) -> HybridResult<()> {
    if actual < expected || (config.strict_arity && actual > expected) {
        return Err(HybridError::ArgumentCount { expected, actual });
    }
    Ok(())
}

/// Run a native body, turning panics into `NativeInvocation` when configured.
pub(crate) fn invoke<R>(config: HybridConfig, body: impl FnOnce() -> R) -> HybridResult<R> {
    if !config.catch_panics {
        return Ok(body());
    }
    catch_unwind(AssertUnwindSafe(body)).map_err(|panic| {
        let msg = if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        warn!(error = %msg, "Native method panicked");
        HybridError::NativeInvocation(format!("native method panicked: {}", msg))
    })
}

fn upgrade<T>(instance: &Weak<T>) -> HybridResult<Arc<T>> {
    instance.upgrade().ok_or(HybridError::ObjectDropped)
}

macro_rules! impl_native_method {
    ($arity:literal $(, ($A:ident, $a:ident, $idx:literal))*) => {
        impl<T, F, R $(, $A)*> NativeMethod<T, Typed<($($A,)*), R>> for F
        where
            T: Send + Sync + 'static,
            F: Fn(&T $(, $A)*) -> R + Send + Sync + 'static,
            R: IntoJs + 'static,
            $($A: FromJs + 'static,)*
        {
            const ARITY: usize = $arity;

            fn into_host_fn(self, instance: Weak<T>, config: HybridConfig) -> HostFn {
                Arc::new(move |runtime: &Runtime, _this: &Value, args: &[Value]| {
                    check_arity($arity, args.len(), config)?;
                    $(
                        let $a = <$A as FromJs>::from_js(runtime, &args[$idx])
                            .map_err(|e| e.at_argument($idx))?;
                    )*
                    let obj = upgrade(&instance)?;
                    let result = invoke(config, || (self)(obj.as_ref() $(, $a)*))?;
                    result.into_js(runtime)
                })
            }
        }
    };
}

impl_native_method!(0);
impl_native_method!(1, (A1, a1, 0));
impl_native_method!(2, (A1, a1, 0), (A2, a2, 1));
impl_native_method!(3, (A1, a1, 0), (A2, a2, 1), (A3, a3, 2));
impl_native_method!(4, (A1, a1, 0), (A2, a2, 1), (A3, a3, 2), (A4, a4, 3));
impl_native_method!(5, (A1, a1, 0), (A2, a2, 1), (A3, a3, 2), (A4, a4, 3), (A5, a5, 4));
impl_native_method!(
    6,
    (A1, a1, 0),
    (A2, a2, 1),
    (A3, a3, 2),
    (A4, a4, 3),
    (A5, a5, 4),
    (A6, a6, 5)
);
impl_native_method!(
    7,
    (A1, a1, 0),
    (A2, a2, 1),
    (A3, a3, 2),
    (A4, a4, 3),
    (A5, a5, 4),
    (A6, a6, 5),
    (A7, a7, 6)
);
impl_native_method!(
    8,
    (A1, a1, 0),
    (A2, a2, 1),
    (A3, a3, 2),
    (A4, a4, 3),
    (A5, a5, 4),
    (A6, a6, 5),
    (A7, a7, 6),
    (A8, a8, 7)
);

impl<T, F> NativeMethod<T, Raw> for F
where
    T: Send + Sync + 'static,
    F: Fn(&T, &Runtime, &Value, &[Value]) -> HybridResult<Value> + Send + Sync + 'static,
{
    // Variadic by construction.
    const ARITY: usize = 0;

    fn into_host_fn(self, instance: Weak<T>, config: HybridConfig) -> HostFn {
        Arc::new(move |runtime: &Runtime, this: &Value, args: &[Value]| {
            let obj = upgrade(&instance)?;
            invoke(config, || (self)(obj.as_ref(), runtime, this, args))?
        })
    }
}

/// A callable bound to one runtime, handed to that runtime as a function value.
///
/// Bound functions are not transferable: calling one from another runtime,
/// or after its runtime died, fails.
pub struct HostFunction {
    name: String,
    length: usize,
    runtime: WeakRuntime,
    func: HostFn,
}

impl HostFunction {
    /// Bind `func` to `runtime`.
    pub fn new(name: impl Into<String>, length: usize, runtime: &Runtime, func: HostFn) -> Self {
        Self {
            name: name.into(),
            length,
            runtime: runtime.downgrade(),
            func,
        }
    }

    /// Function name as seen by the runtime.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter count (the runtime's `length` property).
    pub fn length(&self) -> usize {
        self.length
    }

    /// Back-reference to the owning runtime.
    pub fn runtime(&self) -> &WeakRuntime {
        &self.runtime
    }

    /// Call the function from `runtime`.
    pub fn call(&self, runtime: &Runtime, this: &Value, args: &[Value]) -> HybridResult<Value> {
        if !self.runtime.refers_to(runtime) {
            return Err(HybridError::RuntimeMismatch {
                expected: self.runtime.id(),
                actual: runtime.id(),
            });
        }
        if !runtime.is_alive() {
            return Err(HybridError::RuntimeDead(runtime.id()));
        }
        trace!(name = %self.name, runtime = %runtime.id(), argc = args.len(), "Host function call");
        (self.func)(runtime, this, args)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .field("length", &self.length)
            .field("runtime", &self.runtime.id())
            .finish_non_exhaustive()
    }
}

//! Value conversion traits for hybrid method parameter marshalling.
//!
//! `FromJs` converts a runtime `Value` into a Rust type (for parameters).
//! `IntoJs` converts a Rust type back into a runtime `Value` (for return values).
//!
//! Implement both for your own types to pass them through hybrid methods.
//! The conversions here are strict: no implicit coercion between strings,
//! numbers and booleans.

use std::sync::Arc;

use crate::dispatch::HostFunction;
use crate::error::{HybridError, HybridResult};
use crate::object::HybridObject;
use crate::runtime::Runtime;
use crate::value::Value;

/// Convert a runtime `Value` into a Rust type.
pub trait FromJs: Sized {
    /// Convert from a runtime value, failing with `Conversion` on type mismatch.
    fn from_js(runtime: &Runtime, value: &Value) -> HybridResult<Self>;
}

/// Convert a Rust type into a runtime `Value`.
pub trait IntoJs {
    /// Convert into a runtime value.
    fn into_js(self, runtime: &Runtime) -> HybridResult<Value>;
}

fn mismatch<T>(expected: &str, value: &Value) -> HybridResult<T> {
    Err(HybridError::conversion(expected, value.type_name()))
}

// ---------------------------------------------------------------------------
// FromJs implementations
// ---------------------------------------------------------------------------

impl FromJs for Value {
    fn from_js(_runtime: &Runtime, value: &Value) -> HybridResult<Self> {
        Ok(value.clone())
    }
}

impl FromJs for f64 {
    fn from_js(_runtime: &Runtime, value: &Value) -> HybridResult<Self> {
        match value {
            Value::Number(n) => Ok(*n),
            other => mismatch("number", other),
        }
    }
}

impl FromJs for f32 {
    fn from_js(runtime: &Runtime, value: &Value) -> HybridResult<Self> {
        f64::from_js(runtime, value).map(|n| n as f32)
    }
}

macro_rules! impl_from_js_int {
    ($($ty:ty),*) => {
        $(
            impl FromJs for $ty {
                fn from_js(runtime: &Runtime, value: &Value) -> HybridResult<Self> {
                    let n = f64::from_js(runtime, value)?;
                    let out_of_range = || HybridError::conversion(stringify!($ty), format!("number {}", n));
                    // `MAX as f64` rounds up for 64-bit types; range-check in i128 instead.
                    if n.fract() != 0.0 {
                        return Err(out_of_range());
                    }
                    <$ty>::try_from(n as i128).map_err(|_| out_of_range())
                }
            }

            impl IntoJs for $ty {
                fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
                    Ok(Value::Number(self as f64))
                }
            }
        )*
    };
}

impl_from_js_int!(i32, i64, u32, u64, usize);

impl FromJs for bool {
    fn from_js(_runtime: &Runtime, value: &Value) -> HybridResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => mismatch("boolean", other),
        }
    }
}

impl FromJs for String {
    fn from_js(_runtime: &Runtime, value: &Value) -> HybridResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => mismatch("string", other),
        }
    }
}

impl<T: FromJs> FromJs for Option<T> {
    fn from_js(runtime: &Runtime, value: &Value) -> HybridResult<Self> {
        match value {
            Value::Undefined | Value::Null => Ok(None),
            other => T::from_js(runtime, other).map(Some),
        }
    }
}

impl<T: FromJs> FromJs for Vec<T> {
    fn from_js(runtime: &Runtime, value: &Value) -> HybridResult<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_js(runtime, item).map_err(|e| e.at_element(i)))
                .collect(),
            other => mismatch("array", other),
        }
    }
}

impl FromJs for Arc<HostFunction> {
    fn from_js(_runtime: &Runtime, value: &Value) -> HybridResult<Self> {
        match value {
            Value::Function(f) => Ok(f.clone()),
            other => mismatch("function", other),
        }
    }
}

impl<T: HybridObject> FromJs for Arc<T> {
    fn from_js(_runtime: &Runtime, value: &Value) -> HybridResult<Self> {
        match value {
            Value::Object(obj) => obj
                .clone()
                .into_any()
                .downcast::<T>()
                .map_err(|_| HybridError::conversion(std::any::type_name::<T>(), "object")),
            other => mismatch(std::any::type_name::<T>(), other),
        }
    }
}

// ---------------------------------------------------------------------------
// IntoJs implementations
// ---------------------------------------------------------------------------

impl IntoJs for Value {
    fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
        Ok(self)
    }
}

/// Methods returning nothing produce `undefined`.
impl IntoJs for () {
    fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
        Ok(Value::Undefined)
    }
}

impl IntoJs for f64 {
    fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
        Ok(Value::Number(self))
    }
}

impl IntoJs for f32 {
    fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
        Ok(Value::Number(self as f64))
    }
}

impl IntoJs for bool {
    fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
        Ok(Value::Bool(self))
    }
}

impl IntoJs for String {
    fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
        Ok(Value::String(self))
    }
}

impl IntoJs for &str {
    fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
        Ok(Value::String(self.to_string()))
    }
}

impl<T: IntoJs> IntoJs for Option<T> {
    fn into_js(self, runtime: &Runtime) -> HybridResult<Value> {
        match self {
            Some(v) => v.into_js(runtime),
            None => Ok(Value::Null),
        }
    }
}

impl<T: IntoJs> IntoJs for Vec<T> {
    fn into_js(self, runtime: &Runtime) -> HybridResult<Value> {
        self.into_iter()
            .map(|item| item.into_js(runtime))
            .collect::<HybridResult<Vec<_>>>()
            .map(Value::Array)
    }
}

impl IntoJs for Arc<HostFunction> {
    fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
        Ok(Value::Function(self))
    }
}

impl<T: HybridObject> IntoJs for Arc<T> {
    fn into_js(self, _runtime: &Runtime) -> HybridResult<Value> {
        Ok(Value::Object(self))
    }
}

/// Fallible natives: `Err` is surfaced to the runtime as an exception.
impl<T: IntoJs, E: Into<HybridError>> IntoJs for Result<T, E> {
    fn into_js(self, runtime: &Runtime) -> HybridResult<Value> {
        match self {
            Ok(v) => v.into_js(runtime),
            Err(e) => Err(e.into()),
        }
    }
}

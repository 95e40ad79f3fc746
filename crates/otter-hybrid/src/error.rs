//! Error types for hybrid object dispatch

use std::fmt;

use thiserror::Error;

use crate::runtime::RuntimeId;

/// Which table a registered name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Callable method
    Method,
    /// Property getter
    Getter,
    /// Property setter
    Setter,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Method => write!(f, "method"),
            MemberKind::Getter => write!(f, "getter"),
            MemberKind::Setter => write!(f, "setter"),
        }
    }
}

/// Errors surfaced by hybrid objects to the embedding runtime
///
/// Every variant crosses into the runtime as a catchable exception.
#[derive(Error, Debug, Clone)]
pub enum HybridError {
    /// Registration collided with an existing entry
    #[error("Cannot add {kind} \"{name}\" - a {existing} with that name already exists")]
    NameConflict {
        /// Name being registered
        name: String,
        /// Kind of entry being registered
        kind: MemberKind,
        /// Kind of the entry already present
        existing: MemberKind,
    },

    /// Assignment to an unknown or read-only property
    #[error("TypeError: Cannot set property \"{0}\" - no setter is registered")]
    NoSuchSetter(String),

    /// A value could not be converted to the requested type
    #[error("TypeError: expected {expected}, got {actual}")]
    Conversion {
        /// Expected type name
        expected: String,
        /// Actual type name
        actual: String,
    },

    /// Conversion of a positional argument failed
    #[error("Argument {index}: {source}")]
    InvalidArgument {
        /// Zero-based argument position
        index: usize,
        /// Underlying conversion failure
        source: Box<HybridError>,
    },

    /// Conversion of an array element failed
    #[error("Element {index}: {source}")]
    InvalidElement {
        /// Zero-based element position
        index: usize,
        /// Underlying conversion failure
        source: Box<HybridError>,
    },

    /// Call received the wrong number of arguments
    #[error("TypeError: expected {expected} argument(s), got {actual}")]
    ArgumentCount {
        /// Declared arity
        expected: usize,
        /// Arguments actually passed
        actual: usize,
    },

    /// The native method itself failed
    #[error("{0}")]
    NativeInvocation(String),

    /// The native instance behind a bound function no longer exists
    #[error("ReferenceError: hybrid object has already been dropped")]
    ObjectDropped,

    /// `shared()` was called on an object not created through `make_hybrid`
    #[error("hybrid object is not managed by an Arc - create it with make_hybrid()")]
    NotShared,

    /// A bound function was called from a runtime it does not belong to
    #[error("function bound to runtime {expected} was called from runtime {actual}")]
    RuntimeMismatch {
        /// Runtime the function was created for
        expected: RuntimeId,
        /// Runtime that attempted the call
        actual: RuntimeId,
    },

    /// The runtime a bound function belongs to has been torn down
    #[error("runtime {0} is no longer alive")]
    RuntimeDead(RuntimeId),
}

impl HybridError {
    /// Create a name conflict error
    pub fn name_conflict(name: impl Into<String>, kind: MemberKind, existing: MemberKind) -> Self {
        Self::NameConflict {
            name: name.into(),
            kind,
            existing,
        }
    }

    /// Create a missing setter error
    pub fn no_such_setter(name: impl Into<String>) -> Self {
        Self::NoSuchSetter(name.into())
    }

    /// Create a conversion error
    pub fn conversion(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Conversion {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a native invocation failure from any displayable error
    pub fn native(err: impl fmt::Display) -> Self {
        Self::NativeInvocation(err.to_string())
    }

    /// Attach an argument position to a conversion failure
    pub fn at_argument(self, index: usize) -> Self {
        Self::InvalidArgument {
            index,
            source: Box::new(self),
        }
    }

    /// Attach an array element position to a conversion failure
    pub fn at_element(self, index: usize) -> Self {
        Self::InvalidElement {
            index,
            source: Box::new(self),
        }
    }
}

impl From<String> for HybridError {
    fn from(s: String) -> Self {
        HybridError::NativeInvocation(s)
    }
}

impl From<&str> for HybridError {
    fn from(s: &str) -> Self {
        HybridError::NativeInvocation(s.to_string())
    }
}

/// Result type for hybrid object operations
pub type HybridResult<T> = std::result::Result<T, HybridError>;

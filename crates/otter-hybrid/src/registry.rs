//! Method and property tables of a hybrid object.
//!
//! Methods, getters and setters live in separate tables whose keyspaces
//! must stay disjoint: a name is either a method or a property. A getter and
//! a setter may share a name, together forming one property.

use std::sync::Weak;

use rustc_hash::FxHashMap;

use crate::config::HybridConfig;
use crate::dispatch::{HostFn, NativeMethod, Typed};
use crate::error::{HybridError, HybridResult, MemberKind};

/// A registered method.
#[derive(Clone)]
pub struct MethodEntry {
    function: HostFn,
    arity: usize,
}

impl MethodEntry {
    pub fn function(&self) -> &HostFn {
        &self.function
    }

    /// Declared parameter count.
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// Registered members of one hybrid object.
///
/// Populated once during setup, read-only afterwards.
#[derive(Default)]
pub struct HybridTables {
    methods: FxHashMap<String, MethodEntry>,
    getters: FxHashMap<String, HostFn>,
    setters: FxHashMap<String, HostFn>,
}

impl HybridTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method.
    ///
    /// Without `override_existing`, fails if any method, getter or setter
    /// already uses `name`. With it, an existing entry is replaced.
    pub fn insert_method(
        &mut self,
        name: &str,
        function: HostFn,
        arity: usize,
        override_existing: bool,
    ) -> HybridResult<()> {
        if !override_existing {
            if self.getters.contains_key(name) {
                return Err(HybridError::name_conflict(name, MemberKind::Method, MemberKind::Getter));
            }
            if self.setters.contains_key(name) {
                return Err(HybridError::name_conflict(name, MemberKind::Method, MemberKind::Setter));
            }
            if self.methods.contains_key(name) {
                return Err(HybridError::name_conflict(name, MemberKind::Method, MemberKind::Method));
            }
        }
        self.methods
            .insert(name.to_string(), MethodEntry { function, arity });
        Ok(())
    }

    /// Add a property getter. Fails if a method or getter uses `name`.
    pub fn insert_getter(&mut self, name: &str, function: HostFn) -> HybridResult<()> {
        if self.getters.contains_key(name) {
            return Err(HybridError::name_conflict(name, MemberKind::Getter, MemberKind::Getter));
        }
        if self.methods.contains_key(name) {
            return Err(HybridError::name_conflict(name, MemberKind::Getter, MemberKind::Method));
        }
        self.getters.insert(name.to_string(), function);
        Ok(())
    }

    /// Add a property setter. Fails if a method or setter uses `name`.
    pub fn insert_setter(&mut self, name: &str, function: HostFn) -> HybridResult<()> {
        if self.setters.contains_key(name) {
            return Err(HybridError::name_conflict(name, MemberKind::Setter, MemberKind::Setter));
        }
        if self.methods.contains_key(name) {
            return Err(HybridError::name_conflict(name, MemberKind::Setter, MemberKind::Method));
        }
        self.setters.insert(name.to_string(), function);
        Ok(())
    }

    pub fn method(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.get(name)
    }

    pub fn getter(&self, name: &str) -> Option<&HostFn> {
        self.getters.get(name)
    }

    pub fn setter(&self, name: &str) -> Option<&HostFn> {
        self.setters.get(name)
    }

    /// Union of all registered names, each once, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .methods
            .keys()
            .chain(self.getters.keys())
            .chain(self.setters.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Total number of entries across the three tables.
    pub fn len(&self) -> usize {
        self.methods.len() + self.getters.len() + self.setters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration API handed to `HybridObject::load_hybrid_methods`.
///
/// Binds every registered member to the object being initialized.
///
/// ```ignore
/// fn load_hybrid_methods(&self, reg: &mut Registrar<'_, Self>) -> HybridResult<()> {
///     reg.register_method("getAge", Self::age)?
///         .register_getter("name", Self::name)?
///         .register_setter("name", Self::set_name)?;
///     Ok(())
/// }
/// ```
pub struct Registrar<'a, T> {
    tables: &'a mut HybridTables,
    instance: Weak<T>,
    config: HybridConfig,
}

impl<'a, T: Send + Sync + 'static> Registrar<'a, T> {
    pub(crate) fn new(tables: &'a mut HybridTables, instance: Weak<T>, config: HybridConfig) -> Self {
        Self {
            tables,
            instance,
            config,
        }
    }

    /// Register a method. Fails with `NameConflict` if the name is taken.
    pub fn register_method<M, F>(&mut self, name: &str, method: F) -> HybridResult<&mut Self>
    where
        F: NativeMethod<T, M>,
    {
        self.method_entry(name, method, false)
    }

    /// Register a method, replacing any existing member with the same name.
    pub fn register_method_override<M, F>(
        &mut self,
        name: &str,
        method: F,
    ) -> HybridResult<&mut Self>
    where
        F: NativeMethod<T, M>,
    {
        self.method_entry(name, method, true)
    }

    /// Register a zero-argument property getter.
    pub fn register_getter<R, F>(&mut self, name: &str, getter: F) -> HybridResult<&mut Self>
    where
        F: NativeMethod<T, Typed<(), R>>,
    {
        let function = getter.into_host_fn(self.instance.clone(), self.config);
        self.tables.insert_getter(name, function)?;
        Ok(self)
    }

    /// Register a one-argument property setter.
    pub fn register_setter<V, R, F>(&mut self, name: &str, setter: F) -> HybridResult<&mut Self>
    where
        F: NativeMethod<T, Typed<(V,), R>>,
    {
        let function = setter.into_host_fn(self.instance.clone(), self.config);
        self.tables.insert_setter(name, function)?;
        Ok(self)
    }

    /// Weak handle to the object being initialized, for hand-written closures.
    pub fn instance(&self) -> Weak<T> {
        self.instance.clone()
    }

    fn method_entry<M, F>(&mut self, name: &str, method: F, override_existing: bool) -> HybridResult<&mut Self>
    where
        F: NativeMethod<T, M>,
    {
        let function = method.into_host_fn(self.instance.clone(), self.config);
        self.tables
            .insert_method(name, function, F::ARITY, override_existing)?;
        Ok(self)
    }
}

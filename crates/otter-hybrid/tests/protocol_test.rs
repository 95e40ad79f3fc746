//! Host object protocol tests
//!
//! Drives a hybrid object the way an engine would: property reads, writes,
//! enumeration and calls through the returned function values.

use std::sync::Arc;

use otter_hybrid::prelude::*;
use otter_hybrid::InitState;
use parking_lot::Mutex;

struct User {
    core: HybridCore,
    name: Mutex<String>,
    age: i32,
}

impl User {
    fn new(name: &str, age: i32) -> Self {
        Self {
            core: HybridCore::new("User"),
            name: Mutex::new(name.to_string()),
            age,
        }
    }

    fn age(&self) -> i32 {
        self.age
    }

    fn name(&self) -> String {
        self.name.lock().clone()
    }

    fn set_name(&self, name: String) {
        *self.name.lock() = name;
    }
}

impl HybridObject for User {
    fn hybrid_core(&self) -> &HybridCore {
        &self.core
    }

    fn load_hybrid_methods(&self, reg: &mut Registrar<'_, Self>) -> HybridResult<()> {
        reg.register_method("getAge", User::age)?
            .register_getter("name", User::name)?
            .register_setter("name", User::set_name)?;
        Ok(())
    }
}

/// Owner of a user, with fallible and panicking methods.
struct Account {
    core: HybridCore,
    owner: String,
}

impl Account {
    fn new(owner: &str) -> Arc<Self> {
        make_hybrid(Self {
            core: HybridCore::new("Account"),
            owner: owner.to_string(),
        })
    }

    fn greet(&self, user: Arc<User>) -> String {
        format!("{} greets {}", self.owner, user.name())
    }

    fn fail(&self) -> Result<i32, String> {
        Err("account is locked".to_string())
    }

    fn crash(&self) -> i32 {
        panic!("native crash")
    }

    fn balance(&self) -> i32 {
        100
    }
}

impl HybridObject for Account {
    fn hybrid_core(&self) -> &HybridCore {
        &self.core
    }

    fn load_hybrid_methods(&self, reg: &mut Registrar<'_, Self>) -> HybridResult<()> {
        reg.register_method("greet", Account::greet)?
            .register_method("fail", Account::fail)?
            .register_method("crash", Account::crash)?
            .register_getter("balance", Account::balance)?;
        Ok(())
    }

    fn describe(&self, _runtime: &Runtime) -> String {
        format!("Account({})", self.owner)
    }
}

fn runtime() -> Runtime {
    Runtime::new(&RuntimeRegistry::new(), "main")
}

fn call(rt: &Runtime, obj: &dyn HostObject, name: &str, args: &[Value]) -> HybridResult<Value> {
    let value = obj.get(rt, name)?;
    let function = value.as_function().expect("property should be a function");
    function.call(rt, &Value::Undefined, args)
}

#[test]
fn test_method_read_and_call() {
    let rt = runtime();
    let user = make_hybrid(User::new("Alice", 23));

    let value = user.get(&rt, "getAge").unwrap();
    let function = value.as_function().unwrap();
    assert_eq!(function.name(), "getAge");
    assert_eq!(function.length(), 0);
    assert_eq!(function.call(&rt, &Value::Undefined, &[]).unwrap(), Value::Number(23.0));
}

#[test]
fn test_property_get_and_set() {
    let rt = runtime();
    let user = make_hybrid(User::new("Alice", 23));

    assert_eq!(user.get(&rt, "name").unwrap(), Value::string("Alice"));
    user.set(&rt, "name", &Value::string("Bob")).unwrap();
    assert_eq!(user.get(&rt, "name").unwrap(), Value::string("Bob"));
    assert_eq!(user.name(), "Bob");
}

#[test]
fn test_set_without_setter_fails() {
    let rt = runtime();
    let user = make_hybrid(User::new("Alice", 23));

    let err = user.set(&rt, "unknown", &Value::Number(1.0)).unwrap_err();
    assert!(matches!(err, HybridError::NoSuchSetter(ref name) if name == "unknown"));

    let err = user.set(&rt, "getAge", &Value::Number(1.0)).unwrap_err();
    assert!(matches!(err, HybridError::NoSuchSetter(_)));
}

#[test]
fn test_setter_conversion_error() {
    let rt = runtime();
    let user = make_hybrid(User::new("Alice", 23));

    let err = user.set(&rt, "name", &Value::Number(5.0)).unwrap_err();
    assert!(matches!(err, HybridError::InvalidArgument { index: 0, .. }));
    assert_eq!(user.name(), "Alice");
}

#[test]
fn test_missing_property_is_undefined() {
    let rt = runtime();
    let user = make_hybrid(User::new("Alice", 23));
    assert_eq!(user.get(&rt, "doesNotExist").unwrap(), Value::Undefined);
}

#[test]
fn test_property_names() {
    let rt = runtime();
    let user = make_hybrid(User::new("Alice", 23));

    let names = user.property_names(&rt).unwrap();
    let names: Vec<&str> = names.iter().map(PropertyKey::as_str).collect();
    assert_eq!(names, vec!["getAge", "name"]);
}

#[test]
fn test_to_string_builtin() {
    let rt = runtime();
    let user = make_hybrid(User::new("Alice", 23));

    let text = call(&rt, &*user, "toString", &[]).unwrap();
    let expected = format!("[HybridObject User#{}]", user.hybrid_core().instance_id());
    assert_eq!(text, Value::String(expected));
    assert_eq!(user.to_js_string(&rt), user.describe(&rt));

    let names = user.property_names(&rt).unwrap();
    assert!(!names.iter().any(|key| key.as_str() == "toString"));
}

#[test]
fn test_hybrid_object_as_argument() {
    let rt = runtime();
    let account = Account::new("Alice");
    let bob = make_hybrid(User::new("Bob", 31));

    let result = call(&rt, &*account, "greet", &[Value::object(bob.clone())]).unwrap();
    assert_eq!(result, Value::string("Alice greets Bob"));

    let err = call(&rt, &*account, "greet", &[Value::string("Bob")]).unwrap_err();
    assert!(matches!(err, HybridError::InvalidArgument { index: 0, .. }));
}

#[test]
fn test_object_value_round_trip() {
    let rt = runtime();
    let user = make_hybrid(User::new("Alice", 23));

    let value = Value::object(user.clone());
    let back = <Arc<User> as FromJs>::from_js(&rt, &value).unwrap();
    assert!(Arc::ptr_eq(&user, &back));
}

#[test]
fn test_native_errors_surface_as_exceptions() {
    let rt = runtime();
    let account = Account::new("Alice");

    let err = call(&rt, &*account, "fail", &[]).unwrap_err();
    assert_eq!(err.to_string(), "account is locked");

    let err = call(&rt, &*account, "crash", &[]).unwrap_err();
    assert!(matches!(err, HybridError::NativeInvocation(ref msg) if msg.contains("native crash")));

    // The object stays usable after a captured panic.
    assert_eq!(account.get(&rt, "balance").unwrap(), Value::Number(100.0));
}

#[test]
fn test_describe_override() {
    let rt = runtime();
    let account = Account::new("Alice");
    let text = call(&rt, &*account, "toString", &[]).unwrap();
    assert_eq!(text, Value::string("Account(Alice)"));
}

#[test]
fn test_shared_handle() {
    let user = make_hybrid(User::new("Alice", 23));
    let shared = user.shared().unwrap();
    assert!(Arc::ptr_eq(&user, &shared));
}

#[test]
fn test_object_outside_factory_is_rejected() {
    let rt = runtime();
    let user = User::new("Alice", 23);

    assert!(matches!(user.shared(), Err(HybridError::NotShared)));
    assert!(matches!(user.get(&rt, "name"), Err(HybridError::NotShared)));
    assert_eq!(user.hybrid_core().init_state(), InitState::Uninitialized);
}

#[test]
fn test_setup_is_lazy_and_records_runtime() {
    let registry = RuntimeRegistry::new();
    let rt = Runtime::new(&registry, "main");
    let user = make_hybrid(User::new("Alice", 23));

    assert_eq!(user.hybrid_core().init_state(), InitState::Uninitialized);
    assert!(!user.is_runtime_alive());

    user.get(&rt, "name").unwrap();
    assert_eq!(user.hybrid_core().init_state(), InitState::Initialized);
    assert!(user.is_runtime_alive());
    assert_eq!(user.hybrid_core().creation_runtime().unwrap().id(), rt.id());

    drop(rt);
    assert!(!user.is_runtime_alive());
}

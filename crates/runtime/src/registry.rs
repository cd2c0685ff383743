//! Process-global [`Registry`] (§4.D): shard constructors, enum/object type
//! tables, named global wires, run-loop/exit callbacks, and an observer list
//! notified on every registration for late binding.

use crate::event::EventDispatcher;
use crate::shard::Shard;
use crate::wire::Wire;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};

pub type ShardConstructor = fn() -> Box<dyn Shard>;

#[derive(Debug, Clone)]
pub struct ObjectTypeInfo {
    pub vendor: u32,
    pub type_id: u32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EnumTypeInfo {
    pub vendor: u32,
    pub type_id: u32,
    pub name: String,
}

pub type RunLoopCallback = fn();
pub type ExitCallback = fn();

/// Notified every time a shard constructor is registered, so a component
/// that registered early (e.g. a bound language runtime) can bind late
/// arrivals without polling.
pub trait RegistrationObserver: Send + Sync {
    fn on_shard_registered(&self, name: &str);
}

#[derive(Default)]
struct RegistryInner {
    shards: HashMap<String, ShardConstructor>,
    object_types: HashMap<u64, ObjectTypeInfo>,
    object_types_by_name: HashMap<String, u64>,
    enum_types: HashMap<u64, EnumTypeInfo>,
    enum_types_by_name: HashMap<String, u64>,
    run_loop_callbacks: Vec<RunLoopCallback>,
    exit_callbacks: Vec<ExitCallback>,
    global_wires: HashMap<String, Arc<Wire>>,
    observers: Vec<Weak<dyn RegistrationObserver>>,
}

/// Process-wide registry, initialised on first use (§4.D, §9 "Global
/// state"). `Registry::global()` is the only constructor — there is exactly
/// one per process, mirroring the teacher's own init-on-first-use statics.
pub struct Registry {
    inner: Mutex<RegistryInner>,
    pub dispatcher: EventDispatcher<String>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

impl Registry {
    pub fn global() -> &'static Registry {
        REGISTRY.get_or_init(|| Registry { inner: Mutex::new(RegistryInner::default()), dispatcher: EventDispatcher::new() })
    }

    /// Idempotent-overwrite: re-registering a name replaces the constructor
    /// and logs a warning rather than erroring (§4.D contract).
    pub fn register_shard(&self, name: impl Into<String>, ctor: ShardConstructor) {
        let name = name.into();
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        if inner.shards.insert(name.clone(), ctor).is_some() {
            tracing::warn!(shard = %name, "re-registering shard constructor, overwriting previous");
        }
        let observers = inner.observers.clone();
        drop(inner);
        for observer in observers.iter().filter_map(Weak::upgrade) {
            observer.on_shard_registered(&name);
        }
        self.dispatcher.fire(&name);
    }

    pub fn construct_shard(&self, name: &str) -> Option<Box<dyn Shard>> {
        let inner = self.inner.lock().expect("registry mutex poisoned");
        inner.shards.get(name).map(|ctor| ctor())
    }

    pub fn shard_names(&self) -> Vec<String> {
        self.inner.lock().expect("registry mutex poisoned").shards.keys().cloned().collect()
    }

    pub fn register_object_type(&self, vendor: u32, type_id: u32, name: impl Into<String>) {
        let name = name.into();
        let key = object_key(vendor, type_id);
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        if inner.object_types.contains_key(&key) {
            tracing::warn!(vendor, type_id, %name, "re-registering object type, overwriting previous");
        }
        inner.object_types_by_name.insert(name.clone(), key);
        inner.object_types.insert(key, ObjectTypeInfo { vendor, type_id, name });
    }

    pub fn lookup_object_type(&self, vendor: u32, type_id: u32) -> Option<ObjectTypeInfo> {
        self.inner.lock().expect("registry mutex poisoned").object_types.get(&object_key(vendor, type_id)).cloned()
    }

    pub fn lookup_object_type_by_name(&self, name: &str) -> Option<ObjectTypeInfo> {
        let inner = self.inner.lock().expect("registry mutex poisoned");
        inner.object_types_by_name.get(name).and_then(|key| inner.object_types.get(key)).cloned()
    }

    pub fn register_enum_type(&self, vendor: u32, type_id: u32, name: impl Into<String>) {
        let name = name.into();
        let key = object_key(vendor, type_id);
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        if inner.enum_types.contains_key(&key) {
            tracing::warn!(vendor, type_id, %name, "re-registering enum type, overwriting previous");
        }
        inner.enum_types_by_name.insert(name.clone(), key);
        inner.enum_types.insert(key, EnumTypeInfo { vendor, type_id, name });
    }

    pub fn lookup_enum_type(&self, vendor: u32, type_id: u32) -> Option<EnumTypeInfo> {
        self.inner.lock().expect("registry mutex poisoned").enum_types.get(&object_key(vendor, type_id)).cloned()
    }

    pub fn register_global_wire(&self, name: impl Into<String>, wire: Arc<Wire>) {
        let name = name.into();
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        if inner.global_wires.insert(name.clone(), wire).is_some() {
            tracing::warn!(wire = %name, "re-registering global wire, overwriting previous");
        }
    }

    pub fn lookup_global_wire(&self, name: &str) -> Option<Arc<Wire>> {
        self.inner.lock().expect("registry mutex poisoned").global_wires.get(name).cloned()
    }

    pub fn add_run_loop_callback(&self, callback: RunLoopCallback) {
        self.inner.lock().expect("registry mutex poisoned").run_loop_callbacks.push(callback);
    }

    pub fn add_exit_callback(&self, callback: ExitCallback) {
        self.inner.lock().expect("registry mutex poisoned").exit_callbacks.push(callback);
    }

    /// Runs every registered run-loop callback once, in registration order.
    pub fn run_loop_tick(&self) {
        let callbacks = self.inner.lock().expect("registry mutex poisoned").run_loop_callbacks.clone();
        for callback in callbacks {
            callback();
        }
    }

    /// Runs every registered exit callback, in registration order (§9).
    pub fn run_exit_callbacks(&self) {
        let callbacks = self.inner.lock().expect("registry mutex poisoned").exit_callbacks.clone();
        for callback in callbacks {
            callback();
        }
    }

    /// Subscribes a weak observer; expired observers are pruned lazily the
    /// next time a shard is registered and the weak upgrade fails.
    pub fn subscribe_observer(&self, observer: Weak<dyn RegistrationObserver>) {
        self.inner.lock().expect("registry mutex poisoned").observers.push(observer);
    }
}

fn object_key(vendor: u32, type_id: u32) -> u64 {
    (u64::from(vendor) << 32) | u64::from(type_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::ActivationError;
    use loom_core::{Type, Value};
    use serial_test::serial;

    struct Noop;
    impl Shard for Noop {
        fn name(&self) -> &str {
            "Noop"
        }
        fn input_types(&self) -> Vec<Type> {
            vec![]
        }
        fn output_types(&self) -> Vec<Type> {
            vec![]
        }
        fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
            Ok(input.clone())
        }
    }

    fn make_noop() -> Box<dyn Shard> {
        Box::new(Noop)
    }

    #[test]
    #[serial]
    fn register_and_construct_shard_round_trips() {
        let registry = Registry::global();
        registry.register_shard("test.Noop", make_noop);
        let shard = registry.construct_shard("test.Noop").expect("shard should be registered");
        assert_eq!(shard.name(), "Noop");
    }

    #[test]
    #[serial]
    fn re_registering_a_name_overwrites_without_erroring() {
        let registry = Registry::global();
        registry.register_shard("test.Dup", make_noop);
        registry.register_shard("test.Dup", make_noop);
        assert!(registry.construct_shard("test.Dup").is_some());
    }

    #[test]
    #[serial]
    fn object_type_lookup_by_id_and_name_agree() {
        let registry = Registry::global();
        registry.register_object_type(7, 3, "test.Thing");
        let by_id = registry.lookup_object_type(7, 3).unwrap();
        let by_name = registry.lookup_object_type_by_name("test.Thing").unwrap();
        assert_eq!(by_id.name, by_name.name);
    }
}

//! The bridge: construction, dispatch and lifecycle of native objects.
//!
//! A [`Bridge`] is assembled once through a [`BridgeBuilder`] and is
//! immutable afterwards apart from its live-handle table. All entry points
//! take `&self`, so one bridge can be shared across threads; calls on the
//! same object are serialized by that object's lock.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::handle::{lock_object, HandleState, HandleTable, NativeHandle, ObjectSlot};
use crate::marshal::marshal_in;
use crate::metrics::{BridgeMetrics, BridgeStats, DispatchTimer, ReleaseCause};
use crate::modules::console::{self, ConsoleSink};
use crate::modules::file;
use crate::registry::{MethodTable, Module, NativeFunction, TypeDefinition, TypeRegistry};
use crate::shape::Shape;
use crate::value::{MapKey, MarshaledValue};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// One-shot registration phase of a bridge
pub struct BridgeBuilder {
    config: BridgeConfig,
    registry: TypeRegistry,
}

impl BridgeBuilder {
    /// Start a builder with the given configuration
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            registry: TypeRegistry::default(),
        }
    }

    /// Register a native type under its own name
    pub fn register_type<T: Any + Send>(mut self, definition: TypeDefinition<T>) -> Result<Self> {
        let name = definition.name().to_string();
        debug!(type_name = %name, "Registering native type");
        self.registry.register_type(definition.into_descriptor(name))?;
        Ok(self)
    }

    /// Register a free function
    pub fn register_function(mut self, function: NativeFunction) -> Result<Self> {
        debug!(function = %function.name(), "Registering native function");
        self.registry.register_function(function)?;
        Ok(self)
    }

    /// Register every type and function of a module
    pub fn register_module(mut self, module: Module) -> Result<Self> {
        debug!(module = %module.name(), "Registering native module");
        let (types, functions) = module.into_parts();
        for descriptor in types {
            self.registry.register_type(descriptor)?;
        }
        for function in functions {
            self.registry.register_function(function)?;
        }
        Ok(self)
    }

    /// Register the `console` and `file` modules
    pub fn with_builtins(self, sink: Arc<dyn ConsoleSink>) -> Result<Self> {
        let file_root = self.config.file_root.clone();
        self.register_module(console::module(sink))?
            .register_module(file::module(file_root))
    }

    /// Validate the configuration and freeze the registry
    pub fn build(self) -> Result<Bridge> {
        self.config.validate()?;

        let id = Uuid::new_v4();
        info!(
            bridge = %id,
            types = self.registry.type_names().len(),
            functions = self.registry.function_names().len(),
            max_live_handles = self.config.max_live_handles,
            "Initializing native bridge"
        );

        Ok(Bridge {
            id,
            handles: HandleTable::new(self.config.max_live_handles),
            config: self.config,
            registry: self.registry,
            metrics: BridgeMetrics::new(),
            shut_down: AtomicBool::new(false),
        })
    }
}

/// The native-object bridge
pub struct Bridge {
    /// Bridge identity, stamped on every handle it issues
    id: Uuid,
    /// Bridge configuration
    config: BridgeConfig,
    /// Frozen type and function registry
    registry: TypeRegistry,
    /// Live native objects
    handles: HandleTable,
    /// Metrics collector
    metrics: BridgeMetrics,
    shut_down: AtomicBool,
}

impl Bridge {
    /// Start building a bridge
    pub fn builder(config: BridgeConfig) -> BridgeBuilder {
        BridgeBuilder::new(config)
    }

    /// Bridge identity
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Registered types and functions
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Construct a native object of a registered type
    #[instrument(skip(self, args), fields(argc = args.len()))]
    pub fn construct(&self, type_name: &str, args: &[MarshaledValue]) -> Result<NativeHandle> {
        let result = self.construct_inner(type_name, args);
        self.track(result)
    }

    fn construct_inner(&self, type_name: &str, args: &[MarshaledValue]) -> Result<NativeHandle> {
        self.ensure_running()?;
        let unknown = || BridgeError::UnknownConstructor {
            name: type_name.to_string(),
        };
        let descriptor = self.registry.type_descriptor(type_name).ok_or_else(unknown)?;
        let factory = descriptor.factory.as_ref().ok_or_else(unknown)?;
        factory.signature.check(type_name, args.len())?;

        let reservation = self.handles.reserve()?;
        let state = (factory.create)(args)?;
        let id = reservation.fill(state);
        self.metrics.record_construct();
        debug!(handle = %id, "Constructed native object");

        Ok(NativeHandle::new(id, type_name, self.id))
    }

    /// Invoke a method on a live object
    #[instrument(skip(self, handle, args), fields(handle = %handle, argc = args.len()))]
    pub fn invoke(
        &self,
        handle: &NativeHandle,
        method: &str,
        args: &[MarshaledValue],
    ) -> Result<MarshaledValue> {
        let result = self.invoke_inner(handle, method, args);
        self.track(result)
    }

    fn invoke_inner(
        &self,
        handle: &NativeHandle,
        method: &str,
        args: &[MarshaledValue],
    ) -> Result<MarshaledValue> {
        let table = self.table_for(handle)?;
        let entry = table.method(method).ok_or_else(|| BridgeError::UnknownMethod {
            type_name: handle.type_name().to_string(),
            method: method.to_string(),
        })?;
        let slot = self.live_slot(handle)?;
        let callee = format!("{}.{}", handle.type_name(), method);
        entry.signature.check(&callee, args.len())?;

        let timer = DispatchTimer::start();
        let value = {
            let mut object = lock_object(&slot, handle)?;
            (entry.call)(&mut *object.state, args)?
        };
        self.metrics.record_invocation(&callee, timer.elapsed());

        if entry.closing {
            self.release_with(handle, ReleaseCause::Closed);
        }
        Ok(value)
    }

    /// Read a property of a live object
    #[instrument(skip(self, handle), fields(handle = %handle))]
    pub fn get(&self, handle: &NativeHandle, property: &str) -> Result<MarshaledValue> {
        let result = self.get_inner(handle, property);
        self.track(result)
    }

    fn get_inner(&self, handle: &NativeHandle, property: &str) -> Result<MarshaledValue> {
        let table = self.table_for(handle)?;
        let entry = table
            .property(property)
            .ok_or_else(|| Self::unknown_member(handle, property))?;
        let slot = self.live_slot(handle)?;

        let timer = DispatchTimer::start();
        let value = {
            let object = lock_object(&slot, handle)?;
            (entry.getter)(&*object.state)?
        };
        self.metrics
            .record_invocation(&format!("{}.{}", handle.type_name(), property), timer.elapsed());
        Ok(value)
    }

    /// Write a property of a live object
    #[instrument(skip(self, handle, value), fields(handle = %handle))]
    pub fn set(&self, handle: &NativeHandle, property: &str, value: &MarshaledValue) -> Result<()> {
        let result = self.set_inner(handle, property, value);
        self.track(result)
    }

    fn set_inner(&self, handle: &NativeHandle, property: &str, value: &MarshaledValue) -> Result<()> {
        let table = self.table_for(handle)?;
        let entry = table
            .property(property)
            .ok_or_else(|| Self::unknown_member(handle, property))?;
        let setter = entry
            .setter
            .as_ref()
            .ok_or_else(|| BridgeError::ReadOnlyProperty {
                type_name: handle.type_name().to_string(),
                property: property.to_string(),
            })?;
        let slot = self.live_slot(handle)?;

        let timer = DispatchTimer::start();
        {
            let mut object = lock_object(&slot, handle)?;
            setter(&mut *object.state, value)
                .map_err(|e| e.at(format!("{}.{}", handle.type_name(), property)))?;
        }
        self.metrics
            .record_invocation(&format!("{}.{}", handle.type_name(), property), timer.elapsed());
        Ok(())
    }

    /// Call a registered free function
    #[instrument(skip(self, args), fields(argc = args.len()))]
    pub fn call(&self, function: &str, args: &[MarshaledValue]) -> Result<MarshaledValue> {
        let result = self.call_inner(function, args);
        self.track(result)
    }

    fn call_inner(&self, function: &str, args: &[MarshaledValue]) -> Result<MarshaledValue> {
        self.ensure_running()?;
        let entry = self
            .registry
            .function(function)
            .ok_or_else(|| BridgeError::UnknownFunction {
                name: function.to_string(),
            })?;
        entry.signature.check(function, args.len())?;

        let timer = DispatchTimer::start();
        let value = (entry.call)(self, args)?;
        self.metrics.record_function_call(function, timer.elapsed());
        Ok(value)
    }

    /// Release a handle; returns false if it was already released
    pub fn release(&self, handle: &NativeHandle) -> bool {
        self.release_with(handle, ReleaseCause::Explicit)
    }

    /// Host garbage-collector hook: the script object wrapping `handle` is gone
    pub fn reclaim(&self, handle: &NativeHandle) -> bool {
        self.release_with(handle, ReleaseCause::Reclaimed)
    }

    fn release_with(&self, handle: &NativeHandle, cause: ReleaseCause) -> bool {
        if handle.bridge_id() != self.id {
            warn!(handle = %handle, "Ignoring release of a handle issued by another bridge");
            return false;
        }
        match self.handles.remove(handle.id()) {
            Some(slot) => {
                drop(slot);
                self.metrics.record_release(cause, 1);
                debug!(handle = %handle, cause = ?cause, "Released native object");
                true
            }
            None => false,
        }
    }

    /// Lifecycle state of a handle
    pub fn state(&self, handle: &NativeHandle) -> HandleState {
        if handle.bridge_id() == self.id && self.handles.contains(handle.id()) {
            HandleState::Live
        } else {
            HandleState::Released
        }
    }

    /// Run `f` against the native state behind `handle`.
    ///
    /// Waits while another thread is inside a call on the object. Borrowing
    /// an object this thread is already inside fails with `Reentrant`.
    pub fn with_object<T: Any, R>(
        &self,
        handle: &NativeHandle,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R> {
        let slot = self.live_slot(handle)?;
        let mut object = lock_object(&slot, handle)?;
        let state = object.state.downcast_mut::<T>().ok_or_else(|| {
            BridgeError::type_mismatch(
                std::any::type_name::<T>(),
                format!("Handle<{}>", handle.type_name()),
            )
        })?;
        Ok(f(state))
    }

    /// Marshal a handle argument that must be live and of `type_name`
    pub fn expect_handle(&self, value: &MarshaledValue, type_name: &str) -> Result<NativeHandle> {
        let value = marshal_in(value, &Shape::handle_of(type_name))?;
        let handle = value
            .as_handle()
            .cloned()
            .ok_or_else(|| BridgeError::type_mismatch(format!("Handle<{}>", type_name), value.kind()))?;
        self.live_slot(&handle)?;
        Ok(handle)
    }

    /// Snapshot every property of a live object as a string-keyed map
    pub fn json_object(&self, handle: &NativeHandle) -> Result<MarshaledValue> {
        let result = self.json_object_inner(handle);
        self.track(result)
    }

    fn json_object_inner(&self, handle: &NativeHandle) -> Result<MarshaledValue> {
        let table = self.table_for(handle)?;
        let slot = self.live_slot(handle)?;
        let object = lock_object(&slot, handle)?;
        let mut fields = BTreeMap::new();
        for name in table.property_names() {
            if let Some(entry) = table.property(name) {
                let value = (entry.getter)(&*object.state)?;
                fields.insert(MapKey::Str(name.to_string()), value);
            }
        }
        Ok(MarshaledValue::Map(fields))
    }

    /// Number of live handles
    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    /// Bridge statistics
    pub fn stats(&self) -> BridgeStats {
        self.metrics.snapshot(self.handles.len())
    }

    /// Prometheus-format metrics
    pub fn prometheus_metrics(&self) -> String {
        self.metrics.to_prometheus(self.handles.len())
    }

    /// Check whether the bridge has been shut down
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop accepting construct and call requests and release live objects.
    ///
    /// Returns the number of objects released; later calls return 0.
    pub fn shutdown(&self) -> usize {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return 0;
        }
        info!(bridge = %self.id, live = self.handles.len(), "Shutting down native bridge");
        if !self.config.release_on_shutdown {
            return 0;
        }
        let released = self.handles.drain();
        self.metrics
            .record_release(ReleaseCause::Shutdown, released as u64);
        info!(released = released, "Native bridge shut down");
        released
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(BridgeError::Shutdown);
        }
        Ok(())
    }

    fn table_for(&self, handle: &NativeHandle) -> Result<Arc<MethodTable>> {
        if handle.bridge_id() != self.id {
            return Err(BridgeError::invalid_state(handle, "issued by another bridge"));
        }
        self.registry
            .type_descriptor(handle.type_name())
            .map(|descriptor| Arc::clone(descriptor.methods()))
            .ok_or_else(|| BridgeError::invalid_state(handle, "type is not registered"))
    }

    fn live_slot(&self, handle: &NativeHandle) -> Result<ObjectSlot> {
        if handle.bridge_id() != self.id {
            return Err(BridgeError::invalid_state(handle, "issued by another bridge"));
        }
        self.handles
            .get(handle.id())
            .ok_or_else(|| BridgeError::invalid_state(handle, "handle has been released"))
    }

    fn unknown_member(handle: &NativeHandle, member: &str) -> BridgeError {
        BridgeError::UnknownMethod {
            type_name: handle.type_name().to_string(),
            method: member.to_string(),
        }
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.metrics.record_error(e.code());
            warn!(code = %e.code(), error = %e, "Call rejected");
        }
        result
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, NativeError};
    use std::time::Duration;

    static SLOW_CALL_ENTERED: AtomicBool = AtomicBool::new(false);

    struct Counter {
        value: i32,
    }

    fn counter_type() -> TypeDefinition<Counter> {
        TypeDefinition::<Counter>::new("MyObject")
            .constructor(|(start,): (i32,)| Ok(Counter { value: start }))
            .method("plusOne", |this: &mut Counter, (): ()| {
                this.value += 1;
                Ok(this.value)
            })
            .method("fail", |_this: &mut Counter, (): ()| -> std::result::Result<(), NativeError> {
                Err(NativeError::new("Boom", "native failure"))
            })
            .property("value", |this: &Counter| this.value, |this: &mut Counter, v: i32| this.value = v)
            .readonly_property("doubled", |this: &Counter| this.value * 2)
            .method("slowPlusOne", |this: &mut Counter, (ms,): (u64,)| {
                SLOW_CALL_ENTERED.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(ms));
                this.value += 1;
                Ok(this.value)
            })
    }

    fn create_bridge() -> Bridge {
        Bridge::builder(BridgeConfig::default())
            .register_type(counter_type())
            .unwrap()
            .register_function(NativeFunction::new("add", |_: &Bridge, (a, b): (i32, i32)| Ok(a + b)))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_construct_and_invoke() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[10.into()]).unwrap();
        assert_eq!(bridge.invoke(&h, "plusOne", &[]).unwrap(), MarshaledValue::Int32(11));
        assert_eq!(bridge.invoke(&h, "plusOne", &[]).unwrap(), MarshaledValue::Int32(12));
        assert_eq!(bridge.live_handles(), 1);
    }

    #[test]
    fn test_unknown_constructor() {
        let bridge = create_bridge();
        let err = bridge.construct("Nope", &[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownConstructor);
        assert_eq!(bridge.live_handles(), 0);
    }

    #[test]
    fn test_constructor_arity() {
        let bridge = create_bridge();
        let err = bridge.construct("MyObject", &[1.into(), 2.into()]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ArityMismatch);
    }

    #[test]
    fn test_constructor_argument_type() {
        let bridge = create_bridge();
        let err = bridge.construct("MyObject", &["ten".into()]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
        assert!(err.to_string().starts_with("argument 1"));
        assert_eq!(bridge.live_handles(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[0.into()]).unwrap();
        assert!(bridge.release(&h));
        assert!(!bridge.release(&h));
        assert_eq!(bridge.state(&h), HandleState::Released);

        let err = bridge.invoke(&h, "plusOne", &[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
        let err = bridge.invoke(&h, "doesNotExist", &[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownMethod);
    }

    #[test]
    fn test_native_error_passes_through() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[0.into()]).unwrap();
        let err = bridge.invoke(&h, "fail", &[]).unwrap_err();
        let script = err.to_script_error();
        assert_eq!(script.code, ErrorCode::Native);
        assert_eq!(script.message, "native failure");
        assert_eq!(script.native_kind.as_deref(), Some("Boom"));
        // Object stays usable after a native failure
        assert_eq!(bridge.state(&h), HandleState::Live);
    }

    #[test]
    fn test_properties() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[4.into()]).unwrap();
        bridge.set(&h, "value", &20.into()).unwrap();
        assert_eq!(bridge.get(&h, "value").unwrap(), MarshaledValue::Int32(20));
        assert_eq!(bridge.get(&h, "doubled").unwrap(), MarshaledValue::Int32(40));

        let err = bridge.set(&h, "doubled", &1.into()).unwrap_err();
        assert!(matches!(err, BridgeError::ReadOnlyProperty { .. }));
        let err = bridge.set(&h, "value", &"x".into()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_json_object() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[3.into()]).unwrap();
        let snapshot = bridge.json_object(&h).unwrap();
        assert_eq!(
            snapshot,
            MarshaledValue::map_of([("doubled", 6), ("value", 3)])
        );
    }

    #[test]
    fn test_function_call() {
        let bridge = create_bridge();
        assert_eq!(bridge.call("add", &[2.into(), 3.into()]).unwrap(), MarshaledValue::Int32(5));
        let err = bridge.call("missing", &[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownMethod);
    }

    #[test]
    fn test_foreign_handle() {
        let a = create_bridge();
        let b = create_bridge();
        let h = a.construct("MyObject", &[0.into()]).unwrap();
        let err = b.invoke(&h, "plusOne", &[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
        assert!(!b.release(&h));
        assert_eq!(a.state(&h), HandleState::Live);
    }

    #[test]
    fn test_handle_limit() {
        let bridge = Bridge::builder(BridgeConfig::default().with_max_live_handles(1))
            .register_type(counter_type())
            .unwrap()
            .build()
            .unwrap();
        let h = bridge.construct("MyObject", &[0.into()]).unwrap();
        let err = bridge.construct("MyObject", &[0.into()]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::HandleLimit);
        bridge.release(&h);
        assert!(bridge.construct("MyObject", &[0.into()]).is_ok());
    }

    #[test]
    fn test_with_object() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[5.into()]).unwrap();
        let value = bridge.with_object(&h, |c: &mut Counter| c.value).unwrap();
        assert_eq!(value, 5);
        let err = bridge.with_object(&h, |s: &mut String| s.len()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_with_object_waits_for_call_on_other_thread() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[5.into()]).unwrap();

        std::thread::scope(|scope| {
            let worker = scope.spawn(|| bridge.invoke(&h, "slowPlusOne", &[200.into()]));
            while !SLOW_CALL_ENTERED.load(Ordering::SeqCst) {
                std::thread::yield_now();
            }

            let seen = bridge.with_object(&h, |c: &mut Counter| c.value).unwrap();
            assert_eq!(seen, 6);
            assert_eq!(worker.join().unwrap().unwrap(), MarshaledValue::Int32(6));
        });
        assert_eq!(bridge.state(&h), HandleState::Live);
    }

    #[test]
    fn test_reentrant_access_is_rejected() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[5.into()]).unwrap();

        let inner = bridge
            .with_object(&h, |_: &mut Counter| bridge.invoke(&h, "plusOne", &[]))
            .unwrap();
        assert_eq!(inner.unwrap_err().code(), ErrorCode::Reentrant);

        assert_eq!(bridge.invoke(&h, "plusOne", &[]).unwrap(), MarshaledValue::Int32(6));
    }

    #[test]
    fn test_concurrent_construct_respects_limit() {
        let bridge = Bridge::builder(BridgeConfig::default().with_max_live_handles(8))
            .register_type(counter_type())
            .unwrap()
            .build()
            .unwrap();

        let built: usize = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        (0..10)
                            .filter(|_| bridge.construct("MyObject", &[0.into()]).is_ok())
                            .count()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).sum()
        });
        assert_eq!(built, 8);
        assert_eq!(bridge.live_handles(), 8);
    }

    #[test]
    fn test_expect_handle() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[5.into()]).unwrap();
        let value = MarshaledValue::Handle(h.clone());
        assert_eq!(bridge.expect_handle(&value, "MyObject").unwrap(), h);
        assert!(bridge.expect_handle(&value, "Other").is_err());
    }

    #[test]
    fn test_shutdown() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[0.into()]).unwrap();
        assert_eq!(bridge.shutdown(), 1);
        assert_eq!(bridge.shutdown(), 0);
        assert_eq!(bridge.construct("MyObject", &[0.into()]).unwrap_err().code(), ErrorCode::Shutdown);
        assert_eq!(bridge.invoke(&h, "plusOne", &[]).unwrap_err().code(), ErrorCode::InvalidState);
    }

    #[test]
    fn test_duplicate_type_registration() {
        let result = Bridge::builder(BridgeConfig::default())
            .register_type(counter_type())
            .unwrap()
            .register_type(counter_type());
        assert!(matches!(result, Err(BridgeError::DuplicateRegistration { .. })));
    }

    #[test]
    fn test_stats() {
        let bridge = create_bridge();
        let h = bridge.construct("MyObject", &[0.into()]).unwrap();
        bridge.invoke(&h, "plusOne", &[]).unwrap();
        let _ = bridge.invoke(&h, "plusOne", &[1.into()]);
        bridge.reclaim(&h);

        let stats = bridge.stats();
        assert_eq!(stats.constructed, 1);
        assert_eq!(stats.invocations, 1);
        assert_eq!(stats.reclaimed, 1);
        assert_eq!(stats.live_handles, 0);
        assert_eq!(stats.errors["ARITY_MISMATCH"], 1);
    }
}

//! Execution contexts
//!
//! One context per running resource. A context owns everything the bridge
//! caches for that resource: wrappers, binding module records, factory
//! overrides, exports, globals and event handlers. Script code of a context
//! runs under its re-entrant runtime lock; the caches use their own short
//! lived locks, never held while script code runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use void_native::{
    BaseObject, MetaNamespace, NativeEngine, NativeFunction, NativeValue, ObjectKey, ObjectType,
};

use crate::args::FunctionArgs;
use crate::binding::{
    self, BindingCatalog, BindingScope, InitializeReport, ModuleCache, ModuleNamespace,
    ModuleStatus,
};
use crate::class::{ClassTemplate, PropertyContext};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::event::EventHandlers;
use crate::export::ExportTable;
use crate::factory::{self, FactoryTable};
use crate::marshal;
use crate::meta::{DynamicProperty, MetaAccessor};
use crate::object::{IdentityRegistry, ScriptObject};
use crate::value::{ScriptFunction, ScriptValue};

/// Unique identifier for an execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// Lifecycle of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Bindings are initializing
    Starting,
    /// Running resource code
    Started,
    /// Torn down; every cross-boundary call is a no-op
    Stopped,
}

impl ContextState {
    /// Whether script code may run
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Started)
    }
}

struct ContextInner {
    id: ContextId,
    resource_name: String,
    state: RwLock<ContextState>,
    runtime: ReentrantMutex<()>,

    engine: Arc<dyn NativeEngine>,
    catalog: Arc<BindingCatalog>,
    config: Arc<BridgeConfig>,

    globals: RwLock<HashMap<String, ScriptValue>>,
    registry: IdentityRegistry,
    modules: ModuleCache,
    factories: FactoryTable,
    exports: ExportTable,
    events: EventHandlers,
}

/// Handle to one resource's script execution context
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

/// Non-owning handle to an execution context
#[derive(Clone)]
pub struct WeakContext {
    inner: Weak<ContextInner>,
}

impl WeakContext {
    pub fn upgrade(&self) -> Option<ExecutionContext> {
        self.inner.upgrade().map(|inner| ExecutionContext { inner })
    }
}

impl ExecutionContext {
    /// Create a context in the `Starting` state
    pub fn new(
        id: ContextId,
        resource_name: impl Into<String>,
        engine: Arc<dyn NativeEngine>,
        catalog: Arc<BindingCatalog>,
        config: Arc<BridgeConfig>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                resource_name: resource_name.into(),
                state: RwLock::new(ContextState::Starting),
                runtime: ReentrantMutex::new(()),
                engine,
                catalog,
                config,
                globals: RwLock::new(HashMap::new()),
                registry: IdentityRegistry::new(id),
                modules: ModuleCache::new(),
                factories: FactoryTable::new(),
                exports: ExportTable::new(),
                events: EventHandlers::new(),
            }),
        }
    }

    // ========== Identity / lifecycle ==========

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn resource_name(&self) -> &str {
        &self.inner.resource_name
    }

    pub fn state(&self) -> ContextState {
        *self.inner.state.read()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn engine(&self) -> &Arc<dyn NativeEngine> {
        &self.inner.engine
    }

    pub fn catalog(&self) -> &BindingCatalog {
        &self.inner.catalog
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub(crate) fn modules(&self) -> &ModuleCache {
        &self.inner.modules
    }

    pub fn downgrade(&self) -> WeakContext {
        WeakContext {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same context
    pub fn ptr_eq(&self, other: &ExecutionContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Acquire the runtime lock; re-entrant on the same thread
    pub fn lock_runtime(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.runtime.lock()
    }

    pub(crate) fn mark_started(&self) {
        *self.inner.state.write() = ContextState::Started;
    }

    /// Tear the context down
    ///
    /// Waits for in-flight script calls, then drops every cache. Marshalled
    /// functions that outlive the context return `None` from then on.
    pub fn stop(&self) {
        let _runtime = self.lock_runtime();
        {
            let mut state = self.inner.state.write();
            if *state == ContextState::Stopped {
                return;
            }
            *state = ContextState::Stopped;
        }

        self.inner.events.clear();
        self.inner.exports.clear();
        self.inner.factories.clear();
        self.inner.modules.clear();
        self.inner.registry.clear();
        self.inner.globals.write().clear();
        log::debug!("[{}] Context {} stopped", self.resource_name(), self.id());
    }

    // ========== Globals ==========

    pub fn global(&self, name: &str) -> Option<ScriptValue> {
        self.inner.globals.read().get(name).cloned()
    }

    /// Set a global, returning the previous value
    pub fn set_global(&self, name: &str, value: ScriptValue) -> Option<ScriptValue> {
        self.inner.globals.write().insert(name.to_string(), value)
    }

    pub fn remove_global(&self, name: &str) -> Option<ScriptValue> {
        self.inner.globals.write().remove(name)
    }

    // ========== Object identity ==========

    /// Wrapper for a native object, unique within this context
    pub fn wrapper_for(&self, native: &Arc<dyn BaseObject>) -> Arc<ScriptObject> {
        self.inner.registry.get_or_create(native)
    }

    /// Global (type, id) lookup through the engine
    pub fn find_by_type_and_id(
        &self,
        object_type: ObjectType,
        id: u32,
    ) -> Option<Arc<dyn BaseObject>> {
        self.inner
            .engine
            .object_by_id(object_type, id)
            .filter(|native| native.is_valid())
    }

    /// Wrapper for a (type, id) pair, `None` when nothing live matches
    pub fn wrapper_by_id(&self, object_type: ObjectType, id: u32) -> Option<Arc<ScriptObject>> {
        self.find_by_type_and_id(object_type, id)
            .map(|native| self.wrapper_for(&native))
    }

    /// Cached wrapper, without creating one
    pub fn cached_wrapper(&self, key: ObjectKey) -> Option<Arc<ScriptObject>> {
        self.inner.registry.get(key)
    }

    /// Drop the cached wrapper of an object
    pub fn invalidate(&self, key: ObjectKey) -> bool {
        self.inner.registry.invalidate(key)
    }

    pub fn wrapper_count(&self) -> usize {
        self.inner.registry.len()
    }

    // ========== Marshalling ==========

    pub fn to_native(&self, value: &ScriptValue) -> Result<NativeValue> {
        marshal::to_native(self, value)
    }

    pub fn to_script(&self, value: &NativeValue) -> ScriptValue {
        marshal::to_script(self, value)
    }

    pub fn to_native_args(&self, args: &[ScriptValue]) -> Result<Vec<NativeValue>> {
        marshal::to_native_args(self, args)
    }

    /// Expose a script function to native code
    pub fn wrap_function(&self, function: ScriptFunction) -> NativeFunction {
        marshal::wrap_script_function(self, function)
    }

    /// Call script code from the host
    ///
    /// Takes the runtime lock. A stopped context returns `Undefined` without
    /// running anything.
    pub fn call_function(
        &self,
        function: &ScriptFunction,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue> {
        let _runtime = self.lock_runtime();
        if !self.is_active() {
            log::debug!(
                "[{}] Skipped call to '{}': context stopped",
                self.resource_name(),
                function.name()
            );
            return Ok(ScriptValue::Undefined);
        }
        function.call(self, args)
    }

    // ========== Properties ==========

    /// Read a member of a wrapper
    ///
    /// Dynamic properties read as a snapshot object of the namespace.
    pub fn get_property(&self, this: &Arc<ScriptObject>, name: &str) -> Result<ScriptValue> {
        let class = this.class();
        if let Some(property) = class.find_property(name) {
            let receiver = PropertyContext { context: self, this };
            return (property.getter)(&receiver);
        }
        if let Some(namespace) = class.find_dynamic(name) {
            let accessor = self.meta(this, namespace)?;
            let snapshot = accessor
                .enumerate()?
                .into_iter()
                .map(|key| {
                    let value = accessor.get(&key)?;
                    Ok((key, value))
                })
                .collect::<Result<HashMap<_, _>>>()?;
            return Ok(ScriptValue::Object(snapshot));
        }
        if class.find_method(name).is_some() {
            return Ok(ScriptValue::Function(self.bound_method(this, name)));
        }
        Err(unknown_member(class, name))
    }

    /// Write a member of a wrapper
    pub fn set_property(
        &self,
        this: &Arc<ScriptObject>,
        name: &str,
        value: ScriptValue,
    ) -> Result<()> {
        let class = this.class();
        let property = class
            .find_property(name)
            .ok_or_else(|| unknown_member(class, name))?;
        let setter = property
            .setter
            .ok_or_else(|| BridgeError::argument(format!("{}.{} is read-only", class.name, name)))?;
        setter(&PropertyContext { context: self, this }, value)
    }

    /// Call a method of a wrapper
    pub fn call_method(
        &self,
        this: &Arc<ScriptObject>,
        name: &str,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue> {
        let class = this.class();
        let method = class
            .find_method(name)
            .ok_or_else(|| unknown_member(class, name))?;
        let _runtime = self.lock_runtime();
        (method.method)(
            &PropertyContext { context: self, this },
            FunctionArgs::new(method.name, args),
        )
    }

    /// Call a static function of a class, e.g. `BaseObject.getByID`
    pub fn call_static(
        &self,
        class_name: &str,
        name: &str,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue> {
        let class = ClassTemplate::by_name(class_name)
            .ok_or_else(|| BridgeError::argument(format!("unknown class {}", class_name)))?;
        let function = class
            .find_static(name)
            .ok_or_else(|| unknown_member(class, name))?;
        let _runtime = self.lock_runtime();
        (function.function)(self, FunctionArgs::new(function.name, args))
    }

    /// Metadata namespace of a live object
    pub fn meta(
        &self,
        this: &Arc<ScriptObject>,
        namespace: MetaNamespace,
    ) -> Result<MetaAccessor<'_>> {
        let class = this.class();
        if !class.has_dynamic(namespace) {
            return Err(unknown_member(class, namespace.property_name()));
        }
        let native = this.native()?;
        Ok(MetaAccessor::new(self, native, namespace))
    }

    fn bound_method(&self, this: &Arc<ScriptObject>, name: &str) -> ScriptFunction {
        let this = this.clone();
        let method_name = name.to_string();
        ScriptFunction::new(name.to_string(), move |context: &ExecutionContext, args| {
            context.call_method(&this, &method_name, args)
        })
    }

    // ========== Binding modules ==========

    /// `requireBinding(name)`
    pub fn require_binding(&self, name: &str) -> Result<ModuleNamespace> {
        binding::require(self, name)
    }

    pub fn module_status(&self, name: &str) -> ModuleStatus {
        self.inner.modules.status(name)
    }

    /// Evaluate every binding of a scope except the bootstrap binding
    pub fn initialize_bindings(&self, scope: BindingScope) -> InitializeReport {
        binding::initialize_bindings(self, scope)
    }

    /// Evaluate the bootstrap binding, if registered
    pub fn initialize_bootstrap(&self) -> Result<Option<ModuleNamespace>> {
        binding::initialize_bootstrap(self)
    }

    // ========== Factories ==========

    pub fn set_factory(&self, object_type: ObjectType, factory: ScriptFunction) -> Result<()> {
        self.inner.factories.set(object_type, factory)?;
        log::debug!("[{}] Registered factory for {}", self.resource_name(), object_type);
        Ok(())
    }

    pub fn factory(&self, object_type: ObjectType) -> Option<ScriptFunction> {
        self.inner.factories.get(object_type)
    }

    /// `createEntity(type, args)`
    pub fn create_entity(
        &self,
        object_type: ObjectType,
        args: ScriptValue,
    ) -> Result<Arc<ScriptObject>> {
        factory::create_entity(self, object_type, args)
    }

    /// `getAllEntities()`
    pub fn all_entities(&self) -> Vec<Arc<ScriptObject>> {
        factory::all_entities(self)
    }

    // ========== Exports ==========

    pub fn register_export(&self, name: &str, value: ScriptValue) -> Result<()> {
        self.inner.exports.register(name, value)
    }

    pub fn export(&self, name: &str) -> Option<ScriptValue> {
        self.inner.exports.get(name)
    }

    pub fn export_names(&self) -> Vec<String> {
        self.inner.exports.names()
    }

    // ========== Events ==========

    pub fn on(&self, event: &str, handler: ScriptFunction) {
        self.inner.events.on(event, handler);
    }

    pub fn off(&self, event: &str, handler: &ScriptFunction) -> bool {
        self.inner.events.off(event, handler)
    }

    /// Deliver a native event to this context's handlers
    ///
    /// Returns the number of handlers that ran.
    pub fn dispatch_event(&self, event: &str, args: &[NativeValue]) -> usize {
        let _runtime = self.lock_runtime();
        if !self.is_active() {
            return 0;
        }
        let handlers = self.inner.events.handlers(event);
        if handlers.is_empty() {
            return 0;
        }

        let script_args = marshal::to_script_args(self, args);
        for handler in &handlers {
            if let Err(err) = handler.call(self, script_args.clone()) {
                log::error!(
                    "[{}] Uncaught exception in '{}' handler: {}",
                    self.resource_name(),
                    event,
                    err
                );
            }
        }
        handlers.len()
    }
}

fn unknown_member(class: &ClassTemplate, name: &str) -> BridgeError {
    BridgeError::argument(format!("{} has no member '{}'", class.name, name))
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.inner.id)
            .field("resource_name", &self.inner.resource_name)
            .field("state", &self.state())
            .finish()
    }
}

//! Shared setup for the bridge integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use void_bridge::*;
use void_native::LocalEngine;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Engine, catalog and runtime for one side
pub struct Harness {
    pub engine: Arc<LocalEngine>,
    pub catalog: Arc<BindingCatalog>,
    pub runtime: Arc<BridgeRuntime>,
}

impl Harness {
    pub fn new(side: Side) -> Self {
        init_logger();
        let engine = Arc::new(LocalEngine::new());
        let catalog = Arc::new(BindingCatalog::new());
        let runtime =
            BridgeRuntime::new(engine.clone(), catalog.clone(), BridgeConfig::for_side(side));
        Self {
            engine,
            catalog,
            runtime,
        }
    }

    pub fn server() -> Self {
        Self::new(Side::Server)
    }

    pub fn client() -> Self {
        Self::new(Side::Client)
    }

    /// Register a binding, panicking on duplicates
    pub fn register(&self, binding: Binding) {
        self.catalog.register(binding).unwrap();
    }

    /// Start a resource, panicking on failure
    pub fn start(&self, resource: &str) -> ExecutionContext {
        self.runtime.start_resource(resource).unwrap().0
    }

    /// Register the entity binding, which owns the broadcast export
    ///
    /// Returns a counter of broadcast calls.
    pub fn register_entity_binding(&self) -> Arc<AtomicUsize> {
        let broadcasts = Arc::new(AtomicUsize::new(0));
        let counter = broadcasts.clone();
        self.register(Binding::native("shared/entity.js", BindingScope::Shared, move |scope| {
            let counter = counter.clone();
            let add_to_all = ScriptFunction::new("addEntityToAll", move |_, args| {
                assert!(matches!(args.first(), Some(ScriptValue::Handle(_))));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ScriptValue::Undefined)
            });
            scope
                .context()
                .register_export("entity:addEntityToAll", add_to_all.into())
        }));
        broadcasts
    }
}

/// Call a `cppBindings` function outside of binding initialization
pub fn cpp_call(
    context: &ExecutionContext,
    name: &str,
    args: Vec<ScriptValue>,
) -> Result<ScriptValue> {
    host_call(&CPP_BINDINGS, context, name, args)
}

/// Call an `alt` function outside of binding initialization
pub fn alt_call(
    context: &ExecutionContext,
    name: &str,
    args: Vec<ScriptValue>,
) -> Result<ScriptValue> {
    host_call(&ALT, context, name, args)
}

fn host_call(
    module: &HostModule,
    context: &ExecutionContext,
    name: &str,
    args: Vec<ScriptValue>,
) -> Result<ScriptValue> {
    let namespace = module.namespace(context);
    let function = namespace
        .get(name)
        .and_then(ScriptValue::as_function)
        .cloned()
        .unwrap_or_else(|| panic!("{} has no function {}", module.name, name));
    context.call_function(&function, args)
}

/// Script function that counts its invocations
pub fn counting_function(name: &str) -> (ScriptFunction, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let function = ScriptFunction::new(name.to_string(), move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptValue::Undefined)
    });
    (function, calls)
}

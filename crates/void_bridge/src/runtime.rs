//! Bridge runtime
//!
//! Owns one [`ExecutionContext`] per running resource and forwards native
//! lifecycle notifications to all of them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use void_native::{LifecycleListener, NativeEngine, NativeValue, ObjectKey};

use crate::binding::{BindingCatalog, BindingScope, InitializeReport};
use crate::config::BridgeConfig;
use crate::context::{ContextId, ExecutionContext};
use crate::error::{BridgeError, RegistrationKind, Result};

/// Summary of a resource start
#[derive(Debug, Default)]
pub struct StartReport {
    pub shared: InitializeReport,
    pub side: InitializeReport,
    pub bootstrapped: bool,
}

/// Registry of execution contexts
pub struct BridgeRuntime {
    engine: Arc<dyn NativeEngine>,
    catalog: Arc<BindingCatalog>,
    config: Arc<BridgeConfig>,
    contexts: RwLock<HashMap<String, ExecutionContext>>,
    next_id: AtomicU64,
}

impl BridgeRuntime {
    /// Create a runtime and subscribe it to the engine's lifecycle events
    pub fn new(
        engine: Arc<dyn NativeEngine>,
        catalog: Arc<BindingCatalog>,
        config: BridgeConfig,
    ) -> Arc<Self> {
        let runtime = Arc::new(Self {
            engine,
            catalog,
            config: Arc::new(config),
            contexts: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        });
        let listener: Weak<dyn LifecycleListener> =
            Arc::downgrade(&runtime) as Weak<dyn LifecycleListener>;
        runtime.engine.add_lifecycle_listener(listener);
        log::info!("Bridge runtime created ({} side)", runtime.config.side);
        runtime
    }

    pub fn engine(&self) -> &Arc<dyn NativeEngine> {
        &self.engine
    }

    pub fn catalog(&self) -> &Arc<BindingCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Create a context for a resource and initialize its bindings
    ///
    /// Shared bindings load first, then the bindings of this side, then the
    /// bootstrap binding. A failing bootstrap binding stops the context and
    /// fails the start; other binding failures are reported and logged.
    pub fn start_resource(&self, resource_name: &str) -> Result<(ExecutionContext, StartReport)> {
        let context = {
            let mut contexts = self.contexts.write();
            if contexts.contains_key(resource_name) {
                return Err(BridgeError::duplicate(RegistrationKind::Resource, resource_name));
            }
            let id = ContextId(self.next_id.fetch_add(1, Ordering::Relaxed));
            let context = ExecutionContext::new(
                id,
                resource_name,
                self.engine.clone(),
                self.catalog.clone(),
                self.config.clone(),
            );
            contexts.insert(resource_name.to_string(), context.clone());
            context
        };

        let shared = context.initialize_bindings(BindingScope::Shared);
        let side = context.initialize_bindings(self.config.side.binding_scope());
        let bootstrapped = match context.initialize_bootstrap() {
            Ok(namespace) => namespace.is_some(),
            Err(err) => {
                log::error!("[{}] Bootstrap failed: {}", resource_name, err);
                self.stop_resource(resource_name);
                return Err(err);
            }
        };

        context.mark_started();
        log::info!("Started resource '{}' in context {}", resource_name, context.id());
        Ok((
            context,
            StartReport {
                shared,
                side,
                bootstrapped,
            },
        ))
    }

    /// Stop a resource, returning whether it was running
    pub fn stop_resource(&self, resource_name: &str) -> bool {
        let Some(context) = self.contexts.write().remove(resource_name) else {
            return false;
        };
        context.stop();
        log::info!("Stopped resource '{}'", resource_name);
        true
    }

    pub fn context(&self, resource_name: &str) -> Option<ExecutionContext> {
        self.contexts.read().get(resource_name).cloned()
    }

    /// Running contexts, ordered by ID
    pub fn contexts(&self) -> Vec<ExecutionContext> {
        let mut contexts: Vec<_> = self.contexts.read().values().cloned().collect();
        contexts.sort_by_key(ExecutionContext::id);
        contexts
    }

    pub fn context_count(&self) -> usize {
        self.contexts.read().len()
    }

    /// Drop the object's wrapper in every context
    ///
    /// Returns how many contexts held one.
    pub fn notify_object_destroyed(&self, key: ObjectKey) -> usize {
        self.contexts()
            .iter()
            .filter(|context| context.invalidate(key))
            .count()
    }

    /// Deliver a native event to every running context
    pub fn dispatch_event(&self, event: &str, args: &[NativeValue]) -> usize {
        self.contexts()
            .iter()
            .map(|context| context.dispatch_event(event, args))
            .sum()
    }

    /// Stop every resource
    pub fn shutdown(&self) {
        let contexts: Vec<_> = self.contexts.write().drain().map(|(_, c)| c).collect();
        for context in contexts {
            context.stop();
        }
        log::info!("Bridge runtime shut down");
    }
}

impl LifecycleListener for BridgeRuntime {
    fn on_object_destroyed(&self, key: ObjectKey) {
        let invalidated = self.notify_object_destroyed(key);
        log::debug!("Object {} destroyed, dropped {} wrappers", key, invalidated);
    }
}

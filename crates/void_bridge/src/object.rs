//! Script object wrappers and the per-context identity registry
//!
//! ```text
//! ┌──────────────────────── ExecutionContext ────────────────────────┐
//! │  IdentityRegistry                                                │
//! │  ┌───────────────┐        ┌───────────────┐                      │
//! │  │ vehicle#3     │ ─────► │ ScriptObject  │ ─ ─ weak ─ ─ ┐       │
//! │  │ player#0      │ ─────► │ ScriptObject  │ ─ ─ weak ─ ┐ │       │
//! │  └───────────────┘        └───────────────┘            │ │       │
//! └────────────────────────────────────────────────────────│─│───────┘
//!                                                          ▼ ▼
//!                                             NativeEngine objects
//! ```
//!
//! A wrapper never keeps its native object alive. It checks liveness on
//! every access and reports [`BridgeError::InvalidObject`] once the engine
//! has destroyed the object.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use void_native::{BaseObject, ObjectKey, ObjectType};

use crate::class::ClassTemplate;
use crate::context::ContextId;
use crate::error::{BridgeError, Result};

/// Script-visible wrapper of a native object, bound to one context
pub struct ScriptObject {
    key: ObjectKey,
    class: &'static ClassTemplate,
    native: Weak<dyn BaseObject>,
    context: ContextId,
}

impl ScriptObject {
    pub(crate) fn new(context: ContextId, native: &Arc<dyn BaseObject>) -> Self {
        let key = native.key();
        Self {
            key,
            class: ClassTemplate::for_type(key.object_type),
            native: Arc::downgrade(native),
            context,
        }
    }

    /// Identity of the wrapped object
    pub fn key(&self) -> ObjectKey {
        self.key
    }

    /// Object kind
    pub fn object_type(&self) -> ObjectType {
        self.key.object_type
    }

    /// Object ID
    pub fn id(&self) -> u32 {
        self.key.id
    }

    /// Script class of the wrapper
    pub fn class(&self) -> &'static ClassTemplate {
        self.class
    }

    /// Context that owns this wrapper
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// Whether the native object still exists
    pub fn valid(&self) -> bool {
        self.native.upgrade().is_some_and(|native| native.is_valid())
    }

    /// Resolve the native object, failing if it is gone
    pub fn native(&self) -> Result<Arc<dyn BaseObject>> {
        self.native
            .upgrade()
            .filter(|native| native.is_valid())
            .ok_or(BridgeError::InvalidObject(self.key))
    }

    /// Whether this wrapper was created for exactly this native object
    pub(crate) fn is_bound_to(&self, native: &Arc<dyn BaseObject>) -> bool {
        self.native
            .upgrade()
            .is_some_and(|bound| Arc::ptr_eq(&bound, native))
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptObject")
            .field("key", &self.key)
            .field("class", &self.class.name)
            .field("context", &self.context)
            .finish()
    }
}

/// Cache of wrappers, at most one per native object
pub struct IdentityRegistry {
    context: ContextId,
    wrappers: RwLock<HashMap<ObjectKey, Arc<ScriptObject>>>,
}

impl IdentityRegistry {
    /// Create an empty registry for a context
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            wrappers: RwLock::new(HashMap::new()),
        }
    }

    /// Get the wrapper for a native object, creating it on first use
    pub fn get_or_create(&self, native: &Arc<dyn BaseObject>) -> Arc<ScriptObject> {
        let key = native.key();

        // Fast path: read lock only
        if let Some(wrapper) = self.wrappers.read().get(&key) {
            if wrapper.is_bound_to(native) {
                return wrapper.clone();
            }
        }

        let mut wrappers = self.wrappers.write();
        if let Some(wrapper) = wrappers.get(&key) {
            if wrapper.is_bound_to(native) {
                return wrapper.clone();
            }
            log::warn!(
                "Replacing stale wrapper for {} in context {:?}",
                key,
                self.context
            );
        }

        let wrapper = Arc::new(ScriptObject::new(self.context, native));
        wrappers.insert(key, wrapper.clone());
        log::debug!("Created wrapper for {} in context {:?}", key, self.context);
        wrapper
    }

    /// Cached wrapper for a key, if any
    pub fn get(&self, key: ObjectKey) -> Option<Arc<ScriptObject>> {
        self.wrappers.read().get(&key).cloned()
    }

    /// Drop the cached wrapper of a key, returning whether one existed
    pub fn invalidate(&self, key: ObjectKey) -> bool {
        self.wrappers.write().remove(&key).is_some()
    }

    /// Number of cached wrappers
    pub fn len(&self) -> usize {
        self.wrappers.read().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.wrappers.read().is_empty()
    }

    /// Drop every cached wrapper
    pub fn clear(&self) {
        self.wrappers.write().clear();
    }
}

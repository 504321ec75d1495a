//! Dynamic property channel
//!
//! Metadata namespaces are exposed to scripts as dynamic properties:
//! `obj.meta.score = 42`, `delete obj.meta.score`, `Object.keys(obj.meta)`.
//! All four namespace kinds share the [`DynamicProperty`] protocol and differ
//! only in their backing store and in who may write.
//!
//! | Namespace          | Server     | Client                              |
//! |--------------------|------------|-------------------------------------|
//! | `meta`             | read/write | read/write                          |
//! | `syncedMeta`       | read/write | read-only                           |
//! | `streamSyncedMeta` | read/write | read-only, empty when out of range  |
//! | `localMeta`        | read/write | read-only                           |

use std::sync::Arc;

use void_native::{BaseObject, MetaNamespace, MetaStore};

use crate::config::Side;
use crate::context::ExecutionContext;
use crate::error::{BridgeError, Result};
use crate::value::ScriptValue;

/// Get/set/delete/enumerate over a key/value namespace
pub trait DynamicProperty {
    /// Value for a key, `Undefined` when absent
    fn get(&self, key: &str) -> Result<ScriptValue>;

    /// Insert or overwrite a key
    fn set(&self, key: &str, value: &ScriptValue) -> Result<()>;

    /// Remove a key, returning whether it existed
    fn delete(&self, key: &str) -> Result<bool>;

    /// Snapshot of the keys
    fn enumerate(&self) -> Result<Vec<String>>;

    /// Whether a key is present
    fn has(&self, key: &str) -> Result<bool> {
        Ok(!self.get(key)?.is_undefined())
    }
}

/// View of one object's store, shared by every namespace kind
struct MetaView<'a> {
    context: &'a ExecutionContext,
    object: Arc<dyn BaseObject>,
    namespace: MetaNamespace,
}

impl MetaView<'_> {
    fn store(&self) -> Result<&dyn MetaStore> {
        self.object.meta_store(self.namespace).ok_or_else(|| {
            BridgeError::internal(format!(
                "{} carries no {} store",
                self.object.key(),
                self.namespace
            ))
        })
    }

    fn read(&self, key: &str) -> Result<ScriptValue> {
        Ok(self
            .store()?
            .get(key)
            .map(|value| self.context.to_script(&value))
            .unwrap_or_default())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = self.store()?.keys();
        keys.sort();
        Ok(keys)
    }

    fn ensure_writable(&self, writable: bool) -> Result<()> {
        if writable {
            Ok(())
        } else {
            Err(BridgeError::ReadOnlyNamespace {
                namespace: self.namespace,
            })
        }
    }

    fn write(&self, key: &str, value: &ScriptValue) -> Result<()> {
        let native = self.context.to_native(value)?;
        self.store()?.set(key, native);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.store()?.delete(key))
    }

    fn server_side(&self) -> bool {
        self.context.config().side == Side::Server
    }
}

/// `meta`: writable on both sides
pub struct LocalMeta<'a>(MetaView<'a>);

impl DynamicProperty for LocalMeta<'_> {
    fn get(&self, key: &str) -> Result<ScriptValue> {
        self.0.read(key)
    }

    fn set(&self, key: &str, value: &ScriptValue) -> Result<()> {
        self.0.write(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.0.remove(key)
    }

    fn enumerate(&self) -> Result<Vec<String>> {
        self.0.keys()
    }
}

/// `syncedMeta`: replicated to every client, written by the server
pub struct SyncedMeta<'a>(MetaView<'a>);

impl DynamicProperty for SyncedMeta<'_> {
    fn get(&self, key: &str) -> Result<ScriptValue> {
        self.0.read(key)
    }

    fn set(&self, key: &str, value: &ScriptValue) -> Result<()> {
        self.0.ensure_writable(self.0.server_side())?;
        self.0.write(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.0.ensure_writable(self.0.server_side())?;
        self.0.remove(key)
    }

    fn enumerate(&self) -> Result<Vec<String>> {
        self.0.keys()
    }
}

/// `streamSyncedMeta`: replicated to clients in streaming range
pub struct StreamSyncedMeta<'a>(MetaView<'a>);

impl StreamSyncedMeta<'_> {
    fn visible(&self) -> bool {
        self.0.server_side() || self.0.object.is_streamed_in()
    }
}

impl DynamicProperty for StreamSyncedMeta<'_> {
    fn get(&self, key: &str) -> Result<ScriptValue> {
        if !self.visible() {
            return Ok(ScriptValue::Undefined);
        }
        self.0.read(key)
    }

    fn set(&self, key: &str, value: &ScriptValue) -> Result<()> {
        self.0.ensure_writable(self.0.server_side())?;
        self.0.write(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.0.ensure_writable(self.0.server_side())?;
        self.0.remove(key)
    }

    fn enumerate(&self) -> Result<Vec<String>> {
        if !self.visible() {
            return Ok(Vec::new());
        }
        self.0.keys()
    }
}

/// `localMeta`: per-player data, mirrored only to that player
pub struct PlayerLocalMeta<'a>(MetaView<'a>);

impl DynamicProperty for PlayerLocalMeta<'_> {
    fn get(&self, key: &str) -> Result<ScriptValue> {
        self.0.read(key)
    }

    fn set(&self, key: &str, value: &ScriptValue) -> Result<()> {
        self.0.ensure_writable(self.0.server_side())?;
        self.0.write(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.0.ensure_writable(self.0.server_side())?;
        self.0.remove(key)
    }

    fn enumerate(&self) -> Result<Vec<String>> {
        self.0.keys()
    }
}

/// One namespace of one live object
pub enum MetaAccessor<'a> {
    Local(LocalMeta<'a>),
    Synced(SyncedMeta<'a>),
    StreamSynced(StreamSyncedMeta<'a>),
    PlayerLocal(PlayerLocalMeta<'a>),
}

impl<'a> MetaAccessor<'a> {
    pub(crate) fn new(
        context: &'a ExecutionContext,
        object: Arc<dyn BaseObject>,
        namespace: MetaNamespace,
    ) -> Self {
        let view = MetaView {
            context,
            object,
            namespace,
        };
        match namespace {
            MetaNamespace::Local => Self::Local(LocalMeta(view)),
            MetaNamespace::Synced => Self::Synced(SyncedMeta(view)),
            MetaNamespace::StreamSynced => Self::StreamSynced(StreamSyncedMeta(view)),
            MetaNamespace::PlayerLocal => Self::PlayerLocal(PlayerLocalMeta(view)),
        }
    }

    pub fn namespace(&self) -> MetaNamespace {
        match self {
            Self::Local(m) => m.0.namespace,
            Self::Synced(m) => m.0.namespace,
            Self::StreamSynced(m) => m.0.namespace,
            Self::PlayerLocal(m) => m.0.namespace,
        }
    }

    fn property(&self) -> &dyn DynamicProperty {
        match self {
            Self::Local(m) => m,
            Self::Synced(m) => m,
            Self::StreamSynced(m) => m,
            Self::PlayerLocal(m) => m,
        }
    }
}

impl DynamicProperty for MetaAccessor<'_> {
    fn get(&self, key: &str) -> Result<ScriptValue> {
        self.property().get(key)
    }

    fn set(&self, key: &str, value: &ScriptValue) -> Result<()> {
        self.property().set(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.property().delete(key)
    }

    fn enumerate(&self) -> Result<Vec<String>> {
        self.property().enumerate()
    }
}

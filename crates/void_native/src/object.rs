//! Native object identity and metadata storage

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{NativeError, Result};
use crate::value::NativeValue;

/// Kind of a native object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Player = 0,
    Vehicle = 1,
    Ped = 2,
    NetworkObject = 3,
    Blip = 4,
    VoiceChannel = 5,
    ColShape = 6,
    Checkpoint = 7,
    VirtualEntity = 8,
    VirtualEntityGroup = 9,
    Marker = 10,
    TextLabel = 11,
}

impl ObjectType {
    /// All object types, in discriminant order
    pub const ALL: [ObjectType; 12] = [
        ObjectType::Player,
        ObjectType::Vehicle,
        ObjectType::Ped,
        ObjectType::NetworkObject,
        ObjectType::Blip,
        ObjectType::VoiceChannel,
        ObjectType::ColShape,
        ObjectType::Checkpoint,
        ObjectType::VirtualEntity,
        ObjectType::VirtualEntityGroup,
        ObjectType::Marker,
        ObjectType::TextLabel,
    ];

    /// Stable lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Vehicle => "vehicle",
            Self::Ped => "ped",
            Self::NetworkObject => "network_object",
            Self::Blip => "blip",
            Self::VoiceChannel => "voice_channel",
            Self::ColShape => "col_shape",
            Self::Checkpoint => "checkpoint",
            Self::VirtualEntity => "virtual_entity",
            Self::VirtualEntityGroup => "virtual_entity_group",
            Self::Marker => "marker",
            Self::TextLabel => "text_label",
        }
    }

    /// Entities are networked and carry synced metadata
    pub fn is_entity(&self) -> bool {
        matches!(
            self,
            Self::Player | Self::Vehicle | Self::Ped | Self::NetworkObject
        )
    }

    /// World objects have a position and a dimension
    pub fn is_world_object(&self) -> bool {
        self.is_entity()
            || matches!(
                self,
                Self::ColShape
                    | Self::Checkpoint
                    | Self::VirtualEntity
                    | Self::Marker
                    | Self::TextLabel
            )
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ObjectType {
    type Err = NativeError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        ObjectType::ALL
            .into_iter()
            .find(|ty| ty.name() == normalized || ty.name().replace('_', "") == normalized)
            .ok_or_else(|| NativeError::UnknownType(s.to_string()))
    }
}

impl TryFrom<i64> for ObjectType {
    type Error = NativeError;

    fn try_from(value: i64) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| ObjectType::ALL.get(index).copied())
            .ok_or_else(|| NativeError::UnknownType(value.to_string()))
    }
}

/// Stable identity of a native object: its type plus a numeric ID
///
/// IDs are only unique per type and may be reused after the object that
/// held them is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub object_type: ObjectType,
    pub id: u32,
}

impl ObjectKey {
    /// Create a new object key
    pub const fn new(object_type: ObjectType, id: u32) -> Self {
        Self { object_type, id }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.object_type, self.id)
    }
}

/// Metadata namespaces a native object may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaNamespace {
    /// Object-local metadata, never replicated
    Local,
    /// Replicated to every client
    Synced,
    /// Replicated to clients that have the object streamed in
    StreamSynced,
    /// Player metadata replicated only to that player
    PlayerLocal,
}

impl MetaNamespace {
    /// Script-visible property name of the namespace
    pub fn property_name(&self) -> &'static str {
        match self {
            Self::Local => "meta",
            Self::Synced => "syncedMeta",
            Self::StreamSynced => "streamSyncedMeta",
            Self::PlayerLocal => "localMeta",
        }
    }

    /// Whether objects of the given type carry this namespace
    pub fn applies_to(&self, object_type: ObjectType) -> bool {
        match self {
            Self::Local => true,
            Self::Synced | Self::StreamSynced => object_type.is_entity(),
            Self::PlayerLocal => object_type == ObjectType::Player,
        }
    }
}

impl fmt::Display for MetaNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.property_name())
    }
}

/// Engine-managed key/value store
pub trait MetaStore: Send + Sync {
    /// Get a value, `None` if the key is absent
    fn get(&self, key: &str) -> Option<NativeValue>;

    /// Insert or overwrite a value
    fn set(&self, key: &str, value: NativeValue);

    /// Remove a key, returning whether it existed
    fn delete(&self, key: &str) -> bool;

    /// Check whether a key exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Snapshot of the current keys
    fn keys(&self) -> Vec<String>;
}

/// Hash-map backed [`MetaStore`]
#[derive(Debug, Default)]
pub struct MetaMap {
    entries: RwLock<HashMap<String, NativeValue>>,
}

impl MetaMap {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl MetaStore for MetaMap {
    fn get(&self, key: &str) -> Option<NativeValue> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: NativeValue) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

/// A native object as seen by the bridge
///
/// Implementations are owned by the engine. Accessors for world/entity state
/// return `None` on object kinds that do not have that state.
pub trait BaseObject: Send + Sync {
    /// Object kind
    fn object_type(&self) -> ObjectType;

    /// Numeric ID, unique per type among live objects
    fn id(&self) -> u32;

    /// Identity key
    fn key(&self) -> ObjectKey {
        ObjectKey::new(self.object_type(), self.id())
    }

    /// False once the engine has destroyed the object
    fn is_valid(&self) -> bool;

    /// Metadata store for a namespace, if this object carries it
    fn meta_store(&self, namespace: MetaNamespace) -> Option<&dyn MetaStore>;

    /// Whether the object is within streaming range of the local observer
    fn is_streamed_in(&self) -> bool {
        true
    }

    /// World position
    fn position(&self) -> Option<[f32; 3]> {
        None
    }

    /// Move the object
    fn set_position(&self, _position: [f32; 3]) -> Result<()> {
        Err(NativeError::unsupported(self.object_type(), "set_position"))
    }

    /// Dimension the object lives in
    fn dimension(&self) -> Option<i32> {
        None
    }

    /// Move the object to another dimension
    fn set_dimension(&self, _dimension: i32) -> Result<()> {
        Err(NativeError::unsupported(self.object_type(), "set_dimension"))
    }

    /// Model hash
    fn model(&self) -> Option<u32> {
        None
    }

    /// Visibility flag
    fn visible(&self) -> Option<bool> {
        None
    }
}

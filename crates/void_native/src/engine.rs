//! Native engine interface
//!
//! The capability set the bridge consumes from the authoritative simulation.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::error::{NativeError, Result};
use crate::object::{BaseObject, ObjectKey, ObjectType};
use crate::value::NativeValue;

/// Named native event types whose delivery can be toggled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlayerConnect = 0,
    PlayerDisconnect = 1,
    PlayerDeath = 2,
    PlayerDamage = 3,
    VehicleDestroy = 4,
    ColShape = 5,
    MetaChange = 6,
    SyncedMetaChange = 7,
    StreamSyncedMetaChange = 8,
    ServerScriptEvent = 9,
    ClientScriptEvent = 10,
}

impl EventKind {
    /// All event kinds, in discriminant order
    pub const ALL: [EventKind; 11] = [
        EventKind::PlayerConnect,
        EventKind::PlayerDisconnect,
        EventKind::PlayerDeath,
        EventKind::PlayerDamage,
        EventKind::VehicleDestroy,
        EventKind::ColShape,
        EventKind::MetaChange,
        EventKind::SyncedMetaChange,
        EventKind::StreamSyncedMetaChange,
        EventKind::ServerScriptEvent,
        EventKind::ClientScriptEvent,
    ];

    /// Stable lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayerConnect => "player_connect",
            Self::PlayerDisconnect => "player_disconnect",
            Self::PlayerDeath => "player_death",
            Self::PlayerDamage => "player_damage",
            Self::VehicleDestroy => "vehicle_destroy",
            Self::ColShape => "col_shape",
            Self::MetaChange => "meta_change",
            Self::SyncedMetaChange => "synced_meta_change",
            Self::StreamSyncedMetaChange => "stream_synced_meta_change",
            Self::ServerScriptEvent => "server_script_event",
            Self::ClientScriptEvent => "client_script_event",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for EventKind {
    type Err = NativeError;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| NativeError::UnknownEvent(s.to_string()))
    }
}

impl TryFrom<i64> for EventKind {
    type Error = NativeError;

    fn try_from(value: i64) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| EventKind::ALL.get(index).copied())
            .ok_or_else(|| NativeError::UnknownEvent(value.to_string()))
    }
}

/// Delivery guarantee for remote events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Reliable,
    Unreliable,
}

/// Receives object lifecycle notifications from the engine
pub trait LifecycleListener: Send + Sync {
    /// Called after an object has been destroyed and removed from the index
    fn on_object_destroyed(&self, key: ObjectKey);
}

/// Operations the bridge needs from the native simulation
pub trait NativeEngine: Send + Sync {
    /// Global (type, id) lookup; `None` when no live object matches
    fn object_by_id(&self, object_type: ObjectType, id: u32) -> Option<Arc<dyn BaseObject>>;

    /// Default constructor for a type; `None` when nothing was created
    fn create_object(
        &self,
        object_type: ObjectType,
        args: &NativeValue,
    ) -> Option<Arc<dyn BaseObject>>;

    /// Destroy an object
    fn destroy_object(&self, key: ObjectKey) -> Result<()>;

    /// All live entities
    fn entities(&self) -> Vec<Arc<dyn BaseObject>>;

    /// Enable or disable delivery of an event type
    fn toggle_event(&self, kind: EventKind, enabled: bool);

    /// Whether an event type is currently delivered
    fn is_event_enabled(&self, kind: EventKind) -> bool;

    /// Trigger a named event on a remote endpoint
    ///
    /// `target` of `None` broadcasts to every remote endpoint.
    fn emit_remote(
        &self,
        target: Option<ObjectKey>,
        name: &str,
        args: Vec<NativeValue>,
        delivery: Delivery,
    ) -> Result<()>;

    /// Register a lifecycle listener (held weakly)
    fn add_lifecycle_listener(&self, listener: Weak<dyn LifecycleListener>);
}

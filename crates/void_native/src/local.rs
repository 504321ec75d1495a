//! In-memory native engine
//!
//! [`LocalEngine`] keeps every object in a process-local index. It backs
//! headless hosts and every test suite of the bridge; a real simulation
//! implements [`NativeEngine`] over its own object model instead.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::engine::{Delivery, EventKind, LifecycleListener, NativeEngine};
use crate::error::{NativeError, Result};
use crate::object::{BaseObject, MetaMap, MetaNamespace, MetaStore, ObjectKey, ObjectType};
use crate::value::NativeValue;

/// Mutable world state of a local object
#[derive(Debug, Clone, Default)]
struct WorldState {
    position: [f32; 3],
    dimension: i32,
    model: u32,
    visible: bool,
}

/// Object owned by a [`LocalEngine`]
#[derive(Debug)]
pub struct LocalObject {
    key: ObjectKey,
    valid: AtomicBool,
    streamed_in: AtomicBool,
    meta: MetaMap,
    synced_meta: Option<MetaMap>,
    stream_synced_meta: Option<MetaMap>,
    player_local_meta: Option<MetaMap>,
    state: RwLock<WorldState>,
}

impl LocalObject {
    fn new(key: ObjectKey, args: &NativeValue) -> Self {
        let object_type = key.object_type;
        let entity_store = || object_type.is_entity().then(MetaMap::new);

        let state = WorldState {
            position: args.get("pos").and_then(NativeValue::as_vector3).unwrap_or_default(),
            dimension: args
                .get("dimension")
                .and_then(NativeValue::as_int)
                .and_then(|d| i32::try_from(d).ok())
                .unwrap_or(0),
            model: args
                .get("model")
                .and_then(NativeValue::as_int)
                .and_then(|m| u32::try_from(m).ok())
                .unwrap_or(0),
            visible: args.get("visible").and_then(NativeValue::as_bool).unwrap_or(true),
        };

        Self {
            key,
            valid: AtomicBool::new(true),
            streamed_in: AtomicBool::new(true),
            meta: MetaMap::new(),
            synced_meta: entity_store(),
            stream_synced_meta: entity_store(),
            player_local_meta: (object_type == ObjectType::Player).then(MetaMap::new),
            state: RwLock::new(state),
        }
    }

    /// Simulate the object entering or leaving streaming range
    pub fn set_streamed_in(&self, streamed_in: bool) {
        self.streamed_in.store(streamed_in, Ordering::Release);
    }

    /// Change the model hash
    pub fn set_model(&self, model: u32) {
        self.state.write().model = model;
    }

    fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

impl BaseObject for LocalObject {
    fn object_type(&self) -> ObjectType {
        self.key.object_type
    }

    fn id(&self) -> u32 {
        self.key.id
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn meta_store(&self, namespace: MetaNamespace) -> Option<&dyn MetaStore> {
        let store = match namespace {
            MetaNamespace::Local => Some(&self.meta),
            MetaNamespace::Synced => self.synced_meta.as_ref(),
            MetaNamespace::StreamSynced => self.stream_synced_meta.as_ref(),
            MetaNamespace::PlayerLocal => self.player_local_meta.as_ref(),
        };
        store.map(|s| s as &dyn MetaStore)
    }

    fn is_streamed_in(&self) -> bool {
        self.streamed_in.load(Ordering::Acquire)
    }

    fn position(&self) -> Option<[f32; 3]> {
        self.key.object_type.is_world_object().then(|| self.state.read().position)
    }

    fn set_position(&self, position: [f32; 3]) -> Result<()> {
        if !self.key.object_type.is_world_object() {
            return Err(NativeError::unsupported(self.key.object_type, "set_position"));
        }
        self.state.write().position = position;
        Ok(())
    }

    fn dimension(&self) -> Option<i32> {
        self.key.object_type.is_world_object().then(|| self.state.read().dimension)
    }

    fn set_dimension(&self, dimension: i32) -> Result<()> {
        if !self.key.object_type.is_world_object() {
            return Err(NativeError::unsupported(self.key.object_type, "set_dimension"));
        }
        self.state.write().dimension = dimension;
        Ok(())
    }

    fn model(&self) -> Option<u32> {
        self.key.object_type.is_entity().then(|| self.state.read().model)
    }

    fn visible(&self) -> Option<bool> {
        self.key.object_type.is_entity().then(|| self.state.read().visible)
    }
}

/// A remote event recorded by the [`LocalEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub target: Option<ObjectKey>,
    pub name: String,
    pub args: Vec<NativeValue>,
    pub delivery: Delivery,
}

/// Per-type ID allocation; released IDs are handed out again first
#[derive(Debug, Default)]
struct IdPool {
    next: u32,
    free: Vec<u32>,
}

impl IdPool {
    fn acquire(&mut self) -> u32 {
        self.free.pop().unwrap_or_else(|| {
            let id = self.next;
            self.next += 1;
            id
        })
    }

    fn release(&mut self, id: u32) {
        self.free.push(id);
    }
}

/// In-memory engine with a global (type, id) index
pub struct LocalEngine {
    /// Live objects by identity
    objects: RwLock<HashMap<ObjectKey, Arc<LocalObject>>>,
    /// ID pools by type
    ids: Mutex<HashMap<ObjectType, IdPool>>,
    /// Event kinds whose delivery is switched off
    disabled_events: RwLock<HashSet<EventKind>>,
    /// Lifecycle listeners
    listeners: RwLock<Vec<Weak<dyn LifecycleListener>>>,
    /// Remote events emitted so far
    outbox: Mutex<Vec<RemoteEvent>>,
}

impl LocalEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            ids: Mutex::new(HashMap::new()),
            disabled_events: RwLock::new(HashSet::new()),
            listeners: RwLock::new(Vec::new()),
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Create an object directly, bypassing any script factory
    pub fn spawn(&self, object_type: ObjectType, args: &NativeValue) -> Arc<LocalObject> {
        let id = self.ids.lock().entry(object_type).or_default().acquire();
        let key = ObjectKey::new(object_type, id);
        let object = Arc::new(LocalObject::new(key, args));
        self.objects.write().insert(key, object.clone());
        log::debug!("Spawned native object {}", key);
        object
    }

    /// Concrete lookup, for hosts that need [`LocalObject`] access
    pub fn local_object(&self, key: ObjectKey) -> Option<Arc<LocalObject>> {
        self.objects.read().get(&key).cloned()
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Drain the recorded remote events
    pub fn take_outbox(&self) -> Vec<RemoteEvent> {
        std::mem::take(&mut *self.outbox.lock())
    }

    fn notify_destroyed(&self, key: ObjectKey) {
        // Snapshot first: listeners may call back into the engine
        let listeners: Vec<_> = {
            let mut listeners = self.listeners.write();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.on_object_destroyed(key);
        }
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeEngine for LocalEngine {
    fn object_by_id(&self, object_type: ObjectType, id: u32) -> Option<Arc<dyn BaseObject>> {
        self.objects
            .read()
            .get(&ObjectKey::new(object_type, id))
            .map(|o| o.clone() as Arc<dyn BaseObject>)
    }

    fn create_object(
        &self,
        object_type: ObjectType,
        args: &NativeValue,
    ) -> Option<Arc<dyn BaseObject>> {
        match args {
            NativeValue::None => Some(self.spawn(object_type, args) as Arc<dyn BaseObject>),
            NativeValue::Dict(_) => {
                if let Some(field) = out_of_range_field(args) {
                    log::warn!("Refusing to create {}: '{}' is out of range", object_type, field);
                    return None;
                }
                Some(self.spawn(object_type, args) as Arc<dyn BaseObject>)
            }
            other => {
                log::warn!(
                    "Refusing to create {}: construction arguments must be a dict, got {}",
                    object_type,
                    other.type_name()
                );
                None
            }
        }
    }

    fn destroy_object(&self, key: ObjectKey) -> Result<()> {
        let object = self
            .objects
            .write()
            .remove(&key)
            .ok_or(NativeError::UnknownObject(key))?;
        object.invalidate();
        self.ids
            .lock()
            .entry(key.object_type)
            .or_default()
            .release(key.id);

        log::debug!("Destroyed native object {}", key);
        self.notify_destroyed(key);
        Ok(())
    }

    fn entities(&self) -> Vec<Arc<dyn BaseObject>> {
        let mut entities: Vec<_> = self
            .objects
            .read()
            .values()
            .filter(|o| o.key.object_type.is_entity())
            .map(|o| o.clone() as Arc<dyn BaseObject>)
            .collect();
        entities.sort_by_key(|o| o.key());
        entities
    }

    fn toggle_event(&self, kind: EventKind, enabled: bool) {
        let mut disabled = self.disabled_events.write();
        if enabled {
            disabled.remove(&kind);
        } else {
            disabled.insert(kind);
        }
    }

    fn is_event_enabled(&self, kind: EventKind) -> bool {
        !self.disabled_events.read().contains(&kind)
    }

    fn emit_remote(
        &self,
        target: Option<ObjectKey>,
        name: &str,
        args: Vec<NativeValue>,
        delivery: Delivery,
    ) -> Result<()> {
        if let Some(key) = target {
            if key.object_type != ObjectType::Player || !self.objects.read().contains_key(&key) {
                return Err(NativeError::InvalidTarget(key));
            }
        }
        self.outbox.lock().push(RemoteEvent {
            target,
            name: name.to_string(),
            args,
            delivery,
        });
        Ok(())
    }

    fn add_lifecycle_listener(&self, listener: Weak<dyn LifecycleListener>) {
        self.listeners.write().push(listener);
    }
}

/// First integer construction field that does not fit its native type
fn out_of_range_field(args: &NativeValue) -> Option<&'static str> {
    let int = |field: &str| args.get(field).and_then(NativeValue::as_int);
    if int("dimension").is_some_and(|d| i32::try_from(d).is_err()) {
        return Some("dimension");
    }
    if int("model").is_some_and(|m| u32::try_from(m).is_err()) {
        return Some("model");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_and_lookup() {
        let engine = LocalEngine::new();
        let vehicle = engine.spawn(ObjectType::Vehicle, &NativeValue::None);

        let found = engine.object_by_id(ObjectType::Vehicle, vehicle.id()).unwrap();
        assert_eq!(found.key(), vehicle.key());
        assert!(engine.object_by_id(ObjectType::Player, vehicle.id()).is_none());
    }

    #[test]
    fn test_ids_are_per_type() {
        let engine = LocalEngine::new();
        let a = engine.spawn(ObjectType::Vehicle, &NativeValue::None);
        let b = engine.spawn(ObjectType::Player, &NativeValue::None);
        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 0);
    }

    #[test]
    fn test_destroy_reuses_id() {
        let engine = LocalEngine::new();
        let first = engine.spawn(ObjectType::Ped, &NativeValue::None);
        engine.destroy_object(first.key()).unwrap();
        assert!(!first.is_valid());

        let second = engine.spawn(ObjectType::Ped, &NativeValue::None);
        assert_eq!(first.id(), second.id());
        assert!(second.is_valid());
    }

    #[test]
    fn test_out_of_range_construction_args() {
        let engine = LocalEngine::new();
        let field = |name: &str, n: i64| -> NativeValue {
            [(name, NativeValue::Int(n))].into_iter().collect()
        };
        let huge = field("model", i64::from(u32::MAX) + 1);
        let negative = field("model", -1);
        let deep = field("dimension", i64::from(i32::MIN) - 1);

        for args in [&huge, &negative, &deep] {
            assert!(engine.create_object(ObjectType::Vehicle, args).is_none());
        }
        assert_eq!(engine.object_count(), 0);

        // Direct spawns fall back to the defaults
        let vehicle = engine.spawn(ObjectType::Vehicle, &huge);
        assert_eq!(vehicle.model(), Some(0));

        let fits = field("model", i64::from(u32::MAX));
        let created = engine.create_object(ObjectType::Vehicle, &fits).unwrap();
        assert_eq!(created.model(), Some(u32::MAX));
    }

    #[test]
    fn test_destroy_unknown_object() {
        let engine = LocalEngine::new();
        let key = ObjectKey::new(ObjectType::Blip, 42);
        assert!(matches!(
            engine.destroy_object(key),
            Err(NativeError::UnknownObject(k)) if k == key
        ));
    }

    #[test]
    fn test_construction_args() {
        let engine = LocalEngine::new();
        let args: NativeValue = [
            ("model", NativeValue::from(7)),
            ("pos", NativeValue::Vector3([1.0, 2.0, 3.0])),
        ]
        .into_iter()
        .collect();

        let player = engine.create_object(ObjectType::Player, &args).unwrap();
        assert_eq!(player.model(), Some(7));
        assert_eq!(player.position(), Some([1.0, 2.0, 3.0]));
        assert_eq!(player.visible(), Some(true));
    }

    #[test]
    fn test_create_rejects_non_dict_args() {
        let engine = LocalEngine::new();
        assert!(engine.create_object(ObjectType::Vehicle, &NativeValue::from("fast")).is_none());
        assert_eq!(engine.object_count(), 0);
    }

    #[test]
    fn test_entity_stores() {
        let engine = LocalEngine::new();
        let blip = engine.spawn(ObjectType::Blip, &NativeValue::None);
        let player = engine.spawn(ObjectType::Player, &NativeValue::None);

        assert!(blip.meta_store(MetaNamespace::Local).is_some());
        assert!(blip.meta_store(MetaNamespace::Synced).is_none());
        assert!(player.meta_store(MetaNamespace::StreamSynced).is_some());
        assert!(player.meta_store(MetaNamespace::PlayerLocal).is_some());
    }

    #[test]
    fn test_toggle_event() {
        let engine = LocalEngine::new();
        assert!(engine.is_event_enabled(EventKind::PlayerDeath));
        engine.toggle_event(EventKind::PlayerDeath, false);
        assert!(!engine.is_event_enabled(EventKind::PlayerDeath));
        engine.toggle_event(EventKind::PlayerDeath, true);
        assert!(engine.is_event_enabled(EventKind::PlayerDeath));
    }

    #[test]
    fn test_emit_remote_targets_players_only() {
        let engine = LocalEngine::new();
        let player = engine.spawn(ObjectType::Player, &NativeValue::None);
        let vehicle = engine.spawn(ObjectType::Vehicle, &NativeValue::None);

        engine
            .emit_remote(Some(player.key()), "hello", vec![1.into()], Delivery::Reliable)
            .unwrap();
        assert!(engine
            .emit_remote(Some(vehicle.key()), "hello", vec![], Delivery::Unreliable)
            .is_err());

        let outbox = engine.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].name, "hello");
        assert_eq!(outbox[0].delivery, Delivery::Reliable);
        assert!(engine.take_outbox().is_empty());
    }
}

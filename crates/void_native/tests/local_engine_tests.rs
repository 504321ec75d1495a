//! Integration tests for the in-memory native engine

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::Mutex;
use void_native::*;

struct RecordingListener {
    destroyed: Mutex<Vec<ObjectKey>>,
}

impl LifecycleListener for RecordingListener {
    fn on_object_destroyed(&self, key: ObjectKey) {
        self.destroyed.lock().push(key);
    }
}

#[test]
fn test_listener_receives_destroy_notifications() {
    let engine = LocalEngine::new();
    let listener = Arc::new(RecordingListener {
        destroyed: Mutex::new(Vec::new()),
    });
    let weak: Weak<dyn LifecycleListener> =
        Arc::downgrade(&listener) as Weak<dyn LifecycleListener>;
    engine.add_lifecycle_listener(weak);

    let vehicle = engine.spawn(ObjectType::Vehicle, &NativeValue::None);
    engine.destroy_object(vehicle.key()).unwrap();

    assert_eq!(*listener.destroyed.lock(), vec![vehicle.key()]);
}

#[test]
fn test_dropped_listener_is_skipped() {
    let engine = LocalEngine::new();
    {
        let listener = Arc::new(RecordingListener {
            destroyed: Mutex::new(Vec::new()),
        });
        let weak: Weak<dyn LifecycleListener> =
        Arc::downgrade(&listener) as Weak<dyn LifecycleListener>;
        engine.add_lifecycle_listener(weak);
    }

    let ped = engine.spawn(ObjectType::Ped, &NativeValue::None);
    assert!(engine.destroy_object(ped.key()).is_ok());
}

#[test]
fn test_concurrent_lookups() {
    let engine = Arc::new(LocalEngine::new());
    let keys: Vec<ObjectKey> = (0..32)
        .map(|_| engine.spawn(ObjectType::Vehicle, &NativeValue::None).key())
        .collect();
    let hits = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            let keys = keys.clone();
            let hits = hits.clone();
            thread::spawn(move || {
                for key in keys {
                    if engine.object_by_id(key.object_type, key.id).is_some() {
                        hits.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(hits.load(Ordering::Relaxed), 4 * 32);
}

#[test]
fn test_metadata_stores_are_per_object() {
    let engine = LocalEngine::new();
    let a = engine.spawn(ObjectType::Vehicle, &NativeValue::None);
    let b = engine.spawn(ObjectType::Vehicle, &NativeValue::None);

    a.meta_store(MetaNamespace::Local).unwrap().set("fuel", 50.into());
    assert!(b.meta_store(MetaNamespace::Local).unwrap().get("fuel").is_none());
    assert_eq!(
        a.meta_store(MetaNamespace::Local).unwrap().get("fuel"),
        Some(NativeValue::Int(50))
    );
}

#[test]
fn test_entities_lists_only_entities() {
    let engine = LocalEngine::new();
    engine.spawn(ObjectType::Blip, &NativeValue::None);
    engine.spawn(ObjectType::Player, &NativeValue::None);
    engine.spawn(ObjectType::Vehicle, &NativeValue::None);
    engine.spawn(ObjectType::Checkpoint, &NativeValue::None);

    let types: Vec<ObjectType> = engine.entities().iter().map(|e| e.object_type()).collect();
    assert_eq!(types, vec![ObjectType::Player, ObjectType::Vehicle]);
}

//! Integration tests for wrapper identity
//!
//! Covers uniqueness per context, isolation between contexts, invalidation on
//! destroy and replacement when an ID is reused.

mod common;

use std::sync::Arc;
use std::thread;

use common::{alt_call, Harness};
use void_bridge::*;
use void_native::{BaseObject, LocalEngine, MetaNamespace, NativeEngine, NativeValue, ObjectType};

#[test]
fn test_get_or_create_returns_identical_wrapper() {
    let h = Harness::server();
    let ctx = h.start("res");
    let vehicle = h.engine.spawn(ObjectType::Vehicle, &NativeValue::None);

    let a = ctx.wrapper_by_id(ObjectType::Vehicle, vehicle.id()).unwrap();
    let b = ctx.wrapper_by_id(ObjectType::Vehicle, vehicle.id()).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(ctx.wrapper_count(), 1);
}

#[test]
fn test_contexts_have_separate_wrappers() {
    let h = Harness::server();
    let first = h.start("first");
    let second = h.start("second");
    let ped = h.engine.spawn(ObjectType::Ped, &NativeValue::None);

    let a = first.wrapper_by_id(ObjectType::Ped, ped.id()).unwrap();
    let b = second.wrapper_by_id(ObjectType::Ped, ped.id()).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a.key(), b.key());
    assert_eq!(a.context_id(), first.id());
    assert_eq!(b.context_id(), second.id());
}

#[test]
fn test_destroy_invalidates_every_context() {
    let h = Harness::server();
    let first = h.start("first");
    let second = h.start("second");
    let vehicle = h.engine.spawn(ObjectType::Vehicle, &NativeValue::None);

    let a = first.wrapper_by_id(ObjectType::Vehicle, vehicle.id()).unwrap();
    let b = second.wrapper_by_id(ObjectType::Vehicle, vehicle.id()).unwrap();

    first.call_method(&a, "destroy", vec![]).unwrap();

    assert!(!a.valid());
    assert!(!b.valid());
    assert!(first.cached_wrapper(vehicle.key()).is_none());
    assert!(second.cached_wrapper(vehicle.key()).is_none());
    assert_eq!(
        first.get_property(&a, "valid").unwrap(),
        ScriptValue::Bool(false)
    );
}

#[test]
fn test_dead_wrapper_rejects_access() {
    let h = Harness::server();
    let ctx = h.start("res");
    let vehicle = h.engine.spawn(ObjectType::Vehicle, &NativeValue::None);
    let wrapper = ctx.wrapper_by_id(ObjectType::Vehicle, vehicle.id()).unwrap();

    h.engine.destroy_object(vehicle.key()).unwrap();

    let err = ctx.get_property(&wrapper, "model").unwrap_err();
    assert!(matches!(err, BridgeError::InvalidObject(k) if k == vehicle.key()));
    assert!(ctx.meta(&wrapper, MetaNamespace::Local).is_err());
    assert!(ctx.call_method(&wrapper, "destroy", vec![]).is_err());
}

#[test]
fn test_reincarnated_id_gets_fresh_wrapper() {
    let h = Harness::server();
    let ctx = h.start("res");
    let first = h.engine.spawn(ObjectType::Ped, &NativeValue::None);
    let old = ctx.wrapper_by_id(ObjectType::Ped, first.id()).unwrap();
    let id = first.id();

    h.engine.destroy_object(first.key()).unwrap();
    drop(first);
    let second = h.engine.spawn(ObjectType::Ped, &NativeValue::None);
    assert_eq!(second.id(), id);

    let new = ctx.wrapper_by_id(ObjectType::Ped, id).unwrap();
    assert!(!Arc::ptr_eq(&old, &new));
    assert!(new.valid());
    assert!(!old.valid());
}

#[test]
fn test_stale_cache_entry_is_replaced() {
    // Standalone context: nobody tells the registry about the destroy
    common::init_logger();
    let engine = Arc::new(LocalEngine::new());
    let ctx = ExecutionContext::new(
        ContextId(99),
        "detached",
        engine.clone(),
        Arc::new(BindingCatalog::new()),
        Arc::new(BridgeConfig::default()),
    );

    let first = engine.spawn(ObjectType::Vehicle, &NativeValue::None);
    let old = ctx.wrapper_by_id(ObjectType::Vehicle, first.id()).unwrap();
    engine.destroy_object(first.key()).unwrap();
    let second = engine.spawn(ObjectType::Vehicle, &NativeValue::None);
    assert_eq!(second.key(), old.key());

    // The old object is still alive in `first`, but no longer the one bound
    assert!(ctx.cached_wrapper(second.key()).is_some());
    let new = ctx.wrapper_by_id(ObjectType::Vehicle, second.id()).unwrap();
    assert!(!Arc::ptr_eq(&old, &new));
    assert!(Arc::ptr_eq(&new, &ctx.cached_wrapper(second.key()).unwrap()));
    assert_eq!(ctx.wrapper_count(), 1);
}

#[test]
fn test_find_by_type_and_id() {
    let h = Harness::server();
    let ctx = h.start("res");
    let blip = h.engine.spawn(ObjectType::Blip, &NativeValue::None);

    assert!(ctx.find_by_type_and_id(ObjectType::Blip, blip.id()).is_some());
    assert!(ctx.find_by_type_and_id(ObjectType::Vehicle, blip.id()).is_none());
    assert!(ctx.find_by_type_and_id(ObjectType::Blip, 1000).is_none());
}

#[test]
fn test_get_by_id_statics() {
    let h = Harness::server();
    let ctx = h.start("res");
    let player = h.engine.spawn(ObjectType::Player, &NativeValue::None);

    let by_base = ctx
        .call_static("BaseObject", "getByID", vec!["player".into(), player.id().into()])
        .unwrap();
    let by_player = ctx
        .call_static("Player", "getByID", vec![player.id().into()])
        .unwrap();
    assert_eq!(by_base, by_player);
    assert!(matches!(by_base, ScriptValue::Handle(_)));

    let missing = ctx.call_static("Player", "getByID", vec![77.into()]).unwrap();
    assert_eq!(missing, ScriptValue::Null);

    let via_alt = alt_call(&ctx, "getByID", vec![0.into(), player.id().into()]).unwrap();
    assert_eq!(via_alt, by_base);

    assert!(ctx.call_static("Entity", "getByID", vec![0.into()]).is_err());
    assert!(ctx.call_static("Player", "getByID", vec![]).is_err());
}

#[test]
fn test_wrapper_properties() {
    let h = Harness::server();
    let ctx = h.start("res");
    let args: NativeValue = [
        ("model", NativeValue::from(42)),
        ("pos", NativeValue::Vector3([1.0, 2.0, 3.0])),
        ("dimension", NativeValue::from(5)),
    ]
    .into_iter()
    .collect();
    let vehicle = h.engine.spawn(ObjectType::Vehicle, &args);
    let this = ctx.wrapper_by_id(ObjectType::Vehicle, vehicle.id()).unwrap();

    assert_eq!(ctx.get_property(&this, "type").unwrap(), ScriptValue::Int(1));
    assert_eq!(ctx.get_property(&this, "id").unwrap(), ScriptValue::Int(vehicle.id() as i64));
    assert_eq!(ctx.get_property(&this, "model").unwrap(), ScriptValue::Int(42));
    assert_eq!(ctx.get_property(&this, "dimension").unwrap(), ScriptValue::Int(5));
    assert_eq!(ctx.get_property(&this, "visible").unwrap(), ScriptValue::Bool(true));
    assert_eq!(
        ctx.get_property(&this, "pos").unwrap().as_vector3(),
        Some([1.0, 2.0, 3.0])
    );

    ctx.set_property(&this, "dimension", ScriptValue::Int(-1)).unwrap();
    assert_eq!(vehicle.dimension(), Some(-1));
    assert!(ctx.set_property(&this, "pos", ScriptValue::from("up")).is_err());
    assert!(ctx.get_property(&this, "health").is_err());
}

#[test]
fn test_blip_has_base_members_only() {
    let h = Harness::server();
    let ctx = h.start("res");
    let blip = h.engine.spawn(ObjectType::Blip, &NativeValue::None);
    let this = ctx.wrapper_by_id(ObjectType::Blip, blip.id()).unwrap();

    assert_eq!(this.class().name, "BaseObject");
    assert!(ctx.get_property(&this, "pos").is_err());
    assert!(ctx.meta(&this, MetaNamespace::Synced).is_err());
    assert!(ctx.meta(&this, MetaNamespace::Local).is_ok());
}

#[test]
fn test_concurrent_wrapper_creation() {
    let h = Harness::server();
    let ctx = h.start("res");
    let vehicle = h.engine.spawn(ObjectType::Vehicle, &NativeValue::None);
    let id = vehicle.id();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = ctx.clone();
            thread::spawn(move || ctx.wrapper_by_id(ObjectType::Vehicle, id).unwrap())
        })
        .collect();
    let wrappers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for wrapper in &wrappers[1..] {
        assert!(Arc::ptr_eq(&wrappers[0], wrapper));
    }
    assert_eq!(ctx.wrapper_count(), 1);
}

#[test]
fn test_stopped_context_releases_wrappers() {
    let h = Harness::server();
    let ctx = h.start("res");
    let vehicle = h.engine.spawn(ObjectType::Vehicle, &NativeValue::None);
    ctx.wrapper_by_id(ObjectType::Vehicle, vehicle.id()).unwrap();

    assert!(h.runtime.stop_resource("res"));
    assert_eq!(ctx.wrapper_count(), 0);
    assert_eq!(h.runtime.notify_object_destroyed(vehicle.key()), 0);
}

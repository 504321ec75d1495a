//! Integration tests for entity factories and `createEntity`

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{counting_function, cpp_call, Harness};
use void_bridge::*;
use void_native::{BaseObject, NativeEngine, NativeValue, ObjectType};

fn model_args(model: i64) -> ScriptValue {
    [("model", ScriptValue::Int(model))].into_iter().collect()
}

#[test]
fn test_default_construction() {
    let h = Harness::server();
    let broadcasts = h.register_entity_binding();
    let ctx = h.start("res");

    let player = ctx.create_entity(ObjectType::Player, model_args(7)).unwrap();
    assert!(player.valid());
    assert_eq!(player.object_type(), ObjectType::Player);
    assert_eq!(player.native().unwrap().model(), Some(7));
    assert_eq!(broadcasts.load(Ordering::SeqCst), 1);
    assert_eq!(h.engine.object_count(), 1);

    // Same wrapper as a later lookup
    let again = ctx.wrapper_by_id(ObjectType::Player, player.id()).unwrap();
    assert!(Arc::ptr_eq(&player, &again));
}

#[test]
fn test_create_entity_through_cpp_bindings() {
    let h = Harness::server();
    let broadcasts = h.register_entity_binding();
    let ctx = h.start("res");

    let created = cpp_call(&ctx, "createEntity", vec!["vehicle".into(), model_args(3)]).unwrap();
    let handle = created.as_handle().unwrap();
    assert_eq!(handle.object_type(), ObjectType::Vehicle);
    assert_eq!(ctx.get_property(handle, "model").unwrap(), ScriptValue::Int(3));
    assert_eq!(broadcasts.load(Ordering::SeqCst), 1);

    let err = cpp_call(&ctx, "createEntity", vec!["vehicle".into()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

#[test]
fn test_create_entity_requires_object_args() {
    let h = Harness::server();
    let broadcasts = h.register_entity_binding();
    let ctx = h.start("res");
    let (factory, calls) = counting_function("spawnVehicle");
    ctx.set_factory(ObjectType::Vehicle, factory).unwrap();

    for bad in [ScriptValue::Int(3), "model".into(), ScriptValue::Null] {
        let err = cpp_call(&ctx, "createEntity", vec!["vehicle".into(), bad]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert!(err.to_string().contains("argument 1 must be a plain object"));
    }
    let err = cpp_call(&ctx, "createEntity", vec!["ped".into(), ScriptValue::Int(1)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(broadcasts.load(Ordering::SeqCst), 0);
    assert_eq!(h.engine.object_count(), 0);
}

#[test]
fn test_factory_write_once() {
    let h = Harness::server();
    let ctx = h.start("res");
    let (first, _) = counting_function("first");
    let (second, _) = counting_function("second");

    cpp_call(&ctx, "setEntityFactory", vec!["ped".into(), first.clone().into()]).unwrap();
    let err = cpp_call(&ctx, "setEntityFactory", vec!["ped".into(), second.into()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateRegistration);
    assert_eq!(err.to_string(), "Entity factory already registered: ped");

    let current = cpp_call(&ctx, "getEntityFactory", vec!["ped".into()]).unwrap();
    assert!(current.as_function().unwrap().ptr_eq(&first));
    assert_eq!(
        cpp_call(&ctx, "getEntityFactory", vec!["vehicle".into()]).unwrap(),
        ScriptValue::Null
    );
}

#[test]
fn test_factories_are_per_context() {
    let h = Harness::server();
    let first = h.start("first");
    let second = h.start("second");
    let (factory, _) = counting_function("factory");

    first.set_factory(ObjectType::Ped, factory).unwrap();
    assert!(first.factory(ObjectType::Ped).is_some());
    assert!(second.factory(ObjectType::Ped).is_none());
}

#[test]
fn test_factory_override_returns_handle() {
    let h = Harness::server();
    let broadcasts = h.register_entity_binding();
    let ctx = h.start("res");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let factory = ScriptFunction::new("spawnPed", move |ctx: &ExecutionContext, args| {
        counter.fetch_add(1, Ordering::SeqCst);
        // Custom construction: tag the object before handing it back
        let native = ctx
            .engine()
            .create_object(ObjectType::Ped, &ctx.to_native(&args[0])?)
            .ok_or_else(|| BridgeError::throw("engine refused"))?;
        native
            .meta_store(void_native::MetaNamespace::Local)
            .unwrap()
            .set("custom", NativeValue::Bool(true));
        Ok(ScriptValue::Handle(ctx.wrapper_for(&native)))
    });
    ctx.set_factory(ObjectType::Ped, factory).unwrap();

    let ped = ctx.create_entity(ObjectType::Ped, model_args(9)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(broadcasts.load(Ordering::SeqCst), 1);
    assert_eq!(ped.native().unwrap().model(), Some(9));
    assert_eq!(
        ctx.meta(&ped, void_native::MetaNamespace::Local).unwrap().get("custom").unwrap(),
        ScriptValue::Bool(true)
    );
}

#[test]
fn test_factory_error_propagates_verbatim() {
    let h = Harness::server();
    let broadcasts = h.register_entity_binding();
    let ctx = h.start("res");
    let factory =
        ScriptFunction::new("spawnVehicle", |_, _| Err(BridgeError::throw("garage is full")));
    ctx.set_factory(ObjectType::Vehicle, factory).unwrap();

    let err = ctx.create_entity(ObjectType::Vehicle, ScriptValue::Undefined).unwrap_err();
    assert!(matches!(&err, BridgeError::Script(message) if message == "garage is full"));
    assert_eq!(broadcasts.load(Ordering::SeqCst), 0);
    assert_eq!(h.engine.object_count(), 0);
}

#[test]
fn test_factory_without_result_fails_creation() {
    let h = Harness::server();
    let broadcasts = h.register_entity_binding();
    let ctx = h.start("res");
    let (factory, calls) = counting_function("spawnNothing");
    ctx.set_factory(ObjectType::Vehicle, factory).unwrap();

    let err = ctx.create_entity(ObjectType::Vehicle, model_args(1)).unwrap_err();
    assert!(matches!(err, BridgeError::CreationFailed(ObjectType::Vehicle)));
    assert_eq!(err.kind(), ErrorKind::Creation);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(broadcasts.load(Ordering::SeqCst), 0);
}

#[test]
fn test_factory_wrong_type_fails_creation() {
    let h = Harness::server();
    h.register_entity_binding();
    let ctx = h.start("res");
    let factory = ScriptFunction::new("spawnPed", |ctx: &ExecutionContext, _| {
        let ped = ctx
            .engine()
            .create_object(ObjectType::Ped, &NativeValue::None)
            .ok_or_else(|| BridgeError::throw("engine refused"))?;
        Ok(ScriptValue::Handle(ctx.wrapper_for(&ped)))
    });
    ctx.set_factory(ObjectType::Vehicle, factory).unwrap();

    let err = ctx.create_entity(ObjectType::Vehicle, ScriptValue::Undefined).unwrap_err();
    assert!(matches!(err, BridgeError::CreationFailed(ObjectType::Vehicle)));
}

#[test]
fn test_missing_broadcast_export() {
    let h = Harness::server();
    let ctx = h.start("res");

    let err = ctx.create_entity(ObjectType::Ped, ScriptValue::Undefined).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.to_string().contains("Failed to get entity:addEntityToAll function"));
}

#[test]
fn test_broadcast_export_must_be_function() {
    let h = Harness::server();
    let ctx = h.start("res");
    ctx.register_export("entity:addEntityToAll", ScriptValue::Int(1)).unwrap();

    let err = ctx.create_entity(ObjectType::Ped, ScriptValue::Undefined).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn test_unconvertible_construction_args() {
    let h = Harness::server();
    h.register_entity_binding();
    let ctx = h.start("res");

    let args: ScriptValue = [("model", ScriptValue::Symbol("m".into()))].into_iter().collect();
    let err = ctx.create_entity(ObjectType::Ped, args).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);
    assert_eq!(h.engine.object_count(), 0);
}

#[test]
fn test_get_all_entities() {
    let h = Harness::server();
    let ctx = h.start("res");
    let player = h.engine.spawn(ObjectType::Player, &NativeValue::None);
    let vehicle = h.engine.spawn(ObjectType::Vehicle, &NativeValue::None);
    h.engine.spawn(ObjectType::Blip, &NativeValue::None);

    let all = cpp_call(&ctx, "getAllEntities", vec![]).unwrap();
    let ScriptValue::Array(items) = all else {
        panic!("expected an array");
    };
    let mut keys: Vec<_> = items
        .iter()
        .map(|item| item.as_handle().unwrap().key())
        .collect();
    keys.sort();
    let mut expected = vec![player.key(), vehicle.key()];
    expected.sort();
    assert_eq!(keys, expected);

    // Wrappers are the cached ones
    let cached = ctx.cached_wrapper(player.key()).unwrap();
    assert!(items.iter().any(|item| Arc::ptr_eq(item.as_handle().unwrap(), &cached)));
}

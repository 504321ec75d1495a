//! Custom entity factories
//!
//! A resource may take over construction of one object type by registering
//! a factory function. `createEntity` then calls the factory instead of the
//! engine's default constructor.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use void_native::ObjectType;

use crate::context::ExecutionContext;
use crate::error::{BridgeError, RegistrationKind, Result};
use crate::object::ScriptObject;
use crate::value::{ScriptFunction, ScriptValue};

/// Write-once factory slots, one per object type
#[derive(Default)]
pub struct FactoryTable {
    factories: RwLock<HashMap<ObjectType, ScriptFunction>>,
}

impl FactoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for a type
    pub fn set(&self, object_type: ObjectType, factory: ScriptFunction) -> Result<()> {
        let mut factories = self.factories.write();
        if factories.contains_key(&object_type) {
            return Err(BridgeError::duplicate(
                RegistrationKind::Factory,
                object_type.name(),
            ));
        }
        factories.insert(object_type, factory);
        Ok(())
    }

    pub fn get(&self, object_type: ObjectType) -> Option<ScriptFunction> {
        self.factories.read().get(&object_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    pub fn clear(&self) {
        self.factories.write().clear();
    }
}

/// Create an object of a type and announce it to the resource
pub(crate) fn create_entity(
    context: &ExecutionContext,
    object_type: ObjectType,
    args: ScriptValue,
) -> Result<Arc<ScriptObject>> {
    let native = match context.factory(object_type) {
        Some(factory) => {
            let produced = context.call_function(&factory, vec![args])?;
            match produced {
                ScriptValue::Handle(handle) if handle.object_type() == object_type => {
                    handle.native().ok()
                }
                ScriptValue::Handle(handle) => {
                    log::warn!(
                        "[{}] Factory for {} returned a {}",
                        context.resource_name(),
                        object_type,
                        handle.object_type()
                    );
                    None
                }
                _ => None,
            }
        }
        None => {
            let native_args = context.to_native(&args)?;
            context.engine().create_object(object_type, &native_args)
        }
    };
    let native = native.ok_or(BridgeError::CreationFailed(object_type))?;
    let wrapper = context.wrapper_for(&native);

    let export_name = &context.config().broadcast_export;
    let broadcast = match context.export(export_name) {
        Some(ScriptValue::Function(function)) => function,
        _ => {
            return Err(BridgeError::internal(format!(
                "Failed to get {} function",
                export_name
            )))
        }
    };
    context.call_function(&broadcast, vec![ScriptValue::Handle(wrapper.clone())])?;

    Ok(wrapper)
}

/// Wrappers for every live entity
pub(crate) fn all_entities(context: &ExecutionContext) -> Vec<Arc<ScriptObject>> {
    context
        .engine()
        .entities()
        .iter()
        .map(|native| context.wrapper_for(native))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_write_once() {
        let table = FactoryTable::new();
        let first = ScriptFunction::new("first", |_, _| Ok(ScriptValue::Undefined));
        let second = ScriptFunction::new("second", |_, _| Ok(ScriptValue::Undefined));

        table.set(ObjectType::Vehicle, first.clone()).unwrap();
        let err = table.set(ObjectType::Vehicle, second).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::DuplicateRegistration {
                kind: RegistrationKind::Factory,
                ..
            }
        ));
        assert!(table.get(ObjectType::Vehicle).unwrap().ptr_eq(&first));
        assert!(table.get(ObjectType::Ped).is_none());
    }

    #[test]
    fn test_factory_types_are_independent() {
        let table = FactoryTable::new();
        let f = ScriptFunction::new("f", |_, _| Ok(ScriptValue::Null));
        table.set(ObjectType::Vehicle, f.clone()).unwrap();
        table.set(ObjectType::Ped, f).unwrap();
        assert_eq!(table.len(), 2);
        table.clear();
        assert!(table.is_empty());
    }
}

//! Host modules exposed to bindings
//!
//! - `alt`: native engine operations (events, remote emission, lookups)
//! - `cppBindings`: host-provided hooks (factories, exports, event toggles)
//!
//! Both are installed as the `__alt` / `__cppBindings` globals while bindings
//! initialize.

use std::collections::HashMap;

use void_native::Delivery;

use crate::args::FunctionArgs;
use crate::class::ClassTemplate;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::value::{ScriptFunction, ScriptValue};

pub type HostFunctionPtr = fn(&ExecutionContext, FunctionArgs) -> Result<ScriptValue>;

pub struct HostFunction {
    pub name: &'static str,
    pub function: HostFunctionPtr,
}

/// Static namespace of host functions
pub struct HostModule {
    pub name: &'static str,
    pub functions: &'static [HostFunction],
    /// Classes whose statics are exposed as sub-namespaces
    pub classes: &'static [&'static ClassTemplate],
}

impl HostModule {
    /// Build the script namespace object for a context
    pub fn namespace(&self, context: &ExecutionContext) -> ScriptValue {
        let mut members: HashMap<String, ScriptValue> = self
            .functions
            .iter()
            .map(|f| (f.name.to_string(), ScriptValue::Function(host_function(f.name, f.function))))
            .collect();

        for class in self.classes {
            let statics: HashMap<String, ScriptValue> = class
                .statics
                .iter()
                .map(|s| {
                    let function = host_function(s.name, s.function);
                    (s.name.to_string(), ScriptValue::Function(function))
                })
                .collect();
            members.insert(class.name.to_string(), ScriptValue::Object(statics));
        }

        members.insert(
            "resourceName".to_string(),
            ScriptValue::String(context.resource_name().to_string()),
        );
        ScriptValue::Object(members)
    }

    pub fn find(&self, name: &str) -> Option<&'static HostFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

fn host_function(name: &'static str, function: HostFunctionPtr) -> ScriptFunction {
    ScriptFunction::new(name, move |context: &ExecutionContext, args: Vec<ScriptValue>| {
        function(context, FunctionArgs::new(name, args))
    })
}

// ========== cppBindings ==========

pub static CPP_BINDINGS: HostModule = HostModule {
    name: "cppBindings",
    functions: &[
        HostFunction {
            name: "toggleEvent",
            function: toggle_event,
        },
        HostFunction {
            name: "setEntityFactory",
            function: set_entity_factory,
        },
        HostFunction {
            name: "getEntityFactory",
            function: get_entity_factory,
        },
        HostFunction {
            name: "createEntity",
            function: create_entity,
        },
        HostFunction {
            name: "getAllEntities",
            function: get_all_entities,
        },
        HostFunction {
            name: "registerExport",
            function: register_export,
        },
    ],
    classes: &[],
};

fn toggle_event(context: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(2)?;
    let kind = args.event_kind(0)?;
    let enabled = args.bool(1)?;
    context.engine().toggle_event(kind, enabled);
    Ok(ScriptValue::Undefined)
}

fn set_entity_factory(context: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(2)?;
    let object_type = args.object_type(0)?;
    let factory = args.function(1)?;
    context.set_factory(object_type, factory)?;
    Ok(ScriptValue::Undefined)
}

fn get_entity_factory(context: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(1)?;
    let object_type = args.object_type(0)?;
    Ok(context
        .factory(object_type)
        .map(ScriptValue::Function)
        .unwrap_or(ScriptValue::Null))
}

fn create_entity(context: &ExecutionContext, mut args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(2)?;
    let object_type = args.object_type(0)?;
    let construction_args = args.take_object(1)?;
    let wrapper = context.create_entity(object_type, construction_args)?;
    Ok(ScriptValue::Handle(wrapper))
}

fn get_all_entities(context: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(0)?;
    Ok(ScriptValue::Array(
        context
            .all_entities()
            .into_iter()
            .map(ScriptValue::Handle)
            .collect(),
    ))
}

fn register_export(context: &ExecutionContext, mut args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(2)?;
    let name = args.string(0)?.to_string();
    let value = args.take(1);
    context.register_export(&name, value)?;
    Ok(ScriptValue::Undefined)
}

// ========== alt ==========

pub static ALT: HostModule = HostModule {
    name: "alt",
    functions: &[
        HostFunction {
            name: "on",
            function: on,
        },
        HostFunction {
            name: "off",
            function: off,
        },
        HostFunction {
            name: "emitRemote",
            function: emit_remote,
        },
        HostFunction {
            name: "emitRemoteUnreliable",
            function: emit_remote_unreliable,
        },
        HostFunction {
            name: "getByID",
            function: get_by_id,
        },
    ],
    classes: &[&crate::class::BASE_OBJECT, &crate::class::PLAYER],
};

fn on(context: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(2)?;
    let event = args.string(0)?;
    let handler = args.function(1)?;
    context.on(event, handler);
    Ok(ScriptValue::Undefined)
}

fn off(context: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(2)?;
    let event = args.string(0)?;
    let handler = args.function(1)?;
    Ok(ScriptValue::Bool(context.off(event, &handler)))
}

fn emit_remote(context: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    emit_remote_with(context, args, Delivery::Reliable)
}

fn emit_remote_unreliable(context: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    emit_remote_with(context, args, Delivery::Unreliable)
}

/// `emitRemote(target | null, name, ...args)`; a null target broadcasts
fn emit_remote_with(
    context: &ExecutionContext,
    args: FunctionArgs,
    delivery: Delivery,
) -> Result<ScriptValue> {
    args.check_min(2)?;
    let target = if args.get(0).is_nullish() {
        None
    } else {
        Some(args.handle(0)?.native()?.key())
    };
    let name = args.string(1)?;
    let payload = context.to_native_args(args.rest(2))?;
    context.engine().emit_remote(target, name, payload, delivery)?;
    Ok(ScriptValue::Undefined)
}

fn get_by_id(context: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(2)?;
    let object_type = args.object_type(0)?;
    let id = args.u32(1)?;
    Ok(context
        .wrapper_by_id(object_type, id)
        .map(ScriptValue::Handle)
        .unwrap_or(ScriptValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_tables() {
        assert_eq!(CPP_BINDINGS.name, "cppBindings");
        assert!(CPP_BINDINGS.find("setEntityFactory").is_some());
        assert!(CPP_BINDINGS.find("on").is_none());
        assert!(ALT.find("emitRemoteUnreliable").is_some());
    }

    #[test]
    fn test_function_names_are_unique() {
        for module in [&CPP_BINDINGS, &ALT] {
            let mut names: Vec<_> = module.functions.iter().map(|f| f.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), module.functions.len(), "{}", module.name);
        }
    }
}

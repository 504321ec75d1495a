//! Value marshalling between native and script representations
//!
//! Script → native:
//! - `Undefined` / `Null` become `None`, handles become object references
//! - script functions become [`NativeFunction`]s that re-enter the owning
//!   context, held weakly, and return `None` once it has stopped
//! - symbols, dead handles and over-deep nesting are conversion errors
//!
//! Native → script:
//! - object references resolve through the identity registry (`Null` when
//!   nothing live matches)
//! - vectors become `{x, y, z}`
//! - native functions become script functions that convert their arguments

use std::collections::HashMap;

use void_native::{NativeFunction, NativeValue};

use crate::context::ExecutionContext;
use crate::error::{BridgeError, Result};
use crate::value::{ScriptFunction, ScriptValue};

/// Convert a script value for the native side
pub fn to_native(context: &ExecutionContext, value: &ScriptValue) -> Result<NativeValue> {
    to_native_at(context, value, 0)
}

fn to_native_at(
    context: &ExecutionContext,
    value: &ScriptValue,
    depth: usize,
) -> Result<NativeValue> {
    let max_depth = context.config().max_conversion_depth;
    if depth >= max_depth {
        return Err(BridgeError::conversion(format!(
            "value nesting exceeds {} levels",
            max_depth
        )));
    }

    Ok(match value {
        ScriptValue::Undefined | ScriptValue::Null => NativeValue::None,
        ScriptValue::Bool(b) => NativeValue::Bool(*b),
        ScriptValue::Int(n) => NativeValue::Int(*n),
        ScriptValue::Float(f) => NativeValue::Float(*f),
        ScriptValue::String(s) => NativeValue::String(s.clone()),
        ScriptValue::Array(items) => NativeValue::List(
            items
                .iter()
                .map(|item| to_native_at(context, item, depth + 1))
                .collect::<Result<Vec<_>>>()?,
        ),
        ScriptValue::Object(map) => NativeValue::Dict(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), to_native_at(context, v, depth + 1)?)))
                .collect::<Result<HashMap<_, _>>>()?,
        ),
        ScriptValue::Handle(handle) => {
            if !handle.valid() {
                return Err(BridgeError::conversion(format!(
                    "object {} is no longer valid",
                    handle.key()
                )));
            }
            NativeValue::Object(handle.key())
        }
        ScriptValue::Function(function) => {
            NativeValue::Function(wrap_script_function(context, function.clone()))
        }
        ScriptValue::Bytes(bytes) => NativeValue::Bytes(bytes.clone()),
        ScriptValue::Symbol(description) => {
            return Err(BridgeError::conversion(format!(
                "Symbol({}) cannot be passed to native code",
                description
            )));
        }
    })
}

/// Convert a native value for a script context
pub fn to_script(context: &ExecutionContext, value: &NativeValue) -> ScriptValue {
    match value {
        NativeValue::None => ScriptValue::Undefined,
        NativeValue::Bool(b) => ScriptValue::Bool(*b),
        NativeValue::Int(n) => ScriptValue::Int(*n),
        NativeValue::Float(f) => ScriptValue::Float(*f),
        NativeValue::String(s) => ScriptValue::String(s.clone()),
        NativeValue::List(items) => {
            ScriptValue::Array(items.iter().map(|item| to_script(context, item)).collect())
        }
        NativeValue::Dict(map) => ScriptValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_script(context, v)))
                .collect(),
        ),
        NativeValue::Object(key) => context
            .wrapper_by_id(key.object_type, key.id)
            .map(ScriptValue::Handle)
            .unwrap_or(ScriptValue::Null),
        NativeValue::Function(function) => {
            ScriptValue::Function(wrap_native_function(function.clone()))
        }
        NativeValue::Vector3(v) => ScriptValue::vector3(*v),
        NativeValue::Bytes(bytes) => ScriptValue::Bytes(bytes.clone()),
    }
}

/// Convert call arguments, stopping at the first failure
pub fn to_native_args(
    context: &ExecutionContext,
    args: &[ScriptValue],
) -> Result<Vec<NativeValue>> {
    args.iter().map(|arg| to_native(context, arg)).collect()
}

/// Convert call arguments for a script callee
pub fn to_script_args(context: &ExecutionContext, args: &[NativeValue]) -> Vec<ScriptValue> {
    args.iter().map(|arg| to_script(context, arg)).collect()
}

/// Make a script function callable from native code
///
/// The returned function holds its context weakly. When the context is gone
/// or no longer active the call returns `None` without running script code.
/// Script errors and unconvertible results are logged and also yield `None`.
pub fn wrap_script_function(
    context: &ExecutionContext,
    function: ScriptFunction,
) -> NativeFunction {
    let weak = context.downgrade();
    let name = function.name().to_string();

    NativeFunction::new(name.clone(), move |args: Vec<NativeValue>| {
        let Some(context) = weak.upgrade() else {
            log::debug!("Dropped call to '{}': context is gone", name);
            return NativeValue::None;
        };
        // Checked under the runtime lock so a concurrent stop wins
        let _runtime = context.lock_runtime();
        if !context.is_active() {
            log::debug!(
                "Dropped call to '{}': resource '{}' is not running",
                name,
                context.resource_name()
            );
            return NativeValue::None;
        }

        let script_args = to_script_args(&context, &args);
        let result = match function.call(&context, script_args) {
            Ok(result) => result,
            Err(err) => {
                log::error!(
                    "[{}] Uncaught exception in '{}': {}",
                    context.resource_name(),
                    name,
                    err
                );
                return NativeValue::None;
            }
        };

        to_native(&context, &result).unwrap_or_else(|err| {
            log::error!(
                "[{}] Cannot return value from '{}': {}",
                context.resource_name(),
                name,
                err
            );
            NativeValue::None
        })
    })
}

/// Make a native function callable from script code
pub fn wrap_native_function(function: NativeFunction) -> ScriptFunction {
    let name = function.name().to_string();
    ScriptFunction::new(name, move |context: &ExecutionContext, args: Vec<ScriptValue>| {
        let native_args = to_native_args(context, &args)?;
        let result = function.call(native_args);
        Ok(to_script(context, &result))
    })
}

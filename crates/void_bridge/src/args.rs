//! Argument checking for script-facing functions

use std::sync::Arc;

use void_native::{EventKind, ObjectType};

use crate::error::{BridgeError, Result};
use crate::object::ScriptObject;
use crate::value::{ScriptFunction, ScriptValue};

/// Arguments of one script call, with the callee name for error messages
#[derive(Debug)]
pub struct FunctionArgs {
    function: &'static str,
    args: Vec<ScriptValue>,
}

impl FunctionArgs {
    pub fn new(function: &'static str, args: Vec<ScriptValue>) -> Self {
        Self { function, args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Require exactly `count` arguments
    pub fn check_count(&self, count: usize) -> Result<()> {
        if self.args.len() != count {
            return Err(BridgeError::argument(format!(
                "{}: expected {} arguments, got {}",
                self.function,
                count,
                self.args.len()
            )));
        }
        Ok(())
    }

    /// Require at least `count` arguments
    pub fn check_min(&self, count: usize) -> Result<()> {
        if self.args.len() < count {
            return Err(BridgeError::argument(format!(
                "{}: expected at least {} arguments, got {}",
                self.function,
                count,
                self.args.len()
            )));
        }
        Ok(())
    }

    /// Argument at `index`, `Undefined` past the end
    pub fn get(&self, index: usize) -> &ScriptValue {
        const UNDEFINED: &ScriptValue = &ScriptValue::Undefined;
        self.args.get(index).unwrap_or(UNDEFINED)
    }

    /// Arguments from `index` on
    pub fn rest(&self, index: usize) -> &[ScriptValue] {
        self.args.get(index..).unwrap_or(&[])
    }

    pub fn string(&self, index: usize) -> Result<&str> {
        self.get(index)
            .as_str()
            .ok_or_else(|| self.mismatch(index, "string"))
    }

    pub fn bool(&self, index: usize) -> Result<bool> {
        self.get(index)
            .as_bool()
            .ok_or_else(|| self.mismatch(index, "bool"))
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        self.get(index)
            .as_int()
            .ok_or_else(|| self.mismatch(index, "integer"))
    }

    pub fn u32(&self, index: usize) -> Result<u32> {
        u32::try_from(self.int(index)?).map_err(|_| self.mismatch(index, "unsigned 32-bit integer"))
    }

    /// Object type, by discriminant or by name
    pub fn object_type(&self, index: usize) -> Result<ObjectType> {
        let parsed = match self.get(index) {
            ScriptValue::String(name) => name.parse::<ObjectType>().ok(),
            other => other.as_int().and_then(|n| ObjectType::try_from(n).ok()),
        };
        parsed.ok_or_else(|| self.mismatch(index, "object type"))
    }

    /// Event kind, by discriminant or by name
    pub fn event_kind(&self, index: usize) -> Result<EventKind> {
        let parsed = match self.get(index) {
            ScriptValue::String(name) => name.parse::<EventKind>().ok(),
            other => other.as_int().and_then(|n| EventKind::try_from(n).ok()),
        };
        parsed.ok_or_else(|| self.mismatch(index, "event type"))
    }

    pub fn function(&self, index: usize) -> Result<ScriptFunction> {
        self.get(index)
            .as_function()
            .cloned()
            .ok_or_else(|| self.mismatch(index, "function"))
    }

    pub fn handle(&self, index: usize) -> Result<Arc<ScriptObject>> {
        self.get(index)
            .as_handle()
            .cloned()
            .ok_or_else(|| self.mismatch(index, "object"))
    }

    /// Take ownership of the argument at `index`
    pub fn take(&mut self, index: usize) -> ScriptValue {
        self.args
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Take a plain object argument, rejecting every other kind of value
    pub fn take_object(&mut self, index: usize) -> Result<ScriptValue> {
        if !matches!(self.get(index), ScriptValue::Object(_)) {
            return Err(self.mismatch(index, "plain object"));
        }
        Ok(self.take(index))
    }

    fn mismatch(&self, index: usize, expected: &str) -> BridgeError {
        BridgeError::argument(format!(
            "{}: argument {} must be a {}, got {}",
            self.function,
            index,
            expected,
            self.get(index).type_name()
        ))
    }
}

//! Named exports of a resource

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{BridgeError, RegistrationKind, Result};
use crate::value::ScriptValue;

/// Write-once export slots
#[derive(Default)]
pub struct ExportTable {
    exports: RwLock<HashMap<String, ScriptValue>>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, value: ScriptValue) -> Result<()> {
        let mut exports = self.exports.write();
        if exports.contains_key(name) {
            return Err(BridgeError::duplicate(RegistrationKind::Export, name));
        }
        exports.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ScriptValue> {
        self.exports.read().get(name).cloned()
    }

    /// Sorted export names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.exports.write().clear();
    }
}

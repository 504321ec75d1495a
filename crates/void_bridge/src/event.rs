//! Script event handlers
//!
//! Handlers for a named event run in registration order; a handler that
//! throws is logged and does not stop the ones after it.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::value::ScriptFunction;

/// Event handler table of one context
#[derive(Default)]
pub struct EventHandlers {
    handlers: RwLock<HashMap<String, Vec<ScriptFunction>>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler
    pub fn on(&self, event: &str, handler: ScriptFunction) {
        self.handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    /// Unsubscribe the first registration of a handler
    pub fn off(&self, event: &str, handler: &ScriptFunction) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let Some(index) = list.iter().position(|h| h.ptr_eq(handler)) else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            handlers.remove(event);
        }
        true
    }

    /// Snapshot of the handlers for an event
    pub fn handlers(&self, event: &str) -> Vec<ScriptFunction> {
        self.handlers.read().get(event).cloned().unwrap_or_default()
    }

    pub fn count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScriptValue;

    fn handler(name: &str) -> ScriptFunction {
        ScriptFunction::new(name.to_string(), |_, _| Ok(ScriptValue::Undefined))
    }

    #[test]
    fn test_registration_order() {
        let events = EventHandlers::new();
        let (a, b) = (handler("a"), handler("b"));
        events.on("tick", a.clone());
        events.on("tick", b.clone());

        let snapshot = events.handlers("tick");
        assert!(snapshot[0].ptr_eq(&a));
        assert!(snapshot[1].ptr_eq(&b));
    }

    #[test]
    fn test_off_removes_one_registration() {
        let events = EventHandlers::new();
        let a = handler("a");
        events.on("tick", a.clone());
        events.on("tick", a.clone());

        assert!(events.off("tick", &a));
        assert_eq!(events.count("tick"), 1);
        assert!(events.off("tick", &a));
        assert!(!events.off("tick", &a));
        assert!(!events.off("missing", &a));
    }
}

//! Error types for native engine operations

use crate::object::{ObjectKey, ObjectType};
use thiserror::Error;

/// Result type for native operations
pub type Result<T> = std::result::Result<T, NativeError>;

/// Errors reported by a native engine
#[derive(Debug, Clone, Error)]
pub enum NativeError {
    /// Object does not exist (never created or already destroyed)
    #[error("Object {0} does not exist")]
    UnknownObject(ObjectKey),

    /// The object kind does not support the requested operation
    #[error("{object_type} objects do not support '{operation}'")]
    Unsupported {
        object_type: ObjectType,
        operation: &'static str,
    },

    /// Remote event target is not a live player
    #[error("Invalid remote event target {0}")]
    InvalidTarget(ObjectKey),

    /// Unknown object type name or discriminant
    #[error("Unknown object type '{0}'")]
    UnknownType(String),

    /// Unknown event name or discriminant
    #[error("Unknown event '{0}'")]
    UnknownEvent(String),
}

impl NativeError {
    /// Create an unsupported-operation error
    pub fn unsupported(object_type: ObjectType, operation: &'static str) -> Self {
        NativeError::Unsupported {
            object_type,
            operation,
        }
    }
}

//! Error types for the object bridge

use std::fmt;

use thiserror::Error;
use void_native::{MetaNamespace, NativeError, ObjectKey, ObjectType};

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// What a duplicate registration collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    Factory,
    Export,
    Binding,
    Resource,
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Factory => "Entity factory",
            Self::Export => "Export",
            Self::Binding => "Binding",
            Self::Resource => "Resource",
        };
        write!(f, "{}", name)
    }
}

/// Broad error class, for callers that branch on the kind of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    Conversion,
    DuplicateRegistration,
    CircularDependency,
    Creation,
    Script,
    Internal,
}

/// Errors raised by the bridge
///
/// The enum is `Clone` so that a failed binding module can replay its
/// original error on every later load attempt.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// Bad arguments from script code
    #[error("{0}")]
    Argument(String),

    /// Write or delete on a namespace this side may only read
    #[error("{namespace} is read-only")]
    ReadOnlyNamespace { namespace: MetaNamespace },

    /// The native object behind a wrapper is gone
    #[error("Object {0} is no longer valid")]
    InvalidObject(ObjectKey),

    /// A value cannot cross the native/script boundary
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// A write-once slot is already taken
    #[error("{kind} already registered: {name}")]
    DuplicateRegistration { kind: RegistrationKind, name: String },

    /// A binding module was required while it was still evaluating
    #[error("Circular dependency while loading binding '{0}'")]
    CircularDependency(String),

    /// Neither the factory override nor the engine produced an object
    #[error("Failed to create entity of type {0}")]
    CreationFailed(ObjectType),

    /// Exception thrown by script code
    #[error("{0}")]
    Script(String),

    /// Host wiring defect
    #[error("INTERNAL ERROR: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Create an argument error
    pub fn argument(message: impl Into<String>) -> Self {
        BridgeError::Argument(message.into())
    }

    /// Create a conversion error
    pub fn conversion(message: impl Into<String>) -> Self {
        BridgeError::Conversion(message.into())
    }

    /// Create a script exception
    pub fn throw(message: impl Into<String>) -> Self {
        BridgeError::Script(message.into())
    }

    /// Create an internal error and log it
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("INTERNAL ERROR: {}", message);
        BridgeError::Internal(message)
    }

    /// Create a duplicate registration error
    pub fn duplicate(kind: RegistrationKind, name: impl Into<String>) -> Self {
        BridgeError::DuplicateRegistration {
            kind,
            name: name.into(),
        }
    }

    /// Error class
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument(_) | Self::ReadOnlyNamespace { .. } | Self::InvalidObject(_) => {
                ErrorKind::Argument
            }
            Self::Conversion(_) => ErrorKind::Conversion,
            Self::DuplicateRegistration { .. } => ErrorKind::DuplicateRegistration,
            Self::CircularDependency(_) => ErrorKind::CircularDependency,
            Self::CreationFailed(_) => ErrorKind::Creation,
            Self::Script(_) => ErrorKind::Script,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<NativeError> for BridgeError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::UnknownObject(key) => BridgeError::InvalidObject(key),
            other => BridgeError::Argument(other.to_string()),
        }
    }
}

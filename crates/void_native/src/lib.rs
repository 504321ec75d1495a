//! # void_native - Native Side of the Script Bridge
//!
//! Everything the script bridge consumes from the authoritative simulation:
//!
//! - [`NativeValue`]: the tagged-union value model used to cross the boundary
//! - [`ObjectType`] / [`ObjectKey`]: stable (type, id) identity of native objects
//! - [`BaseObject`] / [`MetaStore`]: what a native object exposes to scripts
//! - [`NativeEngine`]: lifecycle, lookup, event control and remote dispatch
//! - [`LocalEngine`]: an in-memory engine for headless hosts and tests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  object_by_id / create   ┌─────────────────┐
//! │  void_bridge    │─────────────────────────▶│  NativeEngine   │
//! │  (per context)  │◀─────────────────────────│  (LocalEngine)  │
//! └─────────────────┘   on_object_destroyed    └────────┬────────┘
//!                                                       │ owns
//!                                                       ▼
//!                                              ┌─────────────────┐
//!                                              │ Arc<BaseObject> │
//!                                              │  meta stores    │
//!                                              └─────────────────┘
//! ```
//!
//! The engine owns every object. Scripts only ever hold weak references,
//! so an object may disappear between two script calls.

mod error;
mod value;
mod object;
mod engine;
mod local;

pub use error::{NativeError, Result};
pub use value::{NativeFn, NativeFunction, NativeValue};
pub use object::{BaseObject, MetaMap, MetaNamespace, MetaStore, ObjectKey, ObjectType};
pub use engine::{Delivery, EventKind, LifecycleListener, NativeEngine};
pub use local::{LocalEngine, LocalObject, RemoteEvent};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{NativeError, Result};
    pub use crate::value::{NativeFunction, NativeValue};
    pub use crate::object::{BaseObject, MetaNamespace, MetaStore, ObjectKey, ObjectType};
    pub use crate::engine::{Delivery, EventKind, LifecycleListener, NativeEngine};
    pub use crate::local::{LocalEngine, LocalObject};
}

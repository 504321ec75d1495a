//! # void_bridge - Native ↔ Script Object Bridge
//!
//! Lets script resources running in isolated execution contexts observe and
//! mutate native simulation objects.
//!
//! ## Overview
//!
//! - Every native object gets a lazily created wrapper, unique per context
//! - Metadata namespaces are exposed as dynamic properties
//! - Binding modules are evaluated lazily, once, with cycle detection
//! - Resources may override native construction per object type
//! - Values and callables are marshalled in both directions
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐ start/stop ┌──────────────────────────────────────┐
//! │  BridgeRuntime  │───────────▶│ ExecutionContext (one per resource)  │
//! └────────┬────────┘            │  IdentityRegistry   ModuleCache      │
//!          │ on_object_destroyed │  FactoryTable       ExportTable      │
//!          │                     │  EventHandlers      globals          │
//! ┌────────┴────────┐            └──────────────┬───────────────────────┘
//! │  NativeEngine   │◀── object_by_id / create ─┘
//! └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use void_bridge::prelude::*;
//! use void_native::LocalEngine;
//!
//! let engine = Arc::new(LocalEngine::new());
//! let catalog = Arc::new(BindingCatalog::new());
//! let runtime = BridgeRuntime::new(engine, catalog, BridgeConfig::default());
//!
//! let (context, _) = runtime.start_resource("freeroam")?;
//! let player = context.wrapper_by_id(ObjectType::Player, 0);
//! ```

mod args;
mod binding;
mod class;
mod config;
mod context;
mod error;
mod event;
mod export;
mod factory;
mod host_module;
mod marshal;
mod meta;
mod object;
mod runtime;
mod value;

pub use args::FunctionArgs;
pub use binding::{
    Binding, BindingCatalog, BindingScope, BindingSource, InitializeReport, ModuleBody,
    ModuleNamespace, ModuleRecord, ModuleScope, ModuleStatus, ScriptCompiler, TemporaryGlobal,
    TEMPORARY_GLOBALS,
};
pub use class::{
    ClassTemplate, MethodDescriptor, PropertyContext, PropertyDescriptor, StaticDescriptor,
    BASE_OBJECT, ENTITY, PLAYER, WORLD_OBJECT,
};
pub use config::{BridgeConfig, ConfigError, Side};
pub use context::{ContextId, ContextState, ExecutionContext, WeakContext};
pub use error::{BridgeError, ErrorKind, RegistrationKind, Result};
pub use event::EventHandlers;
pub use export::ExportTable;
pub use factory::FactoryTable;
pub use host_module::{HostFunction, HostModule, ALT, CPP_BINDINGS};
pub use marshal::{
    to_native, to_native_args, to_script, to_script_args, wrap_native_function,
    wrap_script_function,
};
pub use meta::{
    DynamicProperty, LocalMeta, MetaAccessor, PlayerLocalMeta, StreamSyncedMeta, SyncedMeta,
};
pub use object::{IdentityRegistry, ScriptObject};
pub use runtime::{BridgeRuntime, StartReport};
pub use value::{ScriptFn, ScriptFunction, ScriptValue};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::binding::{Binding, BindingCatalog, BindingScope, ModuleScope, ModuleStatus};
    pub use crate::config::{BridgeConfig, Side};
    pub use crate::context::ExecutionContext;
    pub use crate::error::{BridgeError, Result};
    pub use crate::meta::DynamicProperty;
    pub use crate::object::ScriptObject;
    pub use crate::runtime::BridgeRuntime;
    pub use crate::value::{ScriptFunction, ScriptValue};
    pub use void_native::{MetaNamespace, ObjectType};
}

//! Script class descriptor tables
//!
//! Every wrapper class is a static [`ClassTemplate`]: plain properties with a
//! getter and optional setter, methods, dynamic (metadata) properties and
//! static functions. Lookups walk the parent chain, so `Player` sees the
//! members of `Entity`, `WorldObject` and `BaseObject`.
//!
//! ```text
//! BaseObject ── type, valid, destroy(), meta, getByID(type, id)
//!   └─ WorldObject ── pos, dimension
//!        └─ Entity ── id, model, visible, syncedMeta, streamSyncedMeta
//!             └─ Player ── localMeta, emit(), emitUnreliable(), getByID(id)
//! ```

use std::sync::Arc;

use void_native::{BaseObject, Delivery, MetaNamespace, ObjectType};

use crate::args::FunctionArgs;
use crate::context::ExecutionContext;
use crate::error::{BridgeError, Result};
use crate::object::ScriptObject;
use crate::value::ScriptValue;

/// Receiver of a property or method call
pub struct PropertyContext<'a> {
    pub context: &'a ExecutionContext,
    pub this: &'a Arc<ScriptObject>,
}

impl PropertyContext<'_> {
    /// Native object behind `this`, failing if it is gone
    pub fn native(&self) -> Result<Arc<dyn BaseObject>> {
        self.this.native()
    }
}

pub type Getter = fn(&PropertyContext<'_>) -> Result<ScriptValue>;
pub type Setter = fn(&PropertyContext<'_>, ScriptValue) -> Result<()>;
pub type Method = fn(&PropertyContext<'_>, FunctionArgs) -> Result<ScriptValue>;
pub type StaticFunction = fn(&ExecutionContext, FunctionArgs) -> Result<ScriptValue>;

/// `{name, getter, setter?}`
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub getter: Getter,
    pub setter: Option<Setter>,
}

pub struct MethodDescriptor {
    pub name: &'static str,
    pub method: Method,
}

pub struct StaticDescriptor {
    pub name: &'static str,
    pub function: StaticFunction,
}

/// Static description of a script class
pub struct ClassTemplate {
    pub name: &'static str,
    pub parent: Option<&'static ClassTemplate>,
    pub properties: &'static [PropertyDescriptor],
    pub methods: &'static [MethodDescriptor],
    pub dynamic: &'static [MetaNamespace],
    pub statics: &'static [StaticDescriptor],
}

impl ClassTemplate {
    /// Most derived class for an object type
    pub fn for_type(object_type: ObjectType) -> &'static ClassTemplate {
        if object_type == ObjectType::Player {
            &PLAYER
        } else if object_type.is_entity() {
            &ENTITY
        } else if object_type.is_world_object() {
            &WORLD_OBJECT
        } else {
            &BASE_OBJECT
        }
    }

    /// Class by script name
    pub fn by_name(name: &str) -> Option<&'static ClassTemplate> {
        ALL_CLASSES.iter().copied().find(|class| class.name == name)
    }

    /// This class followed by its ancestors
    pub fn chain(&'static self) -> impl Iterator<Item = &'static ClassTemplate> {
        std::iter::successors(Some(self), |class| class.parent)
    }

    pub fn find_property(&'static self, name: &str) -> Option<&'static PropertyDescriptor> {
        self.chain()
            .flat_map(|class| class.properties.iter())
            .find(|p| p.name == name)
    }

    pub fn find_method(&'static self, name: &str) -> Option<&'static MethodDescriptor> {
        self.chain()
            .flat_map(|class| class.methods.iter())
            .find(|m| m.name == name)
    }

    /// Static functions are not inherited
    pub fn find_static(&self, name: &str) -> Option<&'static StaticDescriptor> {
        self.statics.iter().find(|s| s.name == name)
    }

    /// Dynamic property by script name (`meta`, `syncedMeta`, ...)
    pub fn find_dynamic(&'static self, name: &str) -> Option<MetaNamespace> {
        self.chain()
            .flat_map(|class| class.dynamic.iter().copied())
            .find(|ns| ns.property_name() == name)
    }

    pub fn has_dynamic(&'static self, namespace: MetaNamespace) -> bool {
        self.chain().any(|class| class.dynamic.contains(&namespace))
    }

    pub fn is_subclass_of(&'static self, other: &ClassTemplate) -> bool {
        self.chain().any(|class| std::ptr::eq(class, other))
    }

    /// Every member name visible on instances, most derived first
    pub fn member_names(&'static self) -> Vec<&'static str> {
        self.chain()
            .flat_map(|class| {
                class
                    .properties
                    .iter()
                    .map(|p| p.name)
                    .chain(class.methods.iter().map(|m| m.name))
                    .chain(class.dynamic.iter().map(|ns| ns.property_name()))
            })
            .collect()
    }
}

pub static ALL_CLASSES: [&ClassTemplate; 4] = [&BASE_OBJECT, &WORLD_OBJECT, &ENTITY, &PLAYER];

// ========== BaseObject ==========

pub static BASE_OBJECT: ClassTemplate = ClassTemplate {
    name: "BaseObject",
    parent: None,
    properties: &[
        PropertyDescriptor {
            name: "type",
            getter: get_type,
            setter: None,
        },
        PropertyDescriptor {
            name: "valid",
            getter: get_valid,
            setter: None,
        },
    ],
    methods: &[MethodDescriptor {
        name: "destroy",
        method: destroy,
    }],
    dynamic: &[MetaNamespace::Local],
    statics: &[StaticDescriptor {
        name: "getByID",
        function: base_get_by_id,
    }],
};

fn get_type(ctx: &PropertyContext<'_>) -> Result<ScriptValue> {
    Ok(ScriptValue::Int(ctx.this.object_type() as i64))
}

// Works on dead objects
fn get_valid(ctx: &PropertyContext<'_>) -> Result<ScriptValue> {
    Ok(ScriptValue::Bool(ctx.this.valid()))
}

fn destroy(ctx: &PropertyContext<'_>, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(0)?;
    let native = ctx.native()?;
    ctx.context.engine().destroy_object(native.key())?;
    Ok(ScriptValue::Undefined)
}

fn base_get_by_id(ctx: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(2)?;
    let object_type = args.object_type(0)?;
    let id = args.u32(1)?;
    Ok(ctx
        .wrapper_by_id(object_type, id)
        .map(ScriptValue::Handle)
        .unwrap_or(ScriptValue::Null))
}

// ========== WorldObject ==========

pub static WORLD_OBJECT: ClassTemplate = ClassTemplate {
    name: "WorldObject",
    parent: Some(&BASE_OBJECT),
    properties: &[
        PropertyDescriptor {
            name: "pos",
            getter: get_pos,
            setter: Some(set_pos),
        },
        PropertyDescriptor {
            name: "dimension",
            getter: get_dimension,
            setter: Some(set_dimension),
        },
    ],
    methods: &[],
    dynamic: &[],
    statics: &[],
};

fn get_pos(ctx: &PropertyContext<'_>) -> Result<ScriptValue> {
    Ok(ctx
        .native()?
        .position()
        .map(ScriptValue::vector3)
        .unwrap_or_default())
}

fn set_pos(ctx: &PropertyContext<'_>, value: ScriptValue) -> Result<()> {
    let native = ctx.native()?;
    let pos = value.as_vector3().ok_or_else(|| {
        BridgeError::argument(format!("pos: expected {{x, y, z}}, got {}", value.type_name()))
    })?;
    native.set_position(pos)?;
    Ok(())
}

fn get_dimension(ctx: &PropertyContext<'_>) -> Result<ScriptValue> {
    Ok(ctx
        .native()?
        .dimension()
        .map(|d| ScriptValue::Int(d as i64))
        .unwrap_or_default())
}

fn set_dimension(ctx: &PropertyContext<'_>, value: ScriptValue) -> Result<()> {
    let native = ctx.native()?;
    let dimension = value
        .as_int()
        .and_then(|d| i32::try_from(d).ok())
        .ok_or_else(|| {
            BridgeError::argument(format!("dimension: expected integer, got {}", value.type_name()))
        })?;
    native.set_dimension(dimension)?;
    Ok(())
}

// ========== Entity ==========

pub static ENTITY: ClassTemplate = ClassTemplate {
    name: "Entity",
    parent: Some(&WORLD_OBJECT),
    properties: &[
        PropertyDescriptor {
            name: "id",
            getter: get_id,
            setter: None,
        },
        PropertyDescriptor {
            name: "model",
            getter: get_model,
            setter: None,
        },
        PropertyDescriptor {
            name: "visible",
            getter: get_visible,
            setter: None,
        },
    ],
    methods: &[],
    dynamic: &[MetaNamespace::Synced, MetaNamespace::StreamSynced],
    statics: &[],
};

fn get_id(ctx: &PropertyContext<'_>) -> Result<ScriptValue> {
    Ok(ScriptValue::Int(ctx.native()?.id() as i64))
}

fn get_model(ctx: &PropertyContext<'_>) -> Result<ScriptValue> {
    Ok(ctx
        .native()?
        .model()
        .map(ScriptValue::from)
        .unwrap_or_default())
}

fn get_visible(ctx: &PropertyContext<'_>) -> Result<ScriptValue> {
    Ok(ctx
        .native()?
        .visible()
        .map(ScriptValue::Bool)
        .unwrap_or_default())
}

// ========== Player ==========

pub static PLAYER: ClassTemplate = ClassTemplate {
    name: "Player",
    parent: Some(&ENTITY),
    properties: &[],
    methods: &[
        MethodDescriptor {
            name: "emit",
            method: emit,
        },
        MethodDescriptor {
            name: "emitUnreliable",
            method: emit_unreliable,
        },
    ],
    dynamic: &[MetaNamespace::PlayerLocal],
    statics: &[StaticDescriptor {
        name: "getByID",
        function: player_get_by_id,
    }],
};

fn emit(ctx: &PropertyContext<'_>, args: FunctionArgs) -> Result<ScriptValue> {
    emit_to_player(ctx, args, Delivery::Reliable)
}

fn emit_unreliable(ctx: &PropertyContext<'_>, args: FunctionArgs) -> Result<ScriptValue> {
    emit_to_player(ctx, args, Delivery::Unreliable)
}

fn emit_to_player(
    ctx: &PropertyContext<'_>,
    args: FunctionArgs,
    delivery: Delivery,
) -> Result<ScriptValue> {
    args.check_min(1)?;
    let name = args.string(0)?;
    let native = ctx.native()?;
    let payload = ctx.context.to_native_args(args.rest(1))?;
    ctx.context
        .engine()
        .emit_remote(Some(native.key()), name, payload, delivery)?;
    Ok(ScriptValue::Undefined)
}

fn player_get_by_id(ctx: &ExecutionContext, args: FunctionArgs) -> Result<ScriptValue> {
    args.check_count(1)?;
    let id = args.u32(0)?;
    Ok(ctx
        .wrapper_by_id(ObjectType::Player, id)
        .map(ScriptValue::Handle)
        .unwrap_or(ScriptValue::Null))
}

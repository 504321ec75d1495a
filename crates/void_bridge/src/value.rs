//! Script-side values
//!
//! [`ScriptValue`] is the value model of an execution context. Object
//! wrappers travel as [`ScriptValue::Handle`], callables as
//! [`ScriptValue::Function`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::object::ScriptObject;

/// Script callable type
pub type ScriptFn =
    Arc<dyn Fn(&ExecutionContext, Vec<ScriptValue>) -> Result<ScriptValue> + Send + Sync>;

/// A function callable by script code
///
/// Functions compare by identity, like their native counterpart.
#[derive(Clone)]
pub struct ScriptFunction {
    name: Arc<str>,
    func: ScriptFn,
}

impl ScriptFunction {
    /// Create a new script function
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&ExecutionContext, Vec<ScriptValue>) -> Result<ScriptValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Function name, for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function directly
    ///
    /// Does not take the runtime lock; external callers go through
    /// [`ExecutionContext::call_function`].
    pub fn call(&self, context: &ExecutionContext, args: Vec<ScriptValue>) -> Result<ScriptValue> {
        (self.func)(context, args)
    }

    /// Check whether two handles refer to the same function
    pub fn ptr_eq(&self, other: &ScriptFunction) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl PartialEq for ScriptFunction {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.name)
            .finish()
    }
}

/// Runtime value inside an execution context
#[derive(Debug, Clone, Default)]
pub enum ScriptValue {
    /// Missing value
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer (64-bit signed)
    Int(i64),
    /// Float (64-bit)
    Float(f64),
    /// String
    String(String),
    /// Array of values
    Array(Vec<ScriptValue>),
    /// Plain object
    Object(HashMap<String, ScriptValue>),
    /// Wrapper of a native object
    Handle(Arc<ScriptObject>),
    /// Callable
    Function(ScriptFunction),
    /// Byte buffer
    Bytes(Vec<u8>),
    /// Unique symbol, never crosses to the native side
    Symbol(String),
}

impl ScriptValue {
    /// Build a `{x, y, z}` object
    pub fn vector3(v: [f32; 3]) -> Self {
        [("x", v[0]), ("y", v[1]), ("z", v[2])]
            .into_iter()
            .map(|(k, c)| (k, ScriptValue::Float(c as f64)))
            .collect()
    }

    /// Check if value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check if value is undefined or null
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Get type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Handle(_) => "handle",
            Self::Function(_) => "function",
            Self::Bytes(_) => "bytes",
            Self::Symbol(_) => "symbol",
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as integer (floats with no fractional part included)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Try to get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as object wrapper
    pub fn as_handle(&self) -> Option<&Arc<ScriptObject>> {
        match self {
            Self::Handle(h) => Some(h),
            _ => None,
        }
    }

    /// Try to get as function
    pub fn as_function(&self) -> Option<&ScriptFunction> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Try to get as a 3D vector: `{x, y, z}` or a three-element array
    pub fn as_vector3(&self) -> Option<[f32; 3]> {
        match self {
            Self::Object(map) => Some([
                map.get("x")?.as_float()? as f32,
                map.get("y")?.as_float()? as f32,
                map.get("z")?.as_float()? as f32,
            ]),
            Self::Array(items) if items.len() == 3 => Some([
                items[0].as_float()? as f32,
                items[1].as_float()? as f32,
                items[2].as_float()? as f32,
            ]),
            _ => None,
        }
    }

    /// Get a field of a plain object
    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => (a - b).abs() < f64::EPSILON,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => {
                (*a as f64 - b).abs() < f64::EPSILON
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Handle(a), Self::Handle(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            // Symbols are unique
            (Self::Symbol(_), Self::Symbol(_)) => false,
            _ => false,
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::Array(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::Object(map) => {
                let mut items: Vec<String> =
                    map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                items.sort();
                write!(f, "{{{}}}", items.join(", "))
            }
            Self::Handle(h) => write!(f, "<{} {}>", h.class().name, h.key()),
            Self::Function(func) => write!(f, "<function {}>", func.name()),
            Self::Bytes(b) => write!(f, "<bytes {}>", b.len()),
            Self::Symbol(s) => write!(f, "Symbol({})", s),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for ScriptValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for ScriptValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Arc<ScriptObject>> for ScriptValue {
    fn from(v: Arc<ScriptObject>) -> Self {
        Self::Handle(v)
    }
}

impl From<ScriptFunction> for ScriptValue {
    fn from(v: ScriptFunction) -> Self {
        Self::Function(v)
    }
}

impl<V: Into<ScriptValue>> From<Vec<V>> for ScriptValue {
    fn from(v: Vec<V>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<ScriptValue>> FromIterator<(K, V)> for ScriptValue {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

//! Native value representation
//!
//! [`NativeValue`] is what crosses the boundary between the engine and a
//! script context: metadata values, event arguments, construction arguments
//! and function call arguments all use it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::object::ObjectKey;

/// Native function type
pub type NativeFn = Arc<dyn Fn(Vec<NativeValue>) -> NativeValue + Send + Sync>;

/// A function callable from the native side
///
/// Functions compare by identity: two clones of the same function are equal,
/// two separately created functions never are.
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    func: NativeFn,
}

impl NativeFunction {
    /// Create a new native function
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(Vec<NativeValue>) -> NativeValue + Send + Sync + 'static,
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

    /// Call the function
    pub fn call(&self, args: Vec<NativeValue>) -> NativeValue {
        (self.func)(args)
    }

    /// Check whether two handles refer to the same function
    pub fn ptr_eq(&self, other: &NativeFunction) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish()
    }
}

/// Tagged-union value shared by the engine and the script bridge
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NativeValue {
    /// Absent value
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// Integer (64-bit signed)
    Int(i64),
    /// Float (64-bit)
    Float(f64),
    /// String
    String(String),
    /// Ordered sequence
    List(Vec<NativeValue>),
    /// Key/value mapping
    Dict(HashMap<String, NativeValue>),
    /// Reference to a native object by identity
    Object(ObjectKey),
    /// Callable function
    Function(NativeFunction),
    /// 3D vector
    Vector3([f32; 3]),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl NativeValue {
    /// Check if value is none
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Get type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
            Self::Vector3(_) => "vector3",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
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

    /// Try to get as a 3D vector (accepts a three-element numeric list too)
    pub fn as_vector3(&self) -> Option<[f32; 3]> {
        match self {
            Self::Vector3(v) => Some(*v),
            Self::List(items) if items.len() == 3 => Some([
                items[0].as_float()? as f32,
                items[1].as_float()? as f32,
                items[2].as_float()? as f32,
            ]),
            _ => None,
        }
    }

    /// Try to get as dict
    pub fn as_dict(&self) -> Option<&HashMap<String, NativeValue>> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Get a field from a dict value
    pub fn get(&self, key: &str) -> Option<&NativeValue> {
        self.as_dict()?.get(key)
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for NativeValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for NativeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for NativeValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<[f32; 3]> for NativeValue {
    fn from(v: [f32; 3]) -> Self {
        Self::Vector3(v)
    }
}

impl From<ObjectKey> for NativeValue {
    fn from(v: ObjectKey) -> Self {
        Self::Object(v)
    }
}

impl<V: Into<NativeValue>> From<Vec<V>> for NativeValue {
    fn from(v: Vec<V>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<NativeValue>> FromIterator<(K, V)> for NativeValue {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::Dict(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_identity() {
        let f = NativeFunction::new("noop", |_| NativeValue::None);
        let g = NativeFunction::new("noop", |_| NativeValue::None);
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
        assert_eq!(f.name(), "noop");
    }

    #[test]
    fn test_function_call() {
        let add = NativeFunction::new("add", |args| {
            let sum: i64 = args.iter().filter_map(NativeValue::as_int).sum();
            NativeValue::Int(sum)
        });
        assert_eq!(add.call(vec![1.into(), 2.into(), 3.into()]), NativeValue::Int(6));
    }

    #[test]
    fn test_vector_from_list() {
        let v = NativeValue::List(vec![1.into(), 2.5.into(), 3.into()]);
        assert_eq!(v.as_vector3(), Some([1.0, 2.5, 3.0]));
        assert_eq!(NativeValue::List(vec![1.into()]).as_vector3(), None);
    }
}

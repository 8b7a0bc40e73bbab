//! Expected-shape descriptors for marshaling.

use crate::value::{MapKey, MarshaledValue};
use std::fmt;

/// Key type of a map shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// String keys
    String,
    /// Integer keys
    Int,
}

/// What a native parameter expects to receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Any value, passed untouched
    Any,
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    UInt64,
    /// Floating point number
    Float,
    /// String
    String,
    /// Sequence of one element shape
    Sequence(Box<Shape>),
    /// Set of one element shape
    Set(Box<Shape>),
    /// Map with the given key and value shapes
    Map(KeyShape, Box<Shape>),
    /// Record of the named type
    Record(String),
    /// Handle, optionally of a specific registered type
    Handle(Option<String>),
    /// Value or null; may be omitted when trailing in a parameter list
    Optional(Box<Shape>),
}

impl Shape {
    /// Sequence of `element`
    pub fn sequence(element: Shape) -> Self {
        Shape::Sequence(Box::new(element))
    }

    /// Set of `element`
    pub fn set(element: Shape) -> Self {
        Shape::Set(Box::new(element))
    }

    /// Map from `key` to `value`
    pub fn map(key: KeyShape, value: Shape) -> Self {
        Shape::Map(key, Box::new(value))
    }

    /// Optional `inner`
    pub fn optional(inner: Shape) -> Self {
        Shape::Optional(Box::new(inner))
    }

    /// Handle of the named type
    pub fn handle_of(type_name: impl Into<String>) -> Self {
        Shape::Handle(Some(type_name.into()))
    }

    /// Check if this shape may be omitted at the end of an argument list
    pub fn is_optional(&self) -> bool {
        matches!(self, Shape::Optional(_))
    }

    /// The most specific shape describing `value`.
    ///
    /// Marshaling a value against its own shape returns it unchanged.
    pub fn of(value: &MarshaledValue) -> Shape {
        match value {
            MarshaledValue::Null => Shape::Any,
            MarshaledValue::Bool(_) => Shape::Bool,
            MarshaledValue::Int32(_) => Shape::Int32,
            MarshaledValue::Int64(_) => Shape::Int64,
            MarshaledValue::UInt64(_) => Shape::UInt64,
            MarshaledValue::Float(_) => Shape::Float,
            MarshaledValue::String(_) => Shape::String,
            MarshaledValue::Sequence(items) => Shape::sequence(common_shape(items.iter())),
            MarshaledValue::Set(items) => Shape::set(common_shape(items.iter())),
            MarshaledValue::Map(entries) => {
                let key = if entries.keys().all(|k| matches!(k, MapKey::Int(_))) {
                    KeyShape::Int
                } else {
                    KeyShape::String
                };
                // Mixed key kinds only survive untouched as Any
                if key == KeyShape::String && entries.keys().any(|k| matches!(k, MapKey::Int(_))) {
                    return Shape::Any;
                }
                Shape::map(key, common_shape(entries.values()))
            }
            MarshaledValue::Record(r) => Shape::Record(r.type_name.clone()),
            MarshaledValue::Handle(h) => Shape::handle_of(h.type_name()),
        }
    }
}

fn common_shape<'a>(mut values: impl Iterator<Item = &'a MarshaledValue>) -> Shape {
    let first = match values.next() {
        Some(v) => Shape::of(v),
        None => return Shape::Any,
    };
    if values.all(|v| Shape::of(v) == first) {
        first
    } else {
        Shape::Any
    }
}

impl fmt::Display for KeyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyShape::String => write!(f, "String"),
            KeyShape::Int => write!(f, "Int"),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Any => write!(f, "Any"),
            Shape::Bool => write!(f, "Bool"),
            Shape::Int32 => write!(f, "Int32"),
            Shape::Int64 => write!(f, "Int64"),
            Shape::UInt64 => write!(f, "UInt64"),
            Shape::Float => write!(f, "Float"),
            Shape::String => write!(f, "String"),
            Shape::Sequence(e) => write!(f, "Sequence<{}>", e),
            Shape::Set(e) => write!(f, "Set<{}>", e),
            Shape::Map(k, v) => write!(f, "Map<{}, {}>", k, v),
            Shape::Record(name) => write!(f, "Record<{}>", name),
            Shape::Handle(Some(name)) => write!(f, "Handle<{}>", name),
            Shape::Handle(None) => write!(f, "Handle"),
            Shape::Optional(inner) => write!(f, "Optional<{}>", inner),
        }
    }
}

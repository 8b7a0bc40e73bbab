//! Values crossing the script boundary.
//!
//! [`MarshaledValue`] is the tagged union every argument and return value is
//! expressed in while it travels between the script host and native code.

use crate::handle::NativeHandle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Largest integer a script number represents exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Key of a marshaled map
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapKey {
    /// Integer key
    Int(i64),
    /// String key
    Str(String),
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Int(n) => write!(f, "{}", n),
            MapKey::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for MapKey {
    fn from(n: i64) -> Self {
        MapKey::Int(n)
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::Str(s.to_string())
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        MapKey::Str(s)
    }
}

/// Set of values, unique by value equality
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<MarshaledValue>")]
pub struct ValueSet(Vec<MarshaledValue>);

impl ValueSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning false if an equal value is present
    pub fn insert(&mut self, value: MarshaledValue) -> bool {
        if self.0.contains(&value) {
            return false;
        }
        self.0.push(value);
        true
    }

    /// Check membership
    pub fn contains(&self, value: &MarshaledValue) -> bool {
        self.0.contains(value)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate members in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, MarshaledValue> {
        self.0.iter()
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl FromIterator<MarshaledValue> for ValueSet {
    fn from_iter<I: IntoIterator<Item = MarshaledValue>>(iter: I) -> Self {
        let mut set = ValueSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl From<Vec<MarshaledValue>> for ValueSet {
    fn from(values: Vec<MarshaledValue>) -> Self {
        values.into_iter().collect()
    }
}

impl IntoIterator for ValueSet {
    type Item = MarshaledValue;
    type IntoIter = std::vec::IntoIter<MarshaledValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// User-defined record: a type name plus named fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Declared record type
    pub type_name: String,
    /// Field values by name
    pub fields: BTreeMap<String, MarshaledValue>,
}

impl Record {
    /// Create an empty record of the given type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<MarshaledValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Read a field as a native value
    pub fn field<T: crate::marshal::FromScript>(&self, name: &str) -> crate::error::Result<T> {
        let value = self.fields.get(name).unwrap_or(&MarshaledValue::Null);
        T::from_script(value).map_err(|e| e.at(format!(".{}", name)))
    }
}

/// Value crossing the script boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarshaledValue {
    /// Absent value (undefined, null, void return)
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// Script number that is not known to be an integer
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence
    Sequence(Vec<MarshaledValue>),
    /// Set of unique values
    Set(ValueSet),
    /// Mapping from string-or-integer key to value
    Map(BTreeMap<MapKey, MarshaledValue>),
    /// User-defined record
    Record(Record),
    /// Reference to a native object
    Handle(NativeHandle),
}

impl MarshaledValue {
    /// Name of the value's variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            MarshaledValue::Null => "Null",
            MarshaledValue::Bool(_) => "Bool",
            MarshaledValue::Int32(_) => "Int32",
            MarshaledValue::Int64(_) => "Int64",
            MarshaledValue::UInt64(_) => "UInt64",
            MarshaledValue::Float(_) => "Float",
            MarshaledValue::String(_) => "String",
            MarshaledValue::Sequence(_) => "Sequence",
            MarshaledValue::Set(_) => "Set",
            MarshaledValue::Map(_) => "Map",
            MarshaledValue::Record(_) => "Record",
            MarshaledValue::Handle(_) => "Handle",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, MarshaledValue::Null)
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MarshaledValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MarshaledValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as handle
    pub fn as_handle(&self) -> Option<&NativeHandle> {
        match self {
            MarshaledValue::Handle(h) => Some(h),
            _ => None,
        }
    }

    /// Build a string-keyed map from pairs
    pub fn map_of<K, V, I>(pairs: I) -> Self
    where
        K: Into<MapKey>,
        V: Into<MarshaledValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        MarshaledValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Finite number in script form: exponent notation below 1e-6 or from 1e21 up
fn write_number(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x == 0.0 {
        return write!(f, "0");
    }
    let magnitude = x.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let exp = format!("{:e}", x);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                write!(f, "{}e+{}", mantissa, power)
            }
            _ => write!(f, "{}", exp),
        };
    }
    write!(f, "{}", x)
}

/// Script-style rendering, as used by `console.log` and `print`
impl fmt::Display for MarshaledValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshaledValue::Null => write!(f, "null"),
            MarshaledValue::Bool(b) => write!(f, "{}", b),
            MarshaledValue::Int32(n) => write!(f, "{}", n),
            MarshaledValue::Int64(n) => write!(f, "{}", n),
            MarshaledValue::UInt64(n) => write!(f, "{}", n),
            MarshaledValue::Float(x) if x.is_nan() => write!(f, "NaN"),
            MarshaledValue::Float(x) if x.is_infinite() => {
                write!(f, "{}Infinity", if *x < 0.0 { "-" } else { "" })
            }
            MarshaledValue::Float(x) => write_number(f, *x),
            MarshaledValue::String(s) => write!(f, "{}", s),
            MarshaledValue::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if !item.is_null() {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            MarshaledValue::Set(_) => write!(f, "[object Set]"),
            MarshaledValue::Map(_) => write!(f, "[object Object]"),
            MarshaledValue::Record(r) => write!(f, "[object {}]", r.type_name),
            MarshaledValue::Handle(h) => write!(f, "[object {}]", h.type_name()),
        }
    }
}

impl From<()> for MarshaledValue {
    fn from(_: ()) -> Self {
        MarshaledValue::Null
    }
}

impl From<bool> for MarshaledValue {
    fn from(b: bool) -> Self {
        MarshaledValue::Bool(b)
    }
}

impl From<i32> for MarshaledValue {
    fn from(n: i32) -> Self {
        MarshaledValue::Int32(n)
    }
}

impl From<i64> for MarshaledValue {
    fn from(n: i64) -> Self {
        MarshaledValue::Int64(n)
    }
}

impl From<u64> for MarshaledValue {
    fn from(n: u64) -> Self {
        MarshaledValue::UInt64(n)
    }
}

impl From<f64> for MarshaledValue {
    fn from(x: f64) -> Self {
        MarshaledValue::Float(x)
    }
}

impl From<&str> for MarshaledValue {
    fn from(s: &str) -> Self {
        MarshaledValue::String(s.to_string())
    }
}

impl From<String> for MarshaledValue {
    fn from(s: String) -> Self {
        MarshaledValue::String(s)
    }
}

impl From<Record> for MarshaledValue {
    fn from(r: Record) -> Self {
        MarshaledValue::Record(r)
    }
}

impl From<NativeHandle> for MarshaledValue {
    fn from(h: NativeHandle) -> Self {
        MarshaledValue::Handle(h)
    }
}

impl From<Vec<MarshaledValue>> for MarshaledValue {
    fn from(items: Vec<MarshaledValue>) -> Self {
        MarshaledValue::Sequence(items)
    }
}

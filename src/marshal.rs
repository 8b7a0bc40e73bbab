//! Value marshaling between script and native representations.
//!
//! [`marshal_in`] checks and normalises a [`MarshaledValue`] against an
//! expected [`Shape`]. The [`FromScript`] / [`IntoScript`] traits do the same
//! for concrete Rust types, and [`FromArgs`] turns a whole argument list into a
//! tuple of native parameters.
//!
//! Integers keep their width and signedness: narrowing that does not fit is a
//! `Range` error, never a truncation.

use crate::error::{BridgeError, Result};
use crate::handle::NativeHandle;
use crate::shape::{KeyShape, Shape};
use crate::value::{MapKey, MarshaledValue, Record, ValueSet};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// Marshal a script value to the shape a native parameter expects.
pub fn marshal_in(value: &MarshaledValue, shape: &Shape) -> Result<MarshaledValue> {
    match shape {
        Shape::Any => Ok(value.clone()),
        Shape::Optional(inner) => match value {
            MarshaledValue::Null => Ok(MarshaledValue::Null),
            other => marshal_in(other, inner),
        },
        Shape::Bool => match value {
            MarshaledValue::Bool(b) => Ok(MarshaledValue::Bool(*b)),
            other => Err(mismatch(shape, other)),
        },
        Shape::Int32 => {
            let n = integer_in(value, shape)?;
            i32::try_from(n)
                .map(MarshaledValue::Int32)
                .map_err(|_| BridgeError::range(n, shape.to_string()))
        }
        Shape::Int64 => {
            let n = integer_in(value, shape)?;
            i64::try_from(n)
                .map(MarshaledValue::Int64)
                .map_err(|_| BridgeError::range(n, shape.to_string()))
        }
        Shape::UInt64 => {
            let n = integer_in(value, shape)?;
            u64::try_from(n)
                .map(MarshaledValue::UInt64)
                .map_err(|_| BridgeError::range(n, shape.to_string()))
        }
        Shape::Float => match value {
            MarshaledValue::Float(x) => Ok(MarshaledValue::Float(*x)),
            MarshaledValue::Int32(n) => Ok(MarshaledValue::Float(f64::from(*n))),
            MarshaledValue::Int64(n) => Ok(MarshaledValue::Float(*n as f64)),
            MarshaledValue::UInt64(n) => Ok(MarshaledValue::Float(*n as f64)),
            other => Err(mismatch(shape, other)),
        },
        Shape::String => match value {
            MarshaledValue::String(s) => Ok(MarshaledValue::String(s.clone())),
            // Numbers coerce to their script rendering
            n @ (MarshaledValue::Int32(_)
            | MarshaledValue::Int64(_)
            | MarshaledValue::UInt64(_)
            | MarshaledValue::Float(_)) => Ok(MarshaledValue::String(n.to_string())),
            other => Err(mismatch(shape, other)),
        },
        Shape::Sequence(element) => match value {
            MarshaledValue::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| marshal_in(item, element).map_err(|e| e.at(format!("[{}]", i))))
                .collect::<Result<Vec<_>>>()
                .map(MarshaledValue::Sequence),
            other => Err(mismatch(shape, other)),
        },
        Shape::Set(element) => {
            let mut set = ValueSet::new();
            for (i, item) in set_members(value, shape.clone())?.into_iter().enumerate() {
                set.insert(marshal_in(item, element).map_err(|e| e.at(format!("[{}]", i)))?);
            }
            Ok(MarshaledValue::Set(set))
        }
        Shape::Map(key_shape, value_shape) => match value {
            MarshaledValue::Map(entries) => {
                let mut out = BTreeMap::new();
                for (key, item) in entries {
                    let normalized = key_in(key, *key_shape)?;
                    let item = marshal_in(item, value_shape)
                        .map_err(|e| e.at(format!("[{}]", normalized)))?;
                    if out.insert(normalized, item).is_some() {
                        return Err(duplicate_key(key));
                    }
                }
                Ok(MarshaledValue::Map(out))
            }
            other => Err(mismatch(shape, other)),
        },
        Shape::Record(type_name) => match value {
            MarshaledValue::Record(r) if &r.type_name == type_name => {
                Ok(MarshaledValue::Record(r.clone()))
            }
            MarshaledValue::Record(r) => Err(BridgeError::type_mismatch(
                shape.to_string(),
                format!("Record<{}>", r.type_name),
            )),
            // Plain string-keyed objects are accepted as records
            MarshaledValue::Map(entries) => {
                let mut record = Record::new(type_name.clone());
                for (key, item) in entries {
                    match key {
                        MapKey::Str(name) => {
                            record.fields.insert(name.clone(), item.clone());
                        }
                        MapKey::Int(_) => return Err(mismatch(shape, value)),
                    }
                }
                Ok(MarshaledValue::Record(record))
            }
            other => Err(mismatch(shape, other)),
        },
        Shape::Handle(expected) => match value {
            MarshaledValue::Handle(h) => match expected {
                Some(type_name) if h.type_name() != type_name => Err(BridgeError::type_mismatch(
                    shape.to_string(),
                    format!("Handle<{}>", h.type_name()),
                )),
                _ => Ok(MarshaledValue::Handle(h.clone())),
            },
            other => Err(mismatch(shape, other)),
        },
    }
}

/// Marshal a native value out to its script representation.
pub fn marshal_out<T: IntoScript>(value: T) -> MarshaledValue {
    value.into_script()
}

fn mismatch(shape: &Shape, value: &MarshaledValue) -> BridgeError {
    BridgeError::type_mismatch(shape.to_string(), value.kind())
}

/// Widen any integral script value to i128 for range checking
fn integer_in(value: &MarshaledValue, shape: &Shape) -> Result<i128> {
    match value {
        MarshaledValue::Int32(n) => Ok(i128::from(*n)),
        MarshaledValue::Int64(n) => Ok(i128::from(*n)),
        MarshaledValue::UInt64(n) => Ok(i128::from(*n)),
        MarshaledValue::Float(x) if x.is_finite() && x.fract() == 0.0 => {
            // Saturating cast; anything past i128 is out of range for every target
            Ok(*x as i128)
        }
        MarshaledValue::Float(x) => Err(BridgeError::type_mismatch(
            shape.to_string(),
            format!("Float {}", x),
        )),
        // Decimal strings carry 64-bit values past the script's safe range
        MarshaledValue::String(s) if matches!(shape, Shape::Int64 | Shape::UInt64) => s
            .trim()
            .parse::<i128>()
            .map_err(|_| BridgeError::type_mismatch(shape.to_string(), "non-numeric String")),
        other => Err(mismatch(shape, other)),
    }
}

/// Two source keys that normalise to the same native key
fn duplicate_key(key: &MapKey) -> BridgeError {
    BridgeError::type_mismatch("unique map keys", format!("duplicate key '{}'", key))
        .at(format!("[{}]", key))
}

fn key_in(key: &MapKey, shape: KeyShape) -> Result<MapKey> {
    match (shape, key) {
        (KeyShape::String, MapKey::Str(s)) => Ok(MapKey::Str(s.clone())),
        (KeyShape::String, MapKey::Int(n)) => Ok(MapKey::Str(n.to_string())),
        (KeyShape::Int, MapKey::Int(n)) => Ok(MapKey::Int(*n)),
        // Script object keys are strings even when they look like integers
        (KeyShape::Int, MapKey::Str(s)) => s.parse::<i64>().map(MapKey::Int).map_err(|_| {
            BridgeError::type_mismatch("Int key", format!("String key '{}'", s))
        }),
    }
}

/// Native type that can be produced from a script value
pub trait FromScript: Sized {
    /// Shape this type expects
    fn shape() -> Shape;

    /// Convert from a script value
    fn from_script(value: &MarshaledValue) -> Result<Self>;
}

/// Native type that can be handed back to the script
pub trait IntoScript {
    /// Convert to a script value
    fn into_script(self) -> MarshaledValue;
}

macro_rules! scalar_marshal {
    ($ty:ty, $shape:ident, $variant:ident) => {
        impl FromScript for $ty {
            fn shape() -> Shape {
                Shape::$shape
            }

            fn from_script(value: &MarshaledValue) -> Result<Self> {
                match marshal_in(value, &Shape::$shape)? {
                    MarshaledValue::$variant(v) => Ok(v),
                    other => Err(BridgeError::Internal(format!(
                        "{} marshaled to {}",
                        stringify!($shape),
                        other.kind()
                    ))),
                }
            }
        }

        impl IntoScript for $ty {
            fn into_script(self) -> MarshaledValue {
                MarshaledValue::$variant(self)
            }
        }
    };
}

scalar_marshal!(bool, Bool, Bool);
scalar_marshal!(i32, Int32, Int32);
scalar_marshal!(i64, Int64, Int64);
scalar_marshal!(u64, UInt64, UInt64);
scalar_marshal!(f64, Float, Float);
scalar_marshal!(String, String, String);

impl IntoScript for &str {
    fn into_script(self) -> MarshaledValue {
        MarshaledValue::String(self.to_string())
    }
}

impl IntoScript for () {
    fn into_script(self) -> MarshaledValue {
        MarshaledValue::Null
    }
}

impl FromScript for MarshaledValue {
    fn shape() -> Shape {
        Shape::Any
    }

    fn from_script(value: &MarshaledValue) -> Result<Self> {
        Ok(value.clone())
    }
}

impl IntoScript for MarshaledValue {
    fn into_script(self) -> MarshaledValue {
        self
    }
}

impl FromScript for NativeHandle {
    fn shape() -> Shape {
        Shape::Handle(None)
    }

    fn from_script(value: &MarshaledValue) -> Result<Self> {
        match value {
            MarshaledValue::Handle(h) => Ok(h.clone()),
            other => Err(mismatch(&Self::shape(), other)),
        }
    }
}

impl IntoScript for NativeHandle {
    fn into_script(self) -> MarshaledValue {
        MarshaledValue::Handle(self)
    }
}

impl IntoScript for Record {
    fn into_script(self) -> MarshaledValue {
        MarshaledValue::Record(self)
    }
}

impl<T: FromScript> FromScript for Option<T> {
    fn shape() -> Shape {
        Shape::optional(T::shape())
    }

    fn from_script(value: &MarshaledValue) -> Result<Self> {
        match value {
            MarshaledValue::Null => Ok(None),
            other => T::from_script(other).map(Some),
        }
    }
}

impl<T: IntoScript> IntoScript for Option<T> {
    fn into_script(self) -> MarshaledValue {
        match self {
            Some(v) => v.into_script(),
            None => MarshaledValue::Null,
        }
    }
}

impl<T: FromScript> FromScript for Vec<T> {
    fn shape() -> Shape {
        Shape::sequence(T::shape())
    }

    fn from_script(value: &MarshaledValue) -> Result<Self> {
        match value {
            MarshaledValue::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_script(item).map_err(|e| e.at(format!("[{}]", i))))
                .collect(),
            other => Err(mismatch(&Self::shape(), other)),
        }
    }
}

impl<T: IntoScript> IntoScript for Vec<T> {
    fn into_script(self) -> MarshaledValue {
        MarshaledValue::Sequence(self.into_iter().map(IntoScript::into_script).collect())
    }
}

fn set_members(value: &MarshaledValue, shape: Shape) -> Result<Vec<&MarshaledValue>> {
    match value {
        MarshaledValue::Set(items) => Ok(items.iter().collect()),
        MarshaledValue::Sequence(items) => Ok(items.iter().collect()),
        other => Err(mismatch(&shape, other)),
    }
}

impl<T: FromScript + Ord> FromScript for BTreeSet<T> {
    fn shape() -> Shape {
        Shape::set(T::shape())
    }

    fn from_script(value: &MarshaledValue) -> Result<Self> {
        set_members(value, Self::shape())?
            .into_iter()
            .enumerate()
            .map(|(i, item)| T::from_script(item).map_err(|e| e.at(format!("[{}]", i))))
            .collect()
    }
}

impl<T: IntoScript> IntoScript for BTreeSet<T> {
    fn into_script(self) -> MarshaledValue {
        MarshaledValue::Set(self.into_iter().map(IntoScript::into_script).collect())
    }
}

impl<T: FromScript + Eq + Hash> FromScript for HashSet<T> {
    fn shape() -> Shape {
        Shape::set(T::shape())
    }

    fn from_script(value: &MarshaledValue) -> Result<Self> {
        set_members(value, Self::shape())?
            .into_iter()
            .enumerate()
            .map(|(i, item)| T::from_script(item).map_err(|e| e.at(format!("[{}]", i))))
            .collect()
    }
}

impl<T: IntoScript> IntoScript for HashSet<T> {
    fn into_script(self) -> MarshaledValue {
        MarshaledValue::Set(self.into_iter().map(IntoScript::into_script).collect())
    }
}

/// Native map key type
pub trait ScriptKey: Sized {
    /// Key shape this type expects
    fn key_shape() -> KeyShape;

    /// Convert from a marshaled key
    fn from_key(key: &MapKey) -> Result<Self>;

    /// Convert to a marshaled key
    fn into_key(self) -> MapKey;
}

impl ScriptKey for String {
    fn key_shape() -> KeyShape {
        KeyShape::String
    }

    fn from_key(key: &MapKey) -> Result<Self> {
        match key_in(key, KeyShape::String)? {
            MapKey::Str(s) => Ok(s),
            MapKey::Int(n) => Ok(n.to_string()),
        }
    }

    fn into_key(self) -> MapKey {
        MapKey::Str(self)
    }
}

impl ScriptKey for i64 {
    fn key_shape() -> KeyShape {
        KeyShape::Int
    }

    fn from_key(key: &MapKey) -> Result<Self> {
        match key_in(key, KeyShape::Int)? {
            MapKey::Int(n) => Ok(n),
            MapKey::Str(s) => Err(BridgeError::type_mismatch("Int key", s)),
        }
    }

    fn into_key(self) -> MapKey {
        MapKey::Int(self)
    }
}

impl ScriptKey for i32 {
    fn key_shape() -> KeyShape {
        KeyShape::Int
    }

    fn from_key(key: &MapKey) -> Result<Self> {
        let n = i64::from_key(key)?;
        i32::try_from(n).map_err(|_| BridgeError::range(n, "Int32 key"))
    }

    fn into_key(self) -> MapKey {
        MapKey::Int(i64::from(self))
    }
}

fn map_entries<K, V, C>(value: &MarshaledValue, shape: Shape) -> Result<C>
where
    K: ScriptKey,
    V: FromScript,
    C: FromIterator<(K, V)>,
{
    match value {
        MarshaledValue::Map(entries) => {
            let mut seen = BTreeSet::new();
            entries
                .iter()
                .map(|(k, v)| {
                    if !seen.insert(key_in(k, K::key_shape())?) {
                        return Err(duplicate_key(k));
                    }
                    let key = K::from_key(k)?;
                    let item = V::from_script(v).map_err(|e| e.at(format!("[{}]", k)))?;
                    Ok((key, item))
                })
                .collect()
        }
        other => Err(mismatch(&shape, other)),
    }
}

impl<K: ScriptKey + Eq + Hash, V: FromScript> FromScript for HashMap<K, V> {
    fn shape() -> Shape {
        Shape::map(K::key_shape(), V::shape())
    }

    fn from_script(value: &MarshaledValue) -> Result<Self> {
        map_entries(value, Self::shape())
    }
}

impl<K: ScriptKey, V: IntoScript> IntoScript for HashMap<K, V> {
    fn into_script(self) -> MarshaledValue {
        MarshaledValue::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_key(), v.into_script()))
                .collect(),
        )
    }
}

impl<K: ScriptKey + Ord, V: FromScript> FromScript for BTreeMap<K, V> {
    fn shape() -> Shape {
        Shape::map(K::key_shape(), V::shape())
    }

    fn from_script(value: &MarshaledValue) -> Result<Self> {
        map_entries(value, Self::shape())
    }
}

impl<K: ScriptKey, V: IntoScript> IntoScript for BTreeMap<K, V> {
    fn into_script(self) -> MarshaledValue {
        MarshaledValue::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_key(), v.into_script()))
                .collect(),
        )
    }
}

/// A native parameter list decoded from script arguments
pub trait FromArgs: Sized {
    /// Declared parameter shapes, in order
    fn shapes() -> Vec<Shape>;

    /// Decode the argument list; omitted trailing optionals read as null
    fn from_args(args: &[MarshaledValue]) -> Result<Self>;
}

impl FromArgs for () {
    fn shapes() -> Vec<Shape> {
        Vec::new()
    }

    fn from_args(_args: &[MarshaledValue]) -> Result<Self> {
        Ok(())
    }
}

macro_rules! tuple_from_args {
    ($($name:ident : $index:tt),+) => {
        impl<$($name: FromScript),+> FromArgs for ($($name,)+) {
            fn shapes() -> Vec<Shape> {
                vec![$($name::shape()),+]
            }

            fn from_args(args: &[MarshaledValue]) -> Result<Self> {
                Ok(($(
                    $name::from_script(args.get($index).unwrap_or(&MarshaledValue::Null))
                        .map_err(|e| e.at(format!("argument {}", $index + 1)))?,
                )+))
            }
        }
    };
}

tuple_from_args!(A: 0);
tuple_from_args!(A: 0, B: 1);
tuple_from_args!(A: 0, B: 1, C: 2);
tuple_from_args!(A: 0, B: 1, C: 2, D: 3);
tuple_from_args!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_from_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_int32_overflow_is_range_error() {
        let err = marshal_in(&MarshaledValue::Int64(2_147_483_649), &Shape::Int32).unwrap_err();
        assert!(matches!(err, BridgeError::Range { .. }));

        let err = i32::from_script(&MarshaledValue::Float(2_147_483_649.0)).unwrap_err();
        assert!(matches!(err, BridgeError::Range { .. }));
    }

    #[test]
    fn test_integral_float_accepted() {
        assert_eq!(i32::from_script(&MarshaledValue::Float(1024.0)).unwrap(), 1024);
        let err = i32::from_script(&MarshaledValue::Float(1.5)).unwrap_err();
        assert!(matches!(err, BridgeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_negative_to_unsigned_is_range_error() {
        let err = u64::from_script(&MarshaledValue::Int32(-1)).unwrap_err();
        assert!(matches!(err, BridgeError::Range { .. }));
    }

    #[test]
    fn test_u64_past_safe_integer_round_trips() {
        let big = u64::MAX - 1;
        let out = marshal_out(big);
        assert_eq!(out, MarshaledValue::UInt64(big));
        assert_eq!(u64::from_script(&out).unwrap(), big);

        let from_string = u64::from_script(&MarshaledValue::String(big.to_string())).unwrap();
        assert_eq!(from_string, big);
    }

    #[test]
    fn test_string_is_not_int32() {
        let err = i32::from_script(&"12".into()).unwrap_err();
        assert!(matches!(err, BridgeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_number_coerces_to_string() {
        assert_eq!(String::from_script(&MarshaledValue::Int32(42)).unwrap(), "42");
    }

    #[test]
    fn test_nested_error_location() {
        let value = MarshaledValue::Sequence(vec![1.into(), "two".into()]);
        let err = Vec::<i32>::from_script(&value).unwrap_err();
        assert_eq!(err.to_string(), "value[1]: expected Int32, found String");
    }

    #[test]
    fn test_string_keys_parse_as_int_keys() {
        let value = MarshaledValue::map_of([("3", "eight"), ("4", "sixteen")]);
        let map = HashMap::<i64, String>::from_script(&value).unwrap();
        assert_eq!(map.get(&3).map(String::as_str), Some("eight"));

        let bad = MarshaledValue::map_of([("three", 8)]);
        assert!(HashMap::<i64, i32>::from_script(&bad).is_err());
    }

    #[test]
    fn test_colliding_int_keys_are_rejected() {
        let value = MarshaledValue::map_of([("1", 1), ("01", 2)]);
        let err = marshal_in(&value, &Shape::map(KeyShape::Int, Shape::Int32)).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::TypeMismatch);
        assert_eq!(
            err.to_string(),
            "value[1]: expected unique map keys, found duplicate key '1'"
        );

        let err = BTreeMap::<i64, i32>::from_script(&value).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_colliding_string_keys_are_rejected() {
        let mut entries = BTreeMap::new();
        entries.insert(MapKey::Int(1), MarshaledValue::Int32(1));
        entries.insert(MapKey::Str("1".into()), MarshaledValue::Int32(2));
        let value = MarshaledValue::Map(entries);

        let err = marshal_in(&value, &Shape::map(KeyShape::String, Shape::Int32)).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::TypeMismatch);
        assert!(err.to_string().contains("duplicate key '1'"));

        let err = HashMap::<String, i32>::from_script(&value).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_set_from_sequence_dedupes() {
        let value = MarshaledValue::Sequence(vec!["a".into(), "b".into(), "a".into()]);
        let normalized = marshal_in(&value, &Shape::set(Shape::String)).unwrap();
        match normalized {
            MarshaledValue::Set(set) => assert_eq!(set.len(), 2),
            other => panic!("expected set, got {:?}", other),
        }
    }

    #[test]
    fn test_record_shape_checks_type_name() {
        let record = Record::new("UserTypeIS").with_field("nvar", 1);
        let value = MarshaledValue::Record(record);
        assert!(marshal_in(&value, &Shape::Record("UserTypeIS".into())).is_ok());
        assert!(marshal_in(&value, &Shape::Record("Other".into())).is_err());
    }

    #[test]
    fn test_from_args_tuple() {
        let args = vec![
            MarshaledValue::Int32(1024),
            MarshaledValue::Int64(4_294_967_297),
            "hello".into(),
        ];
        let (a, b, c) = <(i32, u64, String)>::from_args(&args).unwrap();
        assert_eq!((a, b, c.as_str()), (1024, 4_294_967_297, "hello"));
    }

    #[test]
    fn test_from_args_error_location() {
        let args = vec![MarshaledValue::Int32(1), "x".into()];
        let err = <(i32, i32)>::from_args(&args).unwrap_err();
        assert!(err.to_string().starts_with("argument 2"));
    }

    #[test]
    fn test_optional_trailing_argument() {
        let (path,) = <(Option<String>,)>::from_args(&[]).unwrap();
        assert!(path.is_none());
        assert_eq!(<(Option<String>,)>::shapes(), vec![Shape::optional(Shape::String)]);
    }

    fn scalar() -> impl Strategy<Value = MarshaledValue> {
        prop_oneof![
            Just(MarshaledValue::Null),
            any::<bool>().prop_map(MarshaledValue::Bool),
            any::<i32>().prop_map(MarshaledValue::Int32),
            any::<i64>().prop_map(MarshaledValue::Int64),
            any::<u64>().prop_map(MarshaledValue::UInt64),
            (-1.0e12f64..1.0e12).prop_map(MarshaledValue::Float),
            "[a-z]{0,8}".prop_map(MarshaledValue::String),
        ]
    }

    fn value() -> impl Strategy<Value = MarshaledValue> {
        scalar().prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(MarshaledValue::Sequence),
                prop::collection::vec(inner.clone(), 0..4)
                    .prop_map(|items| MarshaledValue::Set(items.into_iter().collect())),
                prop::collection::btree_map(any::<i64>().prop_map(MapKey::Int), inner.clone(), 0..4)
                    .prop_map(MarshaledValue::Map),
                prop::collection::btree_map("[a-z]{1,6}".prop_map(MapKey::Str), inner, 0..4)
                    .prop_map(MarshaledValue::Map),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_marshal_in_own_shape_is_identity(v in value()) {
            let shape = Shape::of(&v);
            prop_assert_eq!(marshal_in(&v, &shape).unwrap(), v);
        }

        #[test]
        fn prop_typed_round_trip_u64(n in any::<u64>()) {
            prop_assert_eq!(u64::from_script(&marshal_out(n)).unwrap(), n);
        }

        #[test]
        fn prop_typed_round_trip_int_map(m in prop::collection::hash_map(any::<i64>(), "[a-z]{0,6}", 0..8)) {
            let back = HashMap::<i64, String>::from_script(&marshal_out(m.clone())).unwrap();
            prop_assert_eq!(back, m);
        }

        #[test]
        fn prop_typed_round_trip_nested(v in prop::collection::vec(prop::collection::btree_set(any::<i32>(), 0..4), 0..4)) {
            let back = Vec::<BTreeSet<i32>>::from_script(&marshal_out(v.clone())).unwrap();
            prop_assert_eq!(back, v);
        }
    }
}

//! JSON conversion of marshaled values.
//!
//! Integers past 2^53 - 1 are written exactly, either as bare JSON integers
//! ([`U64Encoding::BigInt`]) or as decimal strings ([`U64Encoding::String`]).
//! Non-finite floats become `null`. Handles have no JSON form.

use crate::config::U64Encoding;
use crate::error::{BridgeError, Result};
use crate::value::{MapKey, MarshaledValue, MAX_SAFE_INTEGER};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Convert a marshaled value into a JSON value
pub fn to_json(value: &MarshaledValue, encoding: U64Encoding) -> Result<Value> {
    Ok(match value {
        MarshaledValue::Null => Value::Null,
        MarshaledValue::Bool(b) => Value::Bool(*b),
        MarshaledValue::Int32(n) => Value::from(*n),
        MarshaledValue::Int64(n) => {
            if n.unsigned_abs() <= MAX_SAFE_INTEGER as u64 {
                Value::from(*n)
            } else {
                wide_integer(Value::from(*n), n.to_string(), encoding)
            }
        }
        MarshaledValue::UInt64(n) => {
            if *n <= MAX_SAFE_INTEGER as u64 {
                Value::from(*n)
            } else {
                wide_integer(Value::from(*n), n.to_string(), encoding)
            }
        }
        MarshaledValue::Float(x) => Number::from_f64(*x).map(Value::Number).unwrap_or(Value::Null),
        MarshaledValue::String(s) => Value::String(s.clone()),
        MarshaledValue::Sequence(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| to_json(item, encoding).map_err(|e| e.at(format!("[{}]", i))))
                .collect::<Result<_>>()?,
        ),
        MarshaledValue::Set(items) => Value::Array(
            items
                .iter()
                .map(|item| to_json(item, encoding))
                .collect::<Result<_>>()?,
        ),
        MarshaledValue::Map(entries) => {
            let mut object = Map::new();
            for (key, item) in entries {
                let json = to_json(item, encoding).map_err(|e| e.at(format!("[{}]", key)))?;
                object.insert(key.to_string(), json);
            }
            Value::Object(object)
        }
        MarshaledValue::Record(record) => {
            let mut object = Map::new();
            for (name, item) in &record.fields {
                let json = to_json(item, encoding).map_err(|e| e.at(format!(".{}", name)))?;
                object.insert(name.clone(), json);
            }
            Value::Object(object)
        }
        MarshaledValue::Handle(h) => {
            return Err(BridgeError::type_mismatch(
                "JSON value",
                format!("Handle<{}>", h.type_name()),
            ))
        }
    })
}

fn wide_integer(exact: Value, decimal: String, encoding: U64Encoding) -> Value {
    match encoding {
        U64Encoding::BigInt => exact,
        U64Encoding::String => Value::String(decimal),
    }
}

/// Convert a JSON value into a marshaled value.
///
/// Integers keep the narrowest of `Int32`, `Int64` and `UInt64` that holds
/// them; objects become string-keyed maps.
pub fn from_json(value: &Value) -> MarshaledValue {
    match value {
        Value::Null => MarshaledValue::Null,
        Value::Bool(b) => MarshaledValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => MarshaledValue::Int32(small),
                    Err(_) => MarshaledValue::Int64(i),
                }
            } else if let Some(u) = n.as_u64() {
                MarshaledValue::UInt64(u)
            } else {
                MarshaledValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => MarshaledValue::String(s.clone()),
        Value::Array(items) => MarshaledValue::Sequence(items.iter().map(from_json).collect()),
        Value::Object(object) => MarshaledValue::Map(
            object
                .iter()
                .map(|(k, v)| (MapKey::Str(k.clone()), from_json(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

/// Render a marshaled value as a JSON string
pub fn stringify(value: &MarshaledValue, encoding: U64Encoding) -> Result<String> {
    Ok(serde_json::to_string(&to_json(value, encoding)?)?)
}

/// Parse a JSON string into a marshaled value
pub fn parse(text: &str) -> Result<MarshaledValue> {
    let value: Value = serde_json::from_str(text)?;
    Ok(from_json(&value))
}

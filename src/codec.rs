//! MessagePack encoding of argument lists and return values.
//!
//! Hosts that exchange byte buffers (the N-API surface) pass arguments as a
//! MessagePack array of [`MarshaledValue`]s. An empty buffer is an empty
//! argument list.

use crate::error::Result;
use crate::value::MarshaledValue;

/// Encode an argument list
pub fn encode_args(args: &[MarshaledValue]) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(args)?)
}

/// Decode an argument list
pub fn decode_args(bytes: &[u8]) -> Result<Vec<MarshaledValue>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Encode a single value
pub fn encode_value(value: &MarshaledValue) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode a single value
pub fn decode_value(bytes: &[u8]) -> Result<MarshaledValue> {
    Ok(rmp_serde::from_slice(bytes)?)
}

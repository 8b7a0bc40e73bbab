//! N-API bindings for Node.js integration.
//!
//! This module exposes the bridge to Node.js via N-API. Arguments, return
//! values and handles cross as MessagePack buffers (see [`crate::codec`]);
//! errors are thrown with a `[CODE] message` reason.

use crate::bridge::Bridge;
use crate::codec;
use crate::config::{BridgeConfig, U64Encoding};
use crate::error::{BridgeError, Result as BridgeResult};
use crate::json;
use crate::modules::console::StdoutSink;
use crate::value::MarshaledValue;
use napi::bindgen_prelude::*;
use napi_derive::napi;
use parking_lot::RwLock;
use std::sync::Arc;

/// JavaScript-friendly configuration
#[napi(object)]
pub struct JsBridgeConfig {
    /// Maximum number of live handles
    pub max_live_handles: Option<u32>,
    /// `"bigInt"` or `"string"`
    pub u64_encoding: Option<String>,
    /// Root directory for relative `file` module paths
    pub file_root: Option<String>,
    /// Tracing filter directive
    pub log_filter: Option<String>,
    /// Release live handles on shutdown
    pub release_on_shutdown: Option<bool>,
}

impl TryFrom<JsBridgeConfig> for BridgeConfig {
    type Error = napi::Error;

    fn try_from(js: JsBridgeConfig) -> Result<Self> {
        let mut config = BridgeConfig::default();
        if let Some(max) = js.max_live_handles {
            config = config.with_max_live_handles(max as usize);
        }
        if let Some(encoding) = js.u64_encoding {
            config = config.with_u64_encoding(match encoding.as_str() {
                "bigInt" => U64Encoding::BigInt,
                "string" => U64Encoding::String,
                other => {
                    return Err(napi::Error::from_reason(format!(
                        "Invalid u64Encoding '{}': expected \"bigInt\" or \"string\"",
                        other
                    )))
                }
            });
        }
        if let Some(root) = js.file_root {
            config = config.with_file_root(root);
        }
        if let Some(filter) = js.log_filter {
            config = config.with_log_filter(filter);
        }
        if let Some(release) = js.release_on_shutdown {
            config = config.with_release_on_shutdown(release);
        }
        Ok(config)
    }
}

/// JavaScript-friendly bridge statistics
#[napi(object)]
pub struct JsBridgeStats {
    /// Live handles
    pub live_handles: u32,
    /// Objects constructed
    pub constructed: i64,
    /// Handles released
    pub released: i64,
    /// Handles reclaimed by the garbage collector
    pub reclaimed: i64,
    /// Method and property dispatches
    pub invocations: i64,
    /// Free function calls
    pub function_calls: i64,
    /// Average dispatch time in microseconds
    pub avg_dispatch_time_us: f64,
    /// Rejected calls
    pub errors: i64,
}

fn to_napi(e: BridgeError) -> napi::Error {
    napi::Error::from_reason(e.to_script_error().to_string())
}

fn decode_handle(buffer: &[u8]) -> BridgeResult<crate::NativeHandle> {
    match codec::decode_value(buffer)? {
        MarshaledValue::Handle(handle) => Ok(handle),
        other => Err(BridgeError::type_mismatch("Handle", other.kind())),
    }
}

fn encode(value: &MarshaledValue) -> BridgeResult<Buffer> {
    Ok(Buffer::from(codec::encode_value(value)?))
}

/// The bridge exposed to Node.js, with the builtin modules registered
#[napi]
pub struct NativeBridge {
    inner: Arc<RwLock<Option<Bridge>>>,
}

impl NativeBridge {
    fn with_bridge<R>(&self, f: impl FnOnce(&Bridge) -> BridgeResult<R>) -> Result<R> {
        let inner = self.inner.read();
        let bridge = inner.as_ref().ok_or_else(|| to_napi(BridgeError::Shutdown))?;
        f(bridge).map_err(to_napi)
    }
}

#[napi]
impl NativeBridge {
    /// Create a bridge with the given configuration
    #[napi(constructor)]
    pub fn new(config: Option<JsBridgeConfig>) -> Result<Self> {
        let config = match config {
            Some(js) => BridgeConfig::try_from(js)?,
            None => BridgeConfig::default(),
        };

        let bridge = Bridge::builder(config)
            .with_builtins(Arc::new(StdoutSink))
            .and_then(|builder| builder.build())
            .map_err(to_napi)?;

        Ok(Self {
            inner: Arc::new(RwLock::new(Some(bridge))),
        })
    }

    /// Construct a native object; returns the encoded handle
    #[napi]
    pub fn construct(&self, type_name: String, args: Buffer) -> Result<Buffer> {
        self.with_bridge(|bridge| {
            let args = codec::decode_args(&args)?;
            let handle = bridge.construct(&type_name, &args)?;
            encode(&MarshaledValue::Handle(handle))
        })
    }

    /// Invoke a method on an encoded handle
    #[napi]
    pub fn invoke(&self, handle: Buffer, method: String, args: Buffer) -> Result<Buffer> {
        self.with_bridge(|bridge| {
            let handle = decode_handle(&handle)?;
            let args = codec::decode_args(&args)?;
            encode(&bridge.invoke(&handle, &method, &args)?)
        })
    }

    /// Read a property
    #[napi]
    pub fn get(&self, handle: Buffer, property: String) -> Result<Buffer> {
        self.with_bridge(|bridge| {
            let handle = decode_handle(&handle)?;
            encode(&bridge.get(&handle, &property)?)
        })
    }

    /// Write a property
    #[napi]
    pub fn set(&self, handle: Buffer, property: String, value: Buffer) -> Result<()> {
        self.with_bridge(|bridge| {
            let handle = decode_handle(&handle)?;
            let value = codec::decode_value(&value)?;
            bridge.set(&handle, &property, &value)
        })
    }

    /// Call a free function
    #[napi]
    pub fn call(&self, function: String, args: Buffer) -> Result<Buffer> {
        self.with_bridge(|bridge| {
            let args = codec::decode_args(&args)?;
            encode(&bridge.call(&function, &args)?)
        })
    }

    /// Release a handle; false if already released
    #[napi]
    pub fn release(&self, handle: Buffer) -> Result<bool> {
        self.with_bridge(|bridge| Ok(bridge.release(&decode_handle(&handle)?)))
    }

    /// Garbage-collector finalizer hook
    #[napi]
    pub fn reclaim(&self, handle: Buffer) -> Result<bool> {
        self.with_bridge(|bridge| Ok(bridge.reclaim(&decode_handle(&handle)?)))
    }

    /// Every property of a handle as a JSON string
    #[napi]
    pub fn json_object(&self, handle: Buffer) -> Result<String> {
        self.with_bridge(|bridge| {
            let snapshot = bridge.json_object(&decode_handle(&handle)?)?;
            json::stringify(&snapshot, bridge.config().u64_encoding)
        })
    }

    /// Get bridge statistics
    #[napi]
    pub fn get_stats(&self) -> Result<JsBridgeStats> {
        self.with_bridge(|bridge| {
            let stats = bridge.stats();
            Ok(JsBridgeStats {
                live_handles: stats.live_handles as u32,
                constructed: stats.constructed as i64,
                released: stats.released as i64,
                reclaimed: stats.reclaimed as i64,
                invocations: stats.invocations as i64,
                function_calls: stats.function_calls as i64,
                avg_dispatch_time_us: stats.avg_dispatch_time_us,
                errors: stats.total_errors() as i64,
            })
        })
    }

    /// Get Prometheus metrics
    #[napi]
    pub fn get_prometheus_metrics(&self) -> Result<String> {
        self.with_bridge(|bridge| Ok(bridge.prometheus_metrics()))
    }

    /// Shut the bridge down; returns the number of handles released
    #[napi]
    pub fn shutdown(&self) -> u32 {
        let mut inner = self.inner.write();
        inner.take().map(|bridge| bridge.shutdown() as u32).unwrap_or(0)
    }
}

/// Initialize tracing output
#[napi]
pub fn init_logging(filter: Option<String>) -> bool {
    let mut config = BridgeConfig::default();
    if let Some(filter) = filter {
        config = config.with_log_filter(filter);
    }
    crate::logging::init(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_conversion() {
        let js_config = JsBridgeConfig {
            max_live_handles: Some(128),
            u64_encoding: Some("string".to_string()),
            file_root: Some("/tmp/bridge".to_string()),
            log_filter: None,
            release_on_shutdown: Some(false),
        };

        let config = BridgeConfig::try_from(js_config).unwrap();

        assert_eq!(config.max_live_handles, 128);
        assert_eq!(config.u64_encoding, U64Encoding::String);
        assert!(!config.release_on_shutdown);
    }

    #[test]
    fn test_invalid_encoding() {
        let js_config = JsBridgeConfig {
            max_live_handles: None,
            u64_encoding: Some("hex".to_string()),
            file_root: None,
            log_filter: None,
            release_on_shutdown: None,
        };
        assert!(BridgeConfig::try_from(js_config).is_err());
    }

    #[test]
    fn test_decode_handle_rejects_other_values() {
        let bytes = codec::encode_value(&MarshaledValue::Int32(1)).unwrap();
        let err = decode_handle(&bytes).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::TypeMismatch);
    }
}

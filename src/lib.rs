//! # Native Bridge
//!
//! This library projects native Rust types, functions and object lifetimes
//! into a scripting host. Scripts construct native-backed objects, call
//! their methods and properties, and pass values that are marshaled across
//! the boundary without silent truncation.
//!
//! ## Architecture
//!
//! ```text
//! Script host (Node.js, embedder)
//!     │
//!     │ MarshaledValue / N-API buffers
//!     ▼
//! Bridge (this crate)
//!     │  registry lookup, arity check, marshaling
//!     ▼
//! Native state behind a live handle
//! ```
//!
//! ## Features
//!
//! - **Flat method tables**: inheritance is resolved at registration time
//! - **Width-preserving integers**: 64-bit values never pass through a float
//! - **Revocable handles**: released handles fail with `INVALID_STATE`, ids are never reused
//! - **Builtin modules**: `console` and line-oriented `file` I/O
//!
//! ## Example
//!
//! ```
//! use native_bridge::{Bridge, BridgeConfig, MarshaledValue, TypeDefinition};
//!
//! struct Counter(i32);
//!
//! let counter = TypeDefinition::<Counter>::new("MyObject")
//!     .constructor(|(start,): (i32,)| Ok(Counter(start)))
//!     .method("plusOne", |this: &mut Counter, (): ()| {
//!         this.0 += 1;
//!         Ok(this.0)
//!     });
//!
//! let bridge = Bridge::builder(BridgeConfig::default())
//!     .register_type(counter)?
//!     .build()?;
//!
//! let h = bridge.construct("MyObject", &[10.into()])?;
//! assert_eq!(bridge.invoke(&h, "plusOne", &[])?, MarshaledValue::Int32(11));
//! # Ok::<(), native_bridge::BridgeError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod handle;
pub mod json;
pub mod logging;
pub mod marshal;
pub mod metrics;
pub mod modules;
#[cfg(feature = "node")]
pub mod napi;
pub mod registry;
pub mod shape;
pub mod value;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeBuilder};
pub use config::{BridgeConfig, U64Encoding};
pub use error::{BridgeError, ErrorCode, NativeError, Result, ScriptError};
pub use handle::{HandleId, HandleState, NativeHandle};
pub use marshal::{marshal_in, marshal_out, FromArgs, FromScript, IntoScript};
pub use metrics::BridgeStats;
pub use registry::{Module, NativeFunction, Signature, TypeDefinition};
pub use shape::{KeyShape, Shape};
pub use value::{MapKey, MarshaledValue, Record, ValueSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Builtin native modules.
//!
//! These wrap host capabilities as ordinary registered types and functions;
//! enable them with [`crate::BridgeBuilder::with_builtins`].

pub mod console;
pub mod file;

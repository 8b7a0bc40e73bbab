//! Error types for the native bridge.
//!
//! This module defines error codes, the error surfaced to scripts, the error
//! native callables report, and the main error type used throughout the bridge.

use serde::{Deserialize, Serialize};

/// Error codes for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Constructor name is not registered
    UnknownConstructor,
    /// Method, property or free function is not registered
    UnknownMethod,
    /// Name registered twice
    DuplicateRegistration,
    /// Wrong number of arguments
    ArityMismatch,
    /// Value cannot be marshaled to the expected shape
    TypeMismatch,
    /// Numeric value out of range for the target width
    Range,
    /// Operation on a released or foreign handle
    InvalidState,
    /// Object accessed again from inside its own call
    Reentrant,
    /// Failure reported by the wrapped native code
    Native,
    /// Live handle table is full
    HandleLimit,
    /// Bridge has been shut down
    Shutdown,
    /// Invalid configuration
    Config,
    /// Serialization/deserialization error
    Serialization,
    /// Internal bridge error (bug)
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::UnknownConstructor => write!(f, "UNKNOWN_CONSTRUCTOR"),
            ErrorCode::UnknownMethod => write!(f, "UNKNOWN_METHOD"),
            ErrorCode::DuplicateRegistration => write!(f, "DUPLICATE_REGISTRATION"),
            ErrorCode::ArityMismatch => write!(f, "ARITY_MISMATCH"),
            ErrorCode::TypeMismatch => write!(f, "TYPE_MISMATCH"),
            ErrorCode::Range => write!(f, "RANGE"),
            ErrorCode::InvalidState => write!(f, "INVALID_STATE"),
            ErrorCode::Reentrant => write!(f, "REENTRANT"),
            ErrorCode::Native => write!(f, "NATIVE"),
            ErrorCode::HandleLimit => write!(f, "HANDLE_LIMIT"),
            ErrorCode::Shutdown => write!(f, "SHUTDOWN"),
            ErrorCode::Config => write!(f, "CONFIG"),
            ErrorCode::Serialization => write!(f, "SERIALIZATION"),
            ErrorCode::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Failure reported by a native callable.
///
/// The bridge never rewrites these: kind and message reach the script as the
/// native code produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeError {
    /// Native failure kind (e.g. an io error kind)
    pub kind: String,
    /// Native failure message
    pub message: String,
    /// Whether the wrapped library documents this failure as fatal
    pub fatal: bool,
}

impl NativeError {
    /// Create a recoverable native error
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            fatal: false,
        }
    }

    /// Create a native error the wrapped library documents as fatal
    pub fn fatal(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fatal: true,
            ..Self::new(kind, message)
        }
    }
}

impl std::fmt::Display for NativeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for NativeError {}

impl From<std::io::Error> for NativeError {
    fn from(e: std::io::Error) -> Self {
        Self::new(format!("{:?}", e.kind()), e.to_string())
    }
}

impl From<anyhow::Error> for NativeError {
    fn from(e: anyhow::Error) -> Self {
        Self::new("Error", format!("{:#}", e))
    }
}

/// Error details handed back to the calling script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptError {
    /// Error code
    pub code: ErrorCode,

    /// Human-readable message
    pub message: String,

    /// Native failure kind, for pass-through native errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_kind: Option<String>,

    /// Whether the failure is fatal for the wrapped library
    #[serde(default)]
    pub fatal: bool,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Main error type for the bridge
#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    /// No constructor registered under this name
    #[error("Unknown constructor '{name}'")]
    UnknownConstructor {
        /// Requested constructor name
        name: String,
    },

    /// No method or property of this name in the type's table
    #[error("Method '{method}' not found on '{type_name}'")]
    UnknownMethod {
        /// Receiver type name
        type_name: String,
        /// Requested member name
        method: String,
    },

    /// No free function of this name
    #[error("Function '{name}' not found")]
    UnknownFunction {
        /// Requested function name
        name: String,
    },

    /// Write to a property without a setter
    #[error("Property '{property}' on '{type_name}' is read-only")]
    ReadOnlyProperty {
        /// Receiver type name
        type_name: String,
        /// Property name
        property: String,
    },

    /// Name already taken in the registry
    #[error("'{name}' is already registered")]
    DuplicateRegistration {
        /// Conflicting name
        name: String,
    },

    /// Wrong argument count
    #[error("'{callee}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        /// Constructor, method or function name
        callee: String,
        /// Accepted argument count description
        expected: String,
        /// Supplied argument count
        got: usize,
    },

    /// Value does not have the expected shape
    #[error("{location}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Where in the argument list the value sits
        location: String,
        /// Expected shape
        expected: String,
        /// Actual value kind
        found: String,
    },

    /// Numeric overflow during marshaling
    #[error("{location}: {value} is out of range for {target}")]
    Range {
        /// Where in the argument list the value sits
        location: String,
        /// Offending value
        value: String,
        /// Target integer shape
        target: String,
    },

    /// Handle is released or belongs to another bridge
    #[error("Invalid state for handle {handle}: {reason}")]
    InvalidState {
        /// Handle description
        handle: String,
        /// Why the handle cannot be used
        reason: String,
    },

    /// Object is already borrowed further up this thread's call stack
    #[error("Handle {handle} is already in use by this thread")]
    Reentrant {
        /// Handle description
        handle: String,
    },

    /// Native failure, passed through unchanged
    #[error("{0}")]
    Native(#[from] NativeError),

    /// Live handle table is full
    #[error("Live handle limit of {limit} reached")]
    HandleLimit {
        /// Configured limit
        limit: usize,
    },

    /// Bridge has been shut down
    #[error("Bridge has been shut down")]
    Shutdown,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Create a type mismatch error at the value root
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        BridgeError::TypeMismatch {
            location: "value".into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a range error at the value root
    pub fn range(value: impl std::fmt::Display, target: impl Into<String>) -> Self {
        BridgeError::Range {
            location: "value".into(),
            value: value.to_string(),
            target: target.into(),
        }
    }

    /// Create an invalid state error for a handle
    pub fn invalid_state(handle: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        BridgeError::InvalidState {
            handle: handle.to_string(),
            reason: reason.into(),
        }
    }

    /// Prefix the location of a marshaling error.
    ///
    /// `segment` is either a full location (`argument 2`) replacing the
    /// `value` root, or an index suffix (`[3]`) appended to it.
    pub fn at(self, segment: impl AsRef<str>) -> Self {
        let segment = segment.as_ref();
        let relocate = |location: String| {
            if segment.starts_with('[') || segment.starts_with('.') {
                format!("{}{}", location, segment)
            } else if location == "value" {
                segment.to_string()
            } else {
                format!("{}{}", segment, location.trim_start_matches("value"))
            }
        };
        match self {
            BridgeError::TypeMismatch {
                location,
                expected,
                found,
            } => BridgeError::TypeMismatch {
                location: relocate(location),
                expected,
                found,
            },
            BridgeError::Range {
                location,
                value,
                target,
            } => BridgeError::Range {
                location: relocate(location),
                value,
                target,
            },
            other => other,
        }
    }

    /// Error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::UnknownConstructor { .. } => ErrorCode::UnknownConstructor,
            BridgeError::UnknownMethod { .. }
            | BridgeError::UnknownFunction { .. }
            | BridgeError::ReadOnlyProperty { .. } => ErrorCode::UnknownMethod,
            BridgeError::DuplicateRegistration { .. } => ErrorCode::DuplicateRegistration,
            BridgeError::ArityMismatch { .. } => ErrorCode::ArityMismatch,
            BridgeError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            BridgeError::Range { .. } => ErrorCode::Range,
            BridgeError::InvalidState { .. } => ErrorCode::InvalidState,
            BridgeError::Reentrant { .. } => ErrorCode::Reentrant,
            BridgeError::Native(_) => ErrorCode::Native,
            BridgeError::HandleLimit { .. } => ErrorCode::HandleLimit,
            BridgeError::Shutdown => ErrorCode::Shutdown,
            BridgeError::Config(_) => ErrorCode::Config,
            BridgeError::Serialization(_) => ErrorCode::Serialization,
            BridgeError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether the wrapped library documents this failure as fatal
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Native(e) if e.fatal)
    }

    /// Convert to ScriptError for returning to the script
    pub fn to_script_error(&self) -> ScriptError {
        match self {
            BridgeError::Native(e) => ScriptError {
                code: ErrorCode::Native,
                message: e.message.clone(),
                native_kind: Some(e.kind.clone()),
                fatal: e.fatal,
            },
            other => ScriptError {
                code: other.code(),
                message: other.to_string(),
                native_kind: None,
                fatal: false,
            },
        }
    }
}

impl From<crate::config::ConfigError> for BridgeError {
    fn from(e: crate::config::ConfigError) -> Self {
        BridgeError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for BridgeError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        BridgeError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for BridgeError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        BridgeError::Serialization(e.to_string())
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::TypeMismatch.to_string(), "TYPE_MISMATCH");
        assert_eq!(ErrorCode::InvalidState.to_string(), "INVALID_STATE");
    }

    #[test]
    fn test_location_prefixing() {
        let err = BridgeError::type_mismatch("Int32", "String")
            .at("[2]")
            .at("argument 1");
        assert_eq!(
            err.to_string(),
            "argument 1[2]: expected Int32, found String"
        );
    }

    #[test]
    fn test_location_ignored_for_other_errors() {
        let err = BridgeError::Shutdown.at("argument 1");
        assert!(matches!(err, BridgeError::Shutdown));
    }

    #[test]
    fn test_native_error_passes_through() {
        let native = NativeError::new("NotFound", "no such file");
        let err = BridgeError::from(native);
        let script = err.to_script_error();
        assert_eq!(script.code, ErrorCode::Native);
        assert_eq!(script.message, "no such file");
        assert_eq!(script.native_kind.as_deref(), Some("NotFound"));
        assert!(!script.fatal);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let native = NativeError::from(io);
        assert_eq!(native.kind, "PermissionDenied");
        assert_eq!(native.message, "denied");
    }

    #[test]
    fn test_fatal_flag() {
        let err = BridgeError::from(NativeError::fatal("Abort", "corrupt heap"));
        assert!(err.is_fatal());
        assert!(err.to_script_error().fatal);
    }

    #[test]
    fn test_script_error_serialization() {
        let err = BridgeError::UnknownMethod {
            type_name: "MyObject".into(),
            method: "doesNotExist".into(),
        };
        let json = serde_json::to_string(&err.to_script_error()).unwrap();
        assert!(json.contains("UNKNOWN_METHOD"));
        assert!(!json.contains("nativeKind"));
    }
}

//! Bridge configuration types and defaults.
//!
//! This module defines the configuration options for the bridge, including
//! the live handle limit, how large integers are rendered for outer hosts,
//! and where the `file` module resolves relative paths.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default maximum number of live handles
pub const DEFAULT_MAX_LIVE_HANDLES: usize = 64 * 1024;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "native_bridge=info";

/// Rendering of 64-bit integers past the script's safe-integer boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum U64Encoding {
    /// Exact integer (bigint-capable consumers)
    #[default]
    BigInt,
    /// Decimal string
    String,
}

/// Configuration for the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Maximum number of handles alive at once
    #[serde(default = "default_max_live_handles")]
    pub max_live_handles: usize,

    /// How integers past 2^53 - 1 are rendered by JSON and N-API surfaces
    #[serde(default, rename = "u64Encoding")]
    pub u64_encoding: U64Encoding,

    /// Root directory for relative paths given to the `file` module
    #[serde(default)]
    pub file_root: Option<PathBuf>,

    /// Tracing filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Release every live handle on shutdown (default: true)
    #[serde(default = "default_true")]
    pub release_on_shutdown: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_live_handles: DEFAULT_MAX_LIVE_HANDLES,
            u64_encoding: U64Encoding::default(),
            file_root: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            release_on_shutdown: true,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: BridgeConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the live handle limit
    pub fn with_max_live_handles(mut self, max: usize) -> Self {
        self.max_live_handles = max;
        self
    }

    /// Set the large-integer rendering
    pub fn with_u64_encoding(mut self, encoding: U64Encoding) -> Self {
        self.u64_encoding = encoding;
        self
    }

    /// Set the root for relative file paths
    pub fn with_file_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.file_root = Some(root.into());
        self
    }

    /// Set the tracing filter
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Keep or release live handles on shutdown
    pub fn with_release_on_shutdown(mut self, release: bool) -> Self {
        self.release_on_shutdown = release;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_live_handles == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_live_handles".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.log_filter) {
            return Err(ConfigError::InvalidValue {
                field: "log_filter".into(),
                reason: e.to_string(),
            });
        }

        if let Some(root) = &self.file_root {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "file_root".into(),
                    reason: "must not be empty".into(),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field name
        field: String,
        /// The reason it's invalid
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Default value functions for serde
fn default_max_live_handles() -> usize {
    DEFAULT_MAX_LIVE_HANDLES
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_true() -> bool {
    true
}

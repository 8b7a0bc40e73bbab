//! Tracing subscriber setup.

use crate::config::{BridgeConfig, DEFAULT_LOG_FILTER};
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INSTALLED: OnceCell<bool> = OnceCell::new();

/// Build the filter: `RUST_LOG` when set, else the configured filter
pub fn filter_for(config: &BridgeConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global fmt subscriber once.
///
/// Later calls are no-ops. Returns whether a subscriber installed by this
/// crate is active; `false` means the host already set its own.
pub fn init(config: &BridgeConfig) -> bool {
    *INSTALLED.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(filter_for(config))
            .with_target(true)
            .try_init()
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = BridgeConfig::default();
        let first = init(&config);
        assert_eq!(init(&config), first);
        assert_eq!(init(&config.with_log_filter("native_bridge=trace")), first);
    }

    #[test]
    fn test_filter_falls_back_to_default() {
        // An invalid configured filter never panics
        let config = BridgeConfig::default().with_log_filter("native_bridge=verbose");
        let _ = filter_for(&config);
    }
}

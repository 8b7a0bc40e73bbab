//! Bridge metrics for monitoring and observability.
//!
//! This module provides the counters the bridge keeps about object
//! lifecycles, native dispatch, and rejected calls.

use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Why a handle left the live table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseCause {
    /// Explicit release by the script
    Explicit,
    /// A closing method completed
    Closed,
    /// Host garbage collector finalized the script object
    Reclaimed,
    /// Bridge shutdown
    Shutdown,
}

/// Snapshot of bridge statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    /// Handles currently live
    pub live_handles: usize,

    /// Objects constructed
    pub constructed: u64,

    /// Handles released explicitly, by closing methods, or at shutdown
    pub released: u64,

    /// Handles reclaimed by the host garbage collector
    pub reclaimed: u64,

    /// Method and property dispatches
    pub invocations: u64,

    /// Free function calls
    pub function_calls: u64,

    /// Average native dispatch time in microseconds
    pub avg_dispatch_time_us: f64,

    /// Dispatch counts per callee (`Type.method` or function name)
    pub calls: HashMap<String, u64>,

    /// Rejected calls by error code
    pub errors: HashMap<String, u64>,
}

impl BridgeStats {
    /// Total rejected calls
    pub fn total_errors(&self) -> u64 {
        self.errors.values().sum()
    }
}

/// Metrics collector owned by one bridge
pub struct BridgeMetrics {
    constructed: AtomicU64,
    released: AtomicU64,
    reclaimed: AtomicU64,
    invocations: AtomicU64,
    function_calls: AtomicU64,
    total_dispatch_time_us: AtomicU64,
    calls: parking_lot::Mutex<HashMap<String, u64>>,
    error_counts: parking_lot::Mutex<HashMap<ErrorCode, u64>>,
}

impl BridgeMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            constructed: AtomicU64::new(0),
            released: AtomicU64::new(0),
            reclaimed: AtomicU64::new(0),
            invocations: AtomicU64::new(0),
            function_calls: AtomicU64::new(0),
            total_dispatch_time_us: AtomicU64::new(0),
            calls: parking_lot::Mutex::new(HashMap::new()),
            error_counts: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Record a successful construction
    pub fn record_construct(&self) {
        self.constructed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record released handles
    pub fn record_release(&self, cause: ReleaseCause, count: u64) {
        match cause {
            ReleaseCause::Reclaimed => self.reclaimed.fetch_add(count, Ordering::Relaxed),
            _ => self.released.fetch_add(count, Ordering::Relaxed),
        };
    }

    /// Record a completed method or property dispatch
    pub fn record_invocation(&self, callee: &str, elapsed: Duration) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.record_dispatch(callee, elapsed);
    }

    /// Record a completed free function call
    pub fn record_function_call(&self, callee: &str, elapsed: Duration) {
        self.function_calls.fetch_add(1, Ordering::Relaxed);
        self.record_dispatch(callee, elapsed);
    }

    fn record_dispatch(&self, callee: &str, elapsed: Duration) {
        self.total_dispatch_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        let mut calls = self.calls.lock();
        *calls.entry(callee.to_string()).or_insert(0) += 1;
    }

    /// Record a rejected call
    pub fn record_error(&self, code: ErrorCode) {
        let mut counts = self.error_counts.lock();
        *counts.entry(code).or_insert(0) += 1;
    }

    /// Get constructed object count
    pub fn constructed(&self) -> u64 {
        self.constructed.load(Ordering::Relaxed)
    }

    /// Get average dispatch time in microseconds
    pub fn avg_dispatch_time_us(&self) -> f64 {
        let total = self.invocations.load(Ordering::Relaxed)
            + self.function_calls.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            self.total_dispatch_time_us.load(Ordering::Relaxed) as f64 / total as f64
        }
    }

    /// Get error counts keyed by code
    pub fn error_counts(&self) -> HashMap<String, u64> {
        self.error_counts
            .lock()
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect()
    }

    /// Take a snapshot
    pub fn snapshot(&self, live_handles: usize) -> BridgeStats {
        BridgeStats {
            live_handles,
            constructed: self.constructed(),
            released: self.released.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            function_calls: self.function_calls.load(Ordering::Relaxed),
            avg_dispatch_time_us: self.avg_dispatch_time_us(),
            calls: self.calls.lock().clone(),
            errors: self.error_counts(),
        }
    }

    /// Export Prometheus-format metrics
    pub fn to_prometheus(&self, live_handles: usize) -> String {
        let stats = self.snapshot(live_handles);
        let mut output = String::new();

        output.push_str("# HELP native_bridge_live_handles Live native handles\n");
        output.push_str("# TYPE native_bridge_live_handles gauge\n");
        output.push_str(&format!("native_bridge_live_handles {}\n", stats.live_handles));

        output.push_str("\n# HELP native_bridge_objects_total Native object lifecycle events\n");
        output.push_str("# TYPE native_bridge_objects_total counter\n");
        output.push_str(&format!(
            "native_bridge_objects_total{{event=\"constructed\"}} {}\n",
            stats.constructed
        ));
        output.push_str(&format!(
            "native_bridge_objects_total{{event=\"released\"}} {}\n",
            stats.released
        ));
        output.push_str(&format!(
            "native_bridge_objects_total{{event=\"reclaimed\"}} {}\n",
            stats.reclaimed
        ));

        output.push_str("\n# HELP native_bridge_calls_total Native dispatches by callee\n");
        output.push_str("# TYPE native_bridge_calls_total counter\n");
        let mut calls: Vec<_> = stats.calls.iter().collect();
        calls.sort();
        for (callee, count) in calls {
            output.push_str(&format!(
                "native_bridge_calls_total{{callee=\"{}\"}} {}\n",
                callee, count
            ));
        }

        output.push_str("\n# HELP native_bridge_errors_total Rejected calls by code\n");
        output.push_str("# TYPE native_bridge_errors_total counter\n");
        let mut errors: Vec<_> = stats.errors.iter().collect();
        errors.sort();
        for (code, count) in errors {
            output.push_str(&format!(
                "native_bridge_errors_total{{code=\"{}\"}} {}\n",
                code, count
            ));
        }

        output
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer for measuring one native dispatch
pub struct DispatchTimer {
    start: Instant,
}

impl DispatchTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_causes() {
        let metrics = BridgeMetrics::new();
        metrics.record_release(ReleaseCause::Explicit, 1);
        metrics.record_release(ReleaseCause::Shutdown, 3);
        metrics.record_release(ReleaseCause::Reclaimed, 2);

        let stats = metrics.snapshot(0);
        assert_eq!(stats.released, 4);
        assert_eq!(stats.reclaimed, 2);
    }

    #[test]
    fn test_dispatch_counts() {
        let metrics = BridgeMetrics::new();
        metrics.record_invocation("MyObject.plusOne", Duration::from_micros(10));
        metrics.record_invocation("MyObject.plusOne", Duration::from_micros(30));
        metrics.record_function_call("file.mkdir", Duration::from_micros(20));

        let stats = metrics.snapshot(1);
        assert_eq!(stats.invocations, 2);
        assert_eq!(stats.function_calls, 1);
        assert_eq!(stats.calls["MyObject.plusOne"], 2);
        assert!((stats.avg_dispatch_time_us - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_error_counts() {
        let metrics = BridgeMetrics::new();
        metrics.record_error(ErrorCode::ArityMismatch);
        metrics.record_error(ErrorCode::ArityMismatch);
        metrics.record_error(ErrorCode::InvalidState);

        let stats = metrics.snapshot(0);
        assert_eq!(stats.errors["ARITY_MISMATCH"], 2);
        assert_eq!(stats.total_errors(), 3);
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = BridgeMetrics::new();
        metrics.record_construct();
        metrics.record_error(ErrorCode::Range);

        let output = metrics.to_prometheus(1);
        assert!(output.contains("native_bridge_live_handles 1"));
        assert!(output.contains("native_bridge_objects_total{event=\"constructed\"} 1"));
        assert!(output.contains("native_bridge_errors_total{code=\"RANGE\"} 1"));
    }

    #[test]
    fn test_stats_serialization() {
        let stats = BridgeMetrics::new().snapshot(2);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"liveHandles\":2"));
        assert!(json.contains("functionCalls"));
    }
}

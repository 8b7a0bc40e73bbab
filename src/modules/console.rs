//! `console` module.
//!
//! `console.log` renders its arguments the way a script would, joins them
//! with a single space and hands the line to a host [`ConsoleSink`].

use crate::bridge::Bridge;
use crate::error::NativeError;
use crate::registry::{Module, NativeFunction};
use crate::value::MarshaledValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;

/// Host destination for console output
pub trait ConsoleSink: Send + Sync {
    /// Write one line; the sink adds the line terminator
    fn write_line(&self, line: &str) -> std::io::Result<()>;
}

/// Sink writing to the process stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ConsoleSink for StdoutSink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

/// A captured console line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLine {
    /// When the line was written
    pub timestamp: DateTime<Utc>,
    /// Line text without terminator
    pub text: String,
}

/// Sink keeping every line in memory
#[derive(Debug, Default)]
pub struct CaptureSink {
    lines: parking_lot::Mutex<Vec<ConsoleLine>>,
}

impl CaptureSink {
    /// Create an empty capture sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured line texts, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().map(|l| l.text.clone()).collect()
    }

    /// Captured lines with timestamps
    pub fn entries(&self) -> Vec<ConsoleLine> {
        self.lines.lock().clone()
    }

    /// Drop captured lines
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl ConsoleSink for CaptureSink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        self.lines.lock().push(ConsoleLine {
            timestamp: Utc::now(),
            text: line.to_string(),
        });
        Ok(())
    }
}

/// Render arguments script-style, separated by one space
pub fn render_line(args: &[MarshaledValue]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the `console` module around `sink`
pub fn module(sink: Arc<dyn ConsoleSink>) -> Module {
    Module::new("console").with_function(NativeFunction::variadic(
        "log",
        move |_bridge: &Bridge, args: &[MarshaledValue]| {
            let line = render_line(args);
            tracing::debug!(target: "native_bridge::console", "{}", line);
            sink.write_line(&line).map_err(NativeError::from)?;
            Ok(())
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::value::Record;

    #[test]
    fn test_render_line() {
        let args = vec![
            "sum".into(),
            MarshaledValue::Int32(3),
            MarshaledValue::Bool(true),
            MarshaledValue::Null,
        ];
        assert_eq!(render_line(&args), "sum 3 true null");
    }

    #[test]
    fn test_render_compound_values() {
        let args = vec![
            MarshaledValue::Sequence(vec![1.into(), 2.into()]),
            MarshaledValue::Record(Record::new("UserTypeIS")),
        ];
        assert_eq!(render_line(&args), "1,2 [object UserTypeIS]");
    }

    #[test]
    fn test_log_reaches_sink() {
        let sink = Arc::new(CaptureSink::new());
        let bridge = Bridge::builder(BridgeConfig::default())
            .register_module(module(sink.clone()))
            .unwrap()
            .build()
            .unwrap();

        bridge
            .call("console.log", &["hello".into(), "world".into()])
            .unwrap();
        bridge.call("console.log", &[]).unwrap();

        assert_eq!(sink.lines(), vec!["hello world".to_string(), String::new()]);
        sink.clear();
        assert!(sink.entries().is_empty());
    }
}

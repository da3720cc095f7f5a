//! Live output sinks and duration formatting
//!
//! The recorder only requires "accepts a line of text with a severity"; the
//! default sink routes through the `tracing` crate, and `MemorySink` collects
//! lines in memory for assertions.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Severity of an emitted line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Successful call
    Info,
    /// Failed call
    Error,
}

/// Destination for per-call output lines
pub trait OutputSink: Send + Sync {
    /// Accept one formatted line at the given severity
    fn emit(&self, severity: Severity, line: &str);
}

/// Default sink: structured logging via `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn emit(&self, severity: Severity, line: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "medir", "{line}"),
            Severity::Error => tracing::error!(target: "medir", "{line}"),
        }
    }
}

/// In-memory sink collecting emitted lines, for tests and inspection
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines emitted so far
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OutputSink for MemorySink {
    fn emit(&self, severity: Severity, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((severity, line.to_string()));
    }
}

/// Render a duration at human scale
///
/// Policy: at least one second renders as seconds with 3 decimals; at least
/// one millisecond as milliseconds with 1 decimal; anything shorter as whole
/// microseconds.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 1.0 {
        format!("{secs:.3}s")
    } else if secs >= 0.001 {
        format!("{:.1}ms", secs * 1_000.0)
    } else {
        format!("{}µs", (secs * 1_000_000.0).round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds_range() {
        assert_eq!(format_duration(Duration::from_secs(1)), "1.000s");
        assert_eq!(format_duration(Duration::from_millis(2_345)), "2.345s");
    }

    #[test]
    fn test_format_milliseconds_range() {
        assert_eq!(format_duration(Duration::from_millis(1)), "1.0ms");
        assert_eq!(format_duration(Duration::from_micros(12_340)), "12.3ms");
        assert_eq!(format_duration(Duration::from_micros(999_900)), "999.9ms");
    }

    #[test]
    fn test_format_microseconds_range() {
        assert_eq!(format_duration(Duration::from_micros(999)), "999µs");
        assert_eq!(format_duration(Duration::from_micros(123)), "123µs");
        assert_eq!(format_duration(Duration::from_nanos(500)), "1µs");
        assert_eq!(format_duration(Duration::ZERO), "0µs");
    }

    #[test]
    fn test_memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.emit(Severity::Info, "first");
        sink.emit(Severity::Error, "second");
        assert_eq!(
            sink.lines(),
            vec![
                (Severity::Info, "first".to_string()),
                (Severity::Error, "second".to_string()),
            ]
        );
    }
}

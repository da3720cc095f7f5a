//! Result recorder: owns the call store and its lock
//!
//! One recorder instance accumulates the [`CallRecord`]s for one traced
//! target. Appends and snapshot reads go through a single mutex whose hold
//! time is one push or one clone; the traced operation itself never runs
//! under this lock.

use crate::call_record::{CallOutcome, CallRecord, CallStatus};
use crate::config::TracerConfig;
use crate::output::{format_duration, OutputSink, Severity, TracingSink};
use crate::reentrancy::ReentrancyToken;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Consistent, point-in-time view of all recorded calls plus totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSnapshot {
    /// Number of recorded calls
    pub total_calls: u64,
    /// Exact sum of `execution_time` over `calls`
    pub total_time: Duration,
    /// Records in recording order
    pub calls: Vec<CallRecord>,
}

/// Accumulates completed-call records for one traced target
pub struct CallRecorder {
    type_label: String,
    config: TracerConfig,
    token: ReentrancyToken,
    store: Mutex<Vec<CallRecord>>,
    sink: Arc<dyn OutputSink>,
}

impl CallRecorder {
    /// Create a recorder with the default `tracing`-backed output sink
    pub fn new(type_label: impl Into<String>, config: TracerConfig) -> Self {
        Self::with_sink(type_label, config, Arc::new(TracingSink))
    }

    /// Create a recorder emitting through a custom sink
    pub fn with_sink(
        type_label: impl Into<String>,
        config: TracerConfig,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            type_label: type_label.into(),
            config,
            token: ReentrancyToken::allocate(),
            store: Mutex::new(Vec::new()),
            sink,
        }
    }

    /// Target type name this recorder is labeled with
    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    /// Settings fixed at construction
    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// This recorder's private reentrancy token
    pub fn token(&self) -> ReentrancyToken {
        self.token
    }

    /// Qualified name for an operation on this recorder's target
    pub fn qualified_name(&self, operation: &str) -> String {
        format!("{}#{}", self.type_label, operation)
    }

    /// Record one completed call
    ///
    /// Calls shorter than the configured threshold are discarded without a
    /// record or a notification; a call exactly at the threshold is kept.
    /// The append is atomic with respect to concurrent recorders; the output
    /// line, when enabled, is emitted after the append, outside the lock.
    pub fn record_call(&self, operation: &str, execution_time: Duration, outcome: CallOutcome) {
        if execution_time < self.config.threshold {
            return;
        }
        let record = CallRecord::new(self.qualified_name(operation), execution_time, outcome);
        let emitted = self.config.auto_output.then(|| Self::render_line(&record));
        self.lock_store().push(record);
        if let Some((severity, line)) = emitted {
            self.sink.emit(severity, &line);
        }
    }

    /// Snapshot of everything recorded so far
    ///
    /// Computed from a copy taken under the store lock: no record appended
    /// after the copy appears, none is torn.
    pub fn fetch_results(&self) -> ResultSnapshot {
        let calls = self.lock_store().clone();
        let total_time = calls.iter().map(|call| call.execution_time).sum();
        ResultSnapshot {
            total_calls: calls.len() as u64,
            total_time,
            calls,
        }
    }

    fn render_line(record: &CallRecord) -> (Severity, String) {
        let duration = format_duration(record.execution_time);
        match (&record.status, &record.error) {
            (CallStatus::Error, Some(error)) => (
                Severity::Error,
                format!(
                    "{} finished in {duration} (error: {error})",
                    record.qualified_name
                ),
            ),
            _ => (
                Severity::Info,
                format!(
                    "{} finished in {duration} (success)",
                    record.qualified_name
                ),
            ),
        }
    }

    // An append-only store stays consistent even if a writer panicked mid-push
    fn lock_store(&self) -> std::sync::MutexGuard<'_, Vec<CallRecord>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

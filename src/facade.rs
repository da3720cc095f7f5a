//! Registration facade: declare "trace these methods" in one call
//!
//! Thin sugar over the interceptor and recorder. Options mirror the
//! historical duck-typed bag as an explicit, validated structure with exactly
//! two recognized keys.

use crate::config::{ConfigError, TracerConfig};
use crate::interceptor::CallInterceptor;
use crate::method_table::MethodTable;
use crate::output::OutputSink;
use crate::recorder::{CallRecorder, ResultSnapshot};
use serde::Deserialize;
use std::sync::Arc;

/// Tracing options: `threshold` in fractional seconds (default 0.001) and
/// `auto_output` (default false)
///
/// Unknown keys are rejected at deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceOptions {
    pub threshold: f64,
    pub auto_output: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            threshold: 0.001,
            auto_output: false,
        }
    }
}

/// Handle over one traced target: its recorder plus its interceptor
pub struct TraceHandle {
    recorder: Arc<CallRecorder>,
    interceptor: CallInterceptor,
}

impl std::fmt::Debug for TraceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceHandle").finish_non_exhaustive()
    }
}

impl TraceHandle {
    /// The recorder accumulating this target's calls
    pub fn recorder(&self) -> &Arc<CallRecorder> {
        &self.recorder
    }

    /// Snapshot of everything recorded so far
    pub fn fetch_results(&self) -> ResultSnapshot {
        self.recorder.fetch_results()
    }

    /// Wrap one more operation on `table` under the same recorder
    pub fn wrap_operation<R: 'static>(&mut self, table: &mut MethodTable<R>, operation: &str) {
        self.interceptor.wrap_operation(table, operation);
    }
}

/// Trace the listed methods of `table` with one shared recorder
///
/// Builds a recorder labeled with the table's type name, then wraps each
/// listed method once; names that do not exist are skipped silently, exactly
/// like direct `wrap_operation` calls.
pub fn trace_methods<R: 'static>(
    table: &mut MethodTable<R>,
    methods: &[&str],
    options: TraceOptions,
) -> Result<TraceHandle, ConfigError> {
    let config = TracerConfig::from_secs(options.threshold, options.auto_output)?;
    let recorder = Arc::new(CallRecorder::new(table.type_label(), config));
    Ok(wrap_all(table, methods, recorder))
}

/// Like [`trace_methods`], emitting per-call lines through a custom sink
pub fn trace_methods_with_sink<R: 'static>(
    table: &mut MethodTable<R>,
    methods: &[&str],
    options: TraceOptions,
    sink: Arc<dyn OutputSink>,
) -> Result<TraceHandle, ConfigError> {
    let config = TracerConfig::from_secs(options.threshold, options.auto_output)?;
    let recorder = Arc::new(CallRecorder::with_sink(table.type_label(), config, sink));
    Ok(wrap_all(table, methods, recorder))
}

fn wrap_all<R: 'static>(
    table: &mut MethodTable<R>,
    methods: &[&str],
    recorder: Arc<CallRecorder>,
) -> TraceHandle {
    let mut interceptor = CallInterceptor::new(Arc::clone(&recorder));
    for method in methods {
        interceptor.wrap_operation(table, method);
    }
    TraceHandle {
        recorder,
        interceptor,
    }
}

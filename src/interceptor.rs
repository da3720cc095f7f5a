//! Call interceptor: installs timing wrappers into method tables
//!
//! Wrapping is a setup-time operation (it needs `&mut` table access, which
//! the borrow checker enforces); dispatch through the wrapped entry is the
//! per-call hot path. The wrapper preserves the original entry's visibility
//! and full call surface, and the original body stays reachable under a
//! private alias.

use crate::call_record::{CallOutcome, ErrorInfo};
use crate::method_table::{Args, MethodError, MethodTable, Value};
use crate::recorder::CallRecorder;
use crate::reentrancy::ReentrancyGuard;
use fnv::FnvHashSet;
use std::sync::Arc;
use std::time::Instant;

/// Alias prefix under which wrapped originals are retained
pub const UNTRACED_ALIAS_PREFIX: &str = "__untraced_";

/// Identity of one instrumented operation: (table identity, operation name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TracedOperationKey {
    pub table_id: u64,
    pub operation: String,
}

impl TracedOperationKey {
    pub fn new(table_id: u64, operation: impl Into<String>) -> Self {
        Self {
            table_id,
            operation: operation.into(),
        }
    }
}

/// Installs timing wrappers, once per (table, operation) pair
///
/// Owns the already-wrapped key set; the recorder owns everything else.
pub struct CallInterceptor {
    recorder: Arc<CallRecorder>,
    wrapped: FnvHashSet<TracedOperationKey>,
}

impl CallInterceptor {
    /// Create an interceptor funneling completions into `recorder`
    pub fn new(recorder: Arc<CallRecorder>) -> Self {
        Self {
            recorder,
            wrapped: FnvHashSet::default(),
        }
    }

    /// The recorder this interceptor reports to
    pub fn recorder(&self) -> &Arc<CallRecorder> {
        &self.recorder
    }

    /// Whether (table id, operation) already carries a wrapper
    pub fn is_wrapped(&self, table_id: u64, operation: &str) -> bool {
        self.wrapped
            .contains(&TracedOperationKey::new(table_id, operation))
    }

    /// Install a timing wrapper around `operation` on `table`
    ///
    /// Silent no-op when the operation does not exist at any visibility, and
    /// when this (table, operation) pair was already wrapped. On success the
    /// original body is retained under the private alias
    /// `__untraced_<operation>` and the entry under the original name becomes
    /// the wrapper, at the original visibility.
    ///
    /// The wrapper itself:
    /// 1. consults the recorder's reentrancy flag for the current thread;
    ///    when set, passes straight through to the original, untimed;
    /// 2. otherwise sets the flag, times the original with a monotonic
    ///    clock, reports the completion (success or the raised error's class
    ///    and message) to the recorder, clears the flag on scope exit even
    ///    if the body raised, and returns the original outcome unchanged.
    pub fn wrap_operation<R: 'static>(&mut self, table: &mut MethodTable<R>, operation: &str) {
        let key = TracedOperationKey::new(table.id(), operation);
        if self.wrapped.contains(&key) {
            return;
        }
        let Some(original) = table.body_of(operation) else {
            return;
        };

        table.alias_method(format!("{UNTRACED_ALIAS_PREFIX}{operation}"), operation);

        let recorder = Arc::clone(&self.recorder);
        let name = operation.to_string();
        let wrapper = move |table: &MethodTable<R>,
                            receiver: &mut R,
                            args: Args|
              -> Result<Value, MethodError> {
            let Some(_guard) = ReentrancyGuard::enter(recorder.token()) else {
                return original(table, receiver, args);
            };
            let start = Instant::now();
            let outcome = original(table, receiver, args);
            let execution_time = start.elapsed();
            match &outcome {
                Ok(_) => recorder.record_call(&name, execution_time, CallOutcome::Success),
                Err(err) => recorder.record_call(
                    &name,
                    execution_time,
                    CallOutcome::Error(ErrorInfo::new(err.class_name(), err.message())),
                ),
            }
            outcome
        };
        table.replace_body(operation, Arc::new(wrapper));
        self.wrapped.insert(key);
    }
}

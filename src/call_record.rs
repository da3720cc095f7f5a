//! Completed-call records kept by the recorder store
//!
//! One `CallRecord` is created per qualifying invocation (duration at or
//! above the configured threshold) and is immutable afterwards. Records are
//! retained in memory for the lifetime of the owning recorder; there is no
//! deletion or mutation path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};

/// Outcome classification for a completed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// The traced body returned normally
    Success,
    /// The traced body raised an error
    Error,
}

/// Captured failure description: error class plus message
///
/// Populated only for error outcomes, so "error present iff status = error"
/// holds structurally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error class name (e.g., "RuntimeError", "NoMethodError")
    pub class: String,
    /// Human-readable failure message
    pub message: String,
}

impl ErrorInfo {
    /// Create an error description from class and message
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// Outcome reported by the interceptor to the recorder
///
/// The error payload travels with the variant so a success outcome cannot
/// carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Error(ErrorInfo),
}

impl CallOutcome {
    /// Status classification of this outcome
    pub fn status(&self) -> CallStatus {
        match self {
            CallOutcome::Success => CallStatus::Success,
            CallOutcome::Error(_) => CallStatus::Error,
        }
    }

    /// Consume the outcome, yielding the error description if any
    pub fn into_error(self) -> Option<ErrorInfo> {
        match self {
            CallOutcome::Success => None,
            CallOutcome::Error(info) => Some(info),
        }
    }
}

/// One immutable record of a completed qualifying invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Qualified operation name, "<Type>#<operation>"
    pub qualified_name: String,
    /// Wall-clock duration of the traced body
    pub execution_time: Duration,
    /// Success or error
    pub status: CallStatus,
    /// Failure description, present iff `status` is `Error`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorInfo>,
    /// Completion time of the call (recording time, not start time)
    pub timestamp: SystemTime,
}

impl CallRecord {
    /// Build a record for a call that just completed; timestamps it now
    pub fn new(qualified_name: String, execution_time: Duration, outcome: CallOutcome) -> Self {
        let status = outcome.status();
        let error = outcome.into_error();
        Self {
            qualified_name,
            execution_time,
            status,
            error,
            timestamp: SystemTime::now(),
        }
    }
}

//! JSON report format for trace snapshots
//!
//! In-memory rendering only; nothing here persists results.

use crate::call_record::{CallStatus, ErrorInfo};
use crate::recorder::ResultSnapshot;
use serde::{Deserialize, Serialize};
use std::time::UNIX_EPOCH;

/// A single traced call in report form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCall {
    /// Qualified operation name, "<Type>#<operation>"
    pub method: String,
    /// Wall-clock duration in fractional seconds
    pub execution_time_secs: f64,
    pub status: CallStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorInfo>,
    /// Completion time, microseconds since the UNIX epoch
    pub timestamp_micros: u64,
}

/// Full report over one recorder's snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub total_calls: u64,
    pub total_time_secs: f64,
    pub calls: Vec<JsonCall>,
}

impl JsonReport {
    /// Build a report from a snapshot
    pub fn from_snapshot(snapshot: &ResultSnapshot) -> Self {
        let calls = snapshot
            .calls
            .iter()
            .map(|record| JsonCall {
                method: record.qualified_name.clone(),
                execution_time_secs: record.execution_time.as_secs_f64(),
                status: record.status,
                error: record.error.clone(),
                timestamp_micros: record
                    .timestamp
                    .duration_since(UNIX_EPOCH)
                    .map(|since| since.as_micros() as u64)
                    .unwrap_or_default(),
            })
            .collect();
        Self {
            total_calls: snapshot.total_calls,
            total_time_secs: snapshot.total_time.as_secs_f64(),
            calls,
        }
    }

    /// Render the report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

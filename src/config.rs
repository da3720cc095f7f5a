//! Per-recorder tracer configuration
//!
//! Settings are fixed at construction. The threshold is the minimum
//! wall-clock duration a call must reach (inclusive) to be recorded.

use std::time::Duration;
use thiserror::Error;

/// Default recording threshold: 1 millisecond
pub const DEFAULT_THRESHOLD: Duration = Duration::from_millis(1);

/// Configuration validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Threshold seconds must be finite and non-negative
    #[error("invalid threshold {0}s: must be a finite, non-negative number of seconds")]
    InvalidThreshold(f64),
}

/// Recorder settings, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracerConfig {
    /// Minimum duration for a call to be recorded (inclusive)
    pub threshold: Duration,
    /// Emit one formatted line per recorded call
    pub auto_output: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            auto_output: false,
        }
    }
}

impl TracerConfig {
    /// Default configuration: 1ms threshold, auto output off
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a threshold given in fractional seconds
    ///
    /// Rejects negative, NaN, infinite, and overflowing thresholds at
    /// construction time rather than silently clamping them.
    pub fn from_secs(threshold_secs: f64, auto_output: bool) -> Result<Self, ConfigError> {
        let threshold = Duration::try_from_secs_f64(threshold_secs)
            .map_err(|_| ConfigError::InvalidThreshold(threshold_secs))?;
        Ok(Self {
            threshold,
            auto_output,
        })
    }

    /// Replace the threshold
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    /// Toggle per-call output
    pub fn with_auto_output(mut self, auto_output: bool) -> Self {
        self.auto_output = auto_output;
        self
    }
}

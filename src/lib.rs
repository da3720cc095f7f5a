//! Medir - Selective method-level call tracer
//!
//! This library provides runtime instrumentation for dynamic method tables:
//! pick a target's methods, and each call through the table is timed with a
//! monotonic clock and recorded with its success/error outcome, under
//! concurrent access, with consistent snapshots on demand. Nested traced
//! calls on one thread are passed through untimed via a per-tracer
//! reentrancy flag.

pub mod call_record;
pub mod config;
pub mod facade;
pub mod interceptor;
pub mod json_output;
pub mod method_table;
pub mod output;
pub mod recorder;
pub mod reentrancy;

//! Demo: trace two methods of a report builder and print the JSON snapshot
//!
//! ```bash
//! cargo run --example trace_demo
//! ```
//!
//! Per-call lines go to the `tracing` subscriber (stderr); the final snapshot
//! report is printed as JSON on stdout.

use anyhow::Result;
use medir::facade::{trace_methods, TraceOptions};
use medir::json_output::JsonReport;
use medir::method_table::{Args, MethodError, MethodTable, Value, Visibility};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Report {
    lines: Vec<String>,
}

fn report_table() -> MethodTable<Report> {
    let mut table = MethodTable::new("Report");
    table.define_method("add_line", Visibility::Public, |_, report: &mut Report, args| {
        let line = args.arg(0).and_then(Value::as_str).unwrap_or("").to_string();
        std::thread::sleep(Duration::from_millis(2));
        report.lines.push(line);
        Ok(Value::Int(report.lines.len() as i64))
    });
    table.define_method("publish", Visibility::Public, |_, report: &mut Report, _| {
        if report.lines.is_empty() {
            return Err(MethodError::raise("RuntimeError", "nothing to publish"));
        }
        std::thread::sleep(Duration::from_millis(5));
        Ok(Value::Str(report.lines.join("\n")))
    });
    table
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut table = report_table();
    let options = TraceOptions {
        threshold: 0.001,
        auto_output: true,
    };
    let handle = trace_methods(&mut table, &["add_line", "publish"], options)?;

    let mut report = Report::default();
    // A failing call first: the error propagates and is recorded
    if let Err(err) = table.invoke(&mut report, "publish", Args::new()) {
        tracing::warn!(target: "trace_demo", "expected failure: {err}");
    }
    table.invoke(&mut report, "add_line", Args::positional([Value::from("alpha")]))?;
    table.invoke(&mut report, "add_line", Args::positional([Value::from("beta")]))?;
    let body = table.invoke(&mut report, "publish", Args::new())?;
    tracing::info!(target: "trace_demo", "published {} bytes", body.to_string().len());

    let snapshot = handle.fetch_results();
    println!("{}", JsonReport::from_snapshot(&snapshot).to_json()?);
    Ok(())
}

//! Concurrency tests: many native threads driving wrapped operations
//!
//! The store mutex must lose no record, duplicate none, and tear none; the
//! snapshot must always be internally consistent while writers run.

use medir::call_record::CallStatus;
use medir::facade::{trace_methods, TraceOptions};
use medir::method_table::{Args, MethodError, MethodTable, Value, Visibility};
use std::time::Duration;

fn zero_threshold() -> TraceOptions {
    TraceOptions {
        threshold: 0.0,
        auto_output: false,
    }
}

#[test]
fn test_ten_threads_hundred_calls_each() {
    const THREADS: usize = 10;
    const CALLS: usize = 100;

    let mut table: MethodTable<u64> = MethodTable::new("Worker");
    table.define_method("work", Visibility::Public, |_, local: &mut u64, _| {
        *local += 1;
        Ok(Value::Int(*local as i64))
    });
    let handle = trace_methods(&mut table, &["work"], zero_threshold()).unwrap();

    let table = &table;
    crossbeam::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(move |_| {
                let mut local = 0u64;
                for _ in 0..CALLS {
                    table
                        .invoke(&mut local, "work", Args::new())
                        .expect("work succeeds");
                }
                assert_eq!(local, CALLS as u64);
            });
        }
    })
    .expect("worker threads join cleanly");

    let snapshot = handle.fetch_results();
    assert_eq!(snapshot.total_calls, (THREADS * CALLS) as u64);
    assert_eq!(snapshot.calls.len(), THREADS * CALLS);
    for record in &snapshot.calls {
        assert_eq!(record.qualified_name, "Worker#work");
        assert_eq!(record.status, CallStatus::Success);
        assert!(record.error.is_none());
    }
    let summed: Duration = snapshot.calls.iter().map(|c| c.execution_time).sum();
    assert_eq!(snapshot.total_time, summed);
}

#[test]
fn test_snapshots_stay_consistent_under_writers() {
    const WRITERS: usize = 4;
    const CALLS: usize = 200;

    let mut table: MethodTable<u64> = MethodTable::new("Worker");
    table.define_method("work", Visibility::Public, |_, local: &mut u64, _| {
        *local += 1;
        Ok(Value::Nil)
    });
    let handle = trace_methods(&mut table, &["work"], zero_threshold()).unwrap();

    let table = &table;
    let handle_ref = &handle;
    crossbeam::thread::scope(|scope| {
        for _ in 0..WRITERS {
            scope.spawn(move |_| {
                let mut local = 0u64;
                for _ in 0..CALLS {
                    table
                        .invoke(&mut local, "work", Args::new())
                        .expect("work succeeds");
                }
            });
        }
        // Reader races the writers; every snapshot it takes must be coherent
        scope.spawn(move |_| {
            let mut last_seen = 0u64;
            for _ in 0..100 {
                let snapshot = handle_ref.fetch_results();
                assert_eq!(snapshot.total_calls, snapshot.calls.len() as u64);
                let summed: Duration = snapshot.calls.iter().map(|c| c.execution_time).sum();
                assert_eq!(snapshot.total_time, summed);
                // Append-only store: counts never go backwards
                assert!(snapshot.total_calls >= last_seen);
                last_seen = snapshot.total_calls;
            }
        });
    })
    .expect("threads join cleanly");

    assert_eq!(
        handle.fetch_results().total_calls,
        (WRITERS * CALLS) as u64
    );
}

#[test]
fn test_concurrent_mixed_outcomes() {
    const THREADS: usize = 8;
    const CALLS: usize = 50;

    let mut table: MethodTable<u64> = MethodTable::new("Worker");
    table.define_method("flaky", Visibility::Public, |_, local: &mut u64, _| {
        *local += 1;
        if *local % 2 == 0 {
            Err(MethodError::raise("RuntimeError", "even call"))
        } else {
            Ok(Value::Nil)
        }
    });
    let handle = trace_methods(&mut table, &["flaky"], zero_threshold()).unwrap();

    let table = &table;
    crossbeam::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(move |_| {
                let mut local = 0u64;
                for _ in 0..CALLS {
                    // Failures still propagate to the caller
                    let _ = table.invoke(&mut local, "flaky", Args::new());
                }
            });
        }
    })
    .expect("threads join cleanly");

    let snapshot = handle.fetch_results();
    assert_eq!(snapshot.total_calls, (THREADS * CALLS) as u64);
    let errors = snapshot
        .calls
        .iter()
        .filter(|record| record.status == CallStatus::Error)
        .count();
    // Each thread alternates success/error, starting with success
    assert_eq!(errors, THREADS * CALLS / 2);
    for record in &snapshot.calls {
        assert_eq!(record.error.is_some(), record.status == CallStatus::Error);
    }
}

#[test]
fn test_reentrancy_flags_are_per_thread() {
    // Two threads inside the same traced operation at once must both be timed
    const THREADS: usize = 4;

    let mut table: MethodTable<()> = MethodTable::new("Worker");
    table.define_method("pause", Visibility::Public, |_, _, _| {
        std::thread::sleep(Duration::from_millis(5));
        Ok(Value::Nil)
    });
    let handle = trace_methods(&mut table, &["pause"], zero_threshold()).unwrap();

    let table = &table;
    crossbeam::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(move |_| {
                table
                    .invoke(&mut (), "pause", Args::new())
                    .expect("pause succeeds");
            });
        }
    })
    .expect("threads join cleanly");

    let snapshot = handle.fetch_results();
    assert_eq!(snapshot.total_calls, THREADS as u64);
    for record in &snapshot.calls {
        assert!(record.execution_time >= Duration::from_millis(5));
    }
}

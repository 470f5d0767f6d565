//! Stress tests for concurrent logging
//!
//! These tests verify:
//! - Concurrent appends racing size, timer and explicit flushes lose nothing
//! - No record is written twice
//! - Async dispatch accounts for every record under overflow
//! - Thread safety of the shared logger

use fanout_logger::prelude::*;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

fn assert_every_record_once(content: &str) {
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), THREADS * PER_THREAD, "lost or extra lines");

    let mut seen = HashSet::new();
    for line in &lines {
        let tag = line
            .rsplit(' ')
            .next()
            .expect("line should end with a record tag");
        assert!(seen.insert(tag.to_string()), "duplicated record {}", tag);
    }

    for t in 0..THREADS {
        for i in 0..PER_THREAD {
            assert!(seen.contains(&format!("t{}-r{}", t, i)), "missing t{}-r{}", t, i);
        }
    }
}

/// Concurrent appends while size, timer and explicit flushes all run
#[test]
fn test_concurrent_appends_and_flushes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("concurrent.log");

    let sink = Arc::new(
        BufferedFileSink::from_config(
            FileSinkConfig::new(&log_file)
                .with_max_buffer_size(4 * 1024)
                .with_flush_interval(Duration::from_millis(5)),
        )
        .expect("Failed to create sink"),
    );
    let mut logger = Logger::new();
    logger.add_transport(Arc::clone(&sink));
    let logger = Arc::new(logger);

    let flusher_sink = Arc::clone(&sink);
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flusher_stop = Arc::clone(&stop);
    let flusher = thread::spawn(move || {
        while !flusher_stop.load(Ordering::Relaxed) {
            flusher_sink.flush().expect("explicit flush failed");
            thread::sleep(Duration::from_millis(1));
        }
    });

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.info(format!("payload t{}-r{}", t, i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }
    stop.store(true, Ordering::Relaxed);
    flusher.join().expect("flusher thread panicked");

    sink.dispose().expect("dispose failed");

    let content = std::fs::read_to_string(&log_file).expect("Failed to read log file");
    assert_every_record_once(&content);
    assert_eq!(sink.metrics().records_lost(), 0);
    assert_eq!(
        sink.metrics().records_written(),
        (THREADS * PER_THREAD) as u64
    );
}

/// JSON lines output stays one valid object per line under contention
#[test]
fn test_concurrent_json_lines_are_whole() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("concurrent.jsonl");

    let sink = Arc::new(
        BufferedFileSink::from_config(
            FileSinkConfig::new(&log_file)
                .with_max_buffer_size(512)
                .with_flush_interval(Duration::from_millis(3)),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let context = LogContext::new().with_field("thread", t).with_field("seq", i);
                    sink.log(&LogEntry::new(LogLevel::Debug, format!("t{}-r{}", t, i), context));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    sink.dispose().unwrap();

    let content = std::fs::read_to_string(&log_file).unwrap();
    let mut messages = HashSet::new();
    for line in content.lines() {
        let record: serde_json::Value = serde_json::from_str(line).expect("torn JSON line");
        assert!(messages.insert(record["message"].as_str().unwrap().to_string()));
    }
    assert_eq!(messages.len(), THREADS * PER_THREAD);
}

/// JSON array writes from many threads keep the document valid
#[test]
fn test_concurrent_json_array_writes() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("array.json");
    let sink = Arc::new(JsonArrayFileSink::new(&log_file).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for i in 0..50 {
                    sink.log(&LogEntry::new(LogLevel::Info, format!("t{}-r{}", t, i), LogContext::new()));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let parsed: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&log_file).unwrap()).unwrap();
    assert_eq!(parsed.len(), 200);
    assert_eq!(sink.metrics().records_lost(), 0);
}

/// Every record sent to an async logger is either delivered or counted as dropped
#[test]
fn test_async_overflow_accounting() {
    struct SlowSink {
        delivered: Arc<AtomicUsize>,
    }

    impl Sink for SlowSink {
        fn log(&self, _entry: &LogEntry) {
            thread::sleep(Duration::from_micros(200));
            self.delivered.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    let delivered = Arc::new(AtomicUsize::new(0));
    let overflow_alerts = Arc::new(AtomicUsize::new(0));
    let alerts = Arc::clone(&overflow_alerts);

    let logger = Logger::builder()
        .async_mode(8)
        .overflow_policy(OverflowPolicy::AlertAndDrop)
        .on_overflow(Arc::new(move |_| {
            alerts.fetch_add(1, Ordering::SeqCst);
        }))
        .error_handler(Arc::new(|_, _| {}))
        .transport(SlowSink {
            delivered: Arc::clone(&delivered),
        })
        .build();
    let logger = Arc::new(logger);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..250 {
                    logger.info(format!("t{}-r{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    logger.flush().unwrap();

    let dropped = logger.dropped_count() as usize;
    assert_eq!(delivered.load(Ordering::SeqCst) + dropped, 1000);
    if dropped > 0 {
        assert!(overflow_alerts.load(Ordering::SeqCst) >= 1);
    }
}

/// Blocking policy delivers everything in per-thread order
#[test]
fn test_async_block_policy_preserves_order() {
    #[derive(Default)]
    struct OrderSink {
        messages: Mutex<Vec<String>>,
    }

    impl Sink for OrderSink {
        fn log(&self, entry: &LogEntry) {
            self.messages.lock().push(entry.message.clone());
        }

        fn name(&self) -> &str {
            "order"
        }
    }

    let sink = Arc::new(OrderSink::default());
    let logger = Arc::new(
        Logger::builder()
            .async_mode(4)
            .overflow_policy(OverflowPolicy::Block)
            .transport(Arc::clone(&sink))
            .build(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..100 {
                    logger.info(format!("{}:{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    logger.flush().unwrap();

    let messages = sink.messages.lock();
    assert_eq!(messages.len(), THREADS * 100);
    for t in 0..THREADS {
        let sequence: Vec<usize> = messages
            .iter()
            .filter_map(|m| m.split_once(':'))
            .filter(|(thread, _)| *thread == t.to_string())
            .map(|(_, i)| i.parse().unwrap())
            .collect();
        assert_eq!(sequence, (0..100).collect::<Vec<_>>());
    }
    assert_eq!(logger.dropped_count(), 0);
}

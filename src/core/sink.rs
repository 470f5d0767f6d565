//! Sink trait for log output destinations

use super::{error::Result, log_entry::LogEntry};
use std::sync::Arc;

/// A backend that records dispatched entries
///
/// `log` never reports failure to its caller: a sink catches its own I/O
/// errors, sends them to its diagnostic channel and drops the record.
/// Sinks use interior mutability so one instance can be shared between the
/// logger and the code that later flushes or disposes it.
///
/// # Example
///
/// ```
/// use fanout_logger::core::{LogEntry, Sink};
/// use parking_lot::Mutex;
///
/// #[derive(Default)]
/// struct MemorySink {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl Sink for MemorySink {
///     fn log(&self, entry: &LogEntry) {
///         self.lines.lock().push(entry.formatted.clone());
///     }
///
///     fn name(&self) -> &str {
///         "memory"
///     }
/// }
/// ```
pub trait Sink: Send + Sync {
    /// Record one entry
    fn log(&self, entry: &LogEntry);

    /// Push buffered records to their destination
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Stop background work and persist anything still buffered
    ///
    /// Must be idempotent.
    fn dispose(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn log(&self, entry: &LogEntry) {
        (**self).log(entry)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn dispose(&self) -> Result<()> {
        (**self).dispose()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn log(&self, entry: &LogEntry) {
        (**self).log(entry)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn dispose(&self) -> Result<()> {
        (**self).dispose()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

//! Main logger implementation
//!
//! The logger builds the context for each call, formats the entry once and
//! hands it to every registered sink in registration order. Sink failures
//! stop at the sink boundary; nothing here returns an error to the caller of
//! the logging methods.

use super::{
    diagnostics::{panic_message, Diagnostics, ErrorHandler},
    error::{LoggerError, Result},
    formatter::Formatter,
    log_context::{generate_base_context, FieldValue, LogContext, LoggerContext},
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    sink::Sink,
    timestamp::TimestampFormat,
    worker::{BackgroundWorker, DEFAULT_SHUTDOWN_TIMEOUT},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Queue settings applied to every sink in async mode
#[derive(Clone)]
struct AsyncConfig {
    capacity: usize,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
}

struct SinkSlot {
    sink: Arc<dyn Sink>,
    worker: Option<BackgroundWorker<Arc<LogEntry>>>,
}

pub struct Logger {
    min_level: LogLevel,
    sinks: Vec<SinkSlot>,
    context: LoggerContext,
    formatter: Formatter,
    async_config: Option<AsyncConfig>,
    /// Metrics for observability (dispatched, dropped, sink failures)
    metrics: Arc<LoggerMetrics>,
    diagnostics: Diagnostics,
    closed: AtomicBool,
}

impl Logger {
    /// Create a synchronous logger: sinks run on the calling thread
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Debug,
            sinks: Vec::new(),
            context: LoggerContext::new(),
            formatter: Formatter::default(),
            async_config: None,
            metrics: Arc::new(LoggerMetrics::new()),
            diagnostics: Diagnostics::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a fire-and-forget logger
    ///
    /// Every sink gets its own queue of `buffer_size` entries and its own
    /// worker thread, so `log` returns without waiting for any sink.
    #[must_use]
    pub fn with_async(buffer_size: usize) -> Self {
        let mut logger = Self::new();
        logger.async_config = Some(AsyncConfig {
            capacity: buffer_size,
            overflow_policy: OverflowPolicy::AlertAndDrop,
            on_overflow: None,
        });
        logger
    }

    /// Register a sink; invocation order is registration order
    pub fn add_transport<S: Sink + 'static>(&mut self, sink: S) {
        let sink: Arc<dyn Sink> = Arc::new(sink);
        let index = self.sinks.len();
        let worker = self
            .async_config
            .as_ref()
            .and_then(|config| self.spawn_worker(index, &sink, config));

        self.sinks.push(SinkSlot { sink, worker });
    }

    fn spawn_worker(
        &self,
        index: usize,
        sink: &Arc<dyn Sink>,
        config: &AsyncConfig,
    ) -> Option<BackgroundWorker<Arc<LogEntry>>> {
        let worker_sink = Arc::clone(sink);
        let metrics = Arc::clone(&self.metrics);
        let diagnostics = self.diagnostics.clone();

        let spawned = BackgroundWorker::spawn(
            format!("logger-sink-{}-{}", index, sink.name()),
            config.capacity,
            config.overflow_policy.clone(),
            self.diagnostics.clone(),
            move |entry: Arc<LogEntry>| {
                Self::invoke(index, &worker_sink, &entry, &metrics, &diagnostics);
            },
        );

        match spawned {
            Ok(worker) => Some(
                worker
                    .with_metrics(Arc::clone(&self.metrics))
                    .with_overflow_callback(config.on_overflow.clone()),
            ),
            Err(e) => {
                // Fall back to inline invocation for this sink
                self.diagnostics
                    .report(&format!("sink #{} ({})", index, sink.name()), &e);
                None
            }
        }
    }

    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Route pipeline failures to `handler` instead of stderr
    pub fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.diagnostics = Diagnostics::with_handler(handler);
    }

    /// Fields merged into every entry, below the caller's own context
    pub fn context(&self) -> &LoggerContext {
        &self.context
    }

    pub fn transport_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_async(&self) -> bool {
        self.async_config.is_some()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.dispatch(level, message.into(), None, None);
    }

    /// Log with structured context fields
    pub fn log_with_context(&self, level: LogLevel, message: impl Into<String>, context: LogContext) {
        self.dispatch(level, message.into(), None, Some(context));
    }

    /// Log with a correlation id placed in the base context
    pub fn log_correlated(
        &self,
        level: LogLevel,
        correlation_id: &str,
        message: impl Into<String>,
        context: Option<LogContext>,
    ) {
        self.dispatch(level, message.into(), Some(correlation_id), context);
    }

    fn dispatch(
        &self,
        level: LogLevel,
        message: String,
        correlation_id: Option<&str>,
        extra: Option<LogContext>,
    ) {
        if level < self.min_level {
            return;
        }
        if self.closed.load(Ordering::Acquire) {
            self.metrics.record_dropped();
            return;
        }

        let mut context = generate_base_context(correlation_id);
        if !self.context.is_empty() {
            context.merge(&self.context.to_log_context());
        }
        if let Some(ref extra) = extra {
            context.merge(extra);
        }

        let entry = Arc::new(LogEntry::with_formatter(
            level,
            message,
            context,
            &self.formatter,
        ));
        self.metrics.record_dispatched();

        for (index, slot) in self.sinks.iter().enumerate() {
            match slot.worker {
                // Overflow is counted and reported by the worker itself
                Some(ref worker) => {
                    let _ = worker.submit(Arc::clone(&entry));
                }
                None => Self::invoke(index, &slot.sink, &entry, &self.metrics, &self.diagnostics),
            }
        }
    }

    /// Call one sink with panic isolation
    ///
    /// A panicking sink is reported and counted; the remaining sinks still
    /// receive the entry.
    fn invoke(
        index: usize,
        sink: &Arc<dyn Sink>,
        entry: &LogEntry,
        metrics: &LoggerMetrics,
        diagnostics: &Diagnostics,
    ) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.log(entry)));

        if let Err(payload) = result {
            metrics.record_sink_failure();
            diagnostics.report(
                &format!("sink #{} ({})", index, sink.name()),
                &LoggerError::SinkPanicked(panic_message(payload.as_ref())),
            );
        }
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn debug_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Debug, message, context);
    }

    pub fn info_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Info, message, context);
    }

    pub fn warn_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Warn, message, context);
    }

    pub fn error_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Error, message, context);
    }

    /// Number of entries dropped by full queues or after shutdown
    pub fn dropped_count(&self) -> u64 {
        self.metrics.dropped_count()
    }

    /// Get the logger metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```
    /// use fanout_logger::Logger;
    ///
    /// let logger = Logger::with_async(100);
    /// logger.info("hello");
    ///
    /// let metrics = logger.metrics();
    /// assert_eq!(metrics.total_dispatched(), 1);
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Drain every sink queue, then flush every sink
    ///
    /// Every sink is attempted; the first error is returned.
    pub fn flush(&self) -> Result<()> {
        let mut first_error = None;

        for slot in &self.sinks {
            if let Some(ref worker) = slot.worker {
                if let Err(e) = worker.flush(DEFAULT_SHUTDOWN_TIMEOUT) {
                    first_error.get_or_insert(e);
                }
            }
            if let Err(e) = slot.sink.flush() {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Gracefully shut down: drain queues, then dispose every sink
    ///
    /// Entries logged afterwards are dropped. Calling this again is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if every queue drained within `timeout` and every sink
    /// disposed cleanly.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fanout_logger::Logger;
    /// use std::time::Duration;
    ///
    /// let logger = Logger::with_async(1000);
    /// logger.info("Important message");
    ///
    /// if !logger.shutdown(Duration::from_secs(10)) {
    ///     eprintln!("Warning: Logger shutdown timed out");
    /// }
    /// ```
    pub fn shutdown(&self, timeout: Duration) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return true;
        }

        let mut clean = true;
        for (index, slot) in self.sinks.iter().enumerate() {
            if let Some(ref worker) = slot.worker {
                clean &= worker.shutdown(timeout);
            }
            if let Err(e) = slot.sink.dispose() {
                self.diagnostics
                    .report(&format!("sink #{} ({})", index, slot.sink.name()), &e);
                clean = false;
            }
        }

        clean
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        // Report any dropped logs
        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} dropped logs (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use fanout_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .min_level(LogLevel::Info)
///     .field("service", "billing")
///     .transport(ConsoleSink::new())
///     .async_mode(1000)
///     .overflow_policy(OverflowPolicy::AlertAndDrop)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} logs dropped", count);
///     }))
///     .build();
/// ```
pub struct LoggerBuilder {
    min_level: LogLevel,
    sinks: Vec<Box<dyn Sink>>,
    async_buffer: Option<usize>,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    fields: Vec<(String, FieldValue)>,
    timestamp_format: TimestampFormat,
    error_handler: Option<ErrorHandler>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Debug,
            sinks: Vec::new(),
            async_buffer: None,
            overflow_policy: OverflowPolicy::AlertAndDrop,
            on_overflow: None,
            fields: Vec::new(),
            timestamp_format: TimestampFormat::default(),
            error_handler: None,
        }
    }

    /// Set minimum log level
    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Add a sink
    #[must_use = "builder methods return a new value"]
    pub fn transport<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Enable async mode with specified per-sink queue size
    ///
    /// If not called, the logger will use synchronous mode.
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, buffer_size: usize) -> Self {
        self.async_buffer = Some(buffer_size);
        self
    }

    /// Set the overflow policy for async sink queues
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set a callback for overflow notifications
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Add a field merged into every entry
    #[must_use = "builder methods return a new value"]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Set the timestamp rendering of the shared text line
    #[must_use = "builder methods return a new value"]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Route pipeline failures to `handler` instead of stderr
    #[must_use = "builder methods return a new value"]
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Build the Logger
    pub fn build(self) -> Logger {
        let mut logger = Logger::new();
        if let Some(capacity) = self.async_buffer {
            logger.async_config = Some(AsyncConfig {
                capacity,
                overflow_policy: self.overflow_policy,
                on_overflow: self.on_overflow,
            });
        }

        logger.set_min_level(self.min_level);
        if let Some(handler) = self.error_handler {
            logger.set_error_handler(handler);
        }
        let timestamp_format = match self.timestamp_format.validate() {
            Ok(()) => self.timestamp_format,
            Err(e) => {
                logger.diagnostics.report("logger", &e);
                TimestampFormat::default()
            }
        };
        logger.formatter = Formatter::new().with_timestamp_format(timestamp_format);
        for (key, value) in self.fields {
            logger.context.set(key, value);
        }
        for sink in self.sinks {
            logger.add_transport(sink);
        }

        logger
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_context::{CORRELATION_ID_FIELD, TIMESTAMP_FIELD};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    impl Sink for RecordingSink {
        fn log(&self, entry: &LogEntry) {
            self.entries.lock().push(entry.clone());
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn quiet_handler() -> ErrorHandler {
        Arc::new(|_, _| {})
    }

    #[test]
    fn test_builder_basic() {
        let logger = Logger::builder().min_level(LogLevel::Warn).build();
        assert_eq!(logger.min_level(), LogLevel::Warn);
        assert_eq!(logger.transport_count(), 0);
        assert!(!logger.is_async());
    }

    #[test]
    fn test_info_reaches_sink() {
        let sink = Arc::new(RecordingSink::default());
        let mut logger = Logger::new();
        logger.add_transport(Arc::clone(&sink));

        logger.info("Test message");

        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert!(entries[0].formatted.contains("Test message"));
        assert!(entries[0].context.contains_key(TIMESTAMP_FIELD));
    }

    #[test]
    fn test_context_layering() {
        let sink = Arc::new(RecordingSink::default());
        let logger = Logger::builder()
            .field("service", "billing")
            .field("region", "eu")
            .transport(Arc::clone(&sink))
            .build();

        logger.info_with_context(
            "charged",
            LogContext::new().with_field("region", "us").with_field("amount", 12),
        );

        let entries = sink.entries.lock();
        let context = &entries[0].context;
        assert_eq!(context.get("service"), Some(&FieldValue::from("billing")));
        assert_eq!(context.get("region"), Some(&FieldValue::from("us")));
        assert_eq!(context.get("amount"), Some(&FieldValue::Int(12)));
    }

    #[test]
    fn test_correlated_logging() {
        let sink = Arc::new(RecordingSink::default());
        let mut logger = Logger::new();
        logger.add_transport(Arc::clone(&sink));

        logger.log_correlated(LogLevel::Warn, "req-7", "slow", None);

        let entries = sink.entries.lock();
        assert_eq!(entries[0].context.correlation_id(), Some("req-7"));
        assert!(entries[0].formatted.contains(&format!("{}: req-7", CORRELATION_ID_FIELD)));
    }

    #[test]
    fn test_min_level_filters() {
        let sink = Arc::new(RecordingSink::default());
        let mut logger = Logger::new();
        logger.set_min_level(LogLevel::Warn);
        logger.add_transport(Arc::clone(&sink));

        logger.debug("hidden");
        logger.info("hidden");
        logger.warn("shown");
        logger.error("shown");

        assert_eq!(sink.entries.lock().len(), 2);
        assert_eq!(logger.metrics().total_dispatched(), 2);
    }

    #[test]
    fn test_async_mode_delivers_after_flush() {
        let sink = Arc::new(RecordingSink::default());
        let logger = Logger::builder()
            .async_mode(64)
            .overflow_policy(OverflowPolicy::Block)
            .transport(Arc::clone(&sink))
            .build();

        for i in 0..20 {
            logger.info(format!("Message {}", i));
        }
        logger.flush().unwrap();

        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 20);
        assert_eq!(entries[19].message, "Message 19");
    }

    #[test]
    fn test_logging_after_shutdown_is_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let mut logger = Logger::new();
        logger.set_error_handler(quiet_handler());
        logger.add_transport(Arc::clone(&sink));

        assert!(logger.shutdown(Duration::from_secs(1)));
        assert!(logger.shutdown(Duration::from_secs(1)));
        logger.info("late");

        assert!(sink.entries.lock().is_empty());
        assert_eq!(logger.dropped_count(), 1);
    }

    #[test]
    fn test_async_overflow_counts_drops() {
        struct SlowSink;
        impl Sink for SlowSink {
            fn log(&self, _entry: &LogEntry) {
                std::thread::sleep(Duration::from_millis(20));
            }
            fn name(&self) -> &str {
                "slow"
            }
        }

        let logger = Logger::builder()
            .async_mode(1)
            .overflow_policy(OverflowPolicy::DropNewest)
            .error_handler(quiet_handler())
            .transport(SlowSink)
            .build();

        for i in 0..10 {
            logger.debug(format!("Message {}", i));
        }

        assert!(logger.dropped_count() > 0);
    }

    #[test]
    fn test_invalid_timestamp_pattern_is_reported_not_panicked() {
        let sink = Arc::new(RecordingSink::default());
        let reports = Arc::new(Mutex::new(Vec::new()));
        let reports_clone = Arc::clone(&reports);

        let logger = Logger::builder()
            .timestamp_format(TimestampFormat::Custom("%Q".to_string()))
            .error_handler(Arc::new(move |source, err| {
                reports_clone.lock().push(format!("{}|{}", source, err));
            }))
            .transport(Arc::clone(&sink))
            .build();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| logger.info("hi")));
        assert!(outcome.is_ok());

        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("logger|Invalid configuration for timestamp format"));

        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].formatted.starts_with('['));
        assert!(entries[0].formatted.contains("Z] [INFO] hi"));
    }
}

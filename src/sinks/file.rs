//! Buffered file sink
//!
//! Records are rendered per destination type, collected in memory and
//! appended to the file in batches. A batch is written when the buffered
//! byte count reaches `max_buffer_size`, when the flush timer fires, on an
//! explicit `flush()` and on `dispose()`.
//!
//! Known limitation: a batch whose write fails is reported and counted as
//! lost; it is not re-queued.

use crate::core::{
    Diagnostics, ErrorHandler, Formatter, LogEntry, LoggerError, Result, Sink, SinkMetrics,
    TimestampFormat,
};
use crossbeam_channel::{bounded, select, tick, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default flush threshold in bytes (10 KiB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 10 * 1024;

/// Default flush timer interval (5 seconds)
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(5000);

/// Record representation, chosen by the destination's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `[<timestamp>] [<LEVEL>] <message> {<key: value>, ...}` per line
    Text,

    /// One JSON object per line (`.json`, `.jsonl`)
    JsonLines,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") | Some("jsonl") => FileFormat::JsonLines,
            _ => FileFormat::Text,
        }
    }
}

/// Configuration for `BufferedFileSink`
///
/// # Example
///
/// ```
/// use fanout_logger::sinks::FileSinkConfig;
/// use std::time::Duration;
///
/// let config = FileSinkConfig::new("logs/app.log")
///     .with_max_buffer_size(64 * 1024)
///     .with_flush_interval(Duration::from_secs(1));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    pub path: PathBuf,
    pub max_buffer_size: usize,
    #[serde(rename = "flush_interval_ms", with = "duration_ms")]
    pub flush_interval: Duration,
    pub timestamp_format: TimestampFormat,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("app.log"),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            timestamp_format: TimestampFormat::default(),
        }
    }
}

impl FileSinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_buffer_size(mut self, bytes: usize) -> Self {
        self.max_buffer_size = bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(LoggerError::config("file sink", "path must not be empty"));
        }
        if self.max_buffer_size == 0 {
            return Err(LoggerError::config(
                "file sink",
                "max_buffer_size must be greater than 0",
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(LoggerError::config(
                "file sink",
                "flush_interval must be greater than 0",
            ));
        }
        self.timestamp_format.validate()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Default)]
struct Buffer {
    records: Vec<String>,
    bytes: usize,
}

/// State shared with the flush timer thread
struct Inner {
    path: PathBuf,
    display_path: String,
    format: FileFormat,
    max_buffer_size: usize,
    formatter: Formatter,
    buffer: Mutex<Buffer>,
    /// Held for the whole of a flush so batches never interleave
    flush_lock: Mutex<()>,
    disposed: AtomicBool,
    metrics: SinkMetrics,
    diagnostics: Diagnostics,
}

impl Inner {
    fn render(&self, entry: &LogEntry) -> Result<String> {
        match self.format {
            FileFormat::Text => Ok(self.formatter.format_text(
                &entry.message,
                entry.level,
                Some(&entry.context),
            )),
            FileFormat::JsonLines => {
                let record =
                    self.formatter
                        .to_json_record(&entry.message, entry.level, Some(&entry.context));
                Ok(serde_json::to_string(&record)?)
            }
        }
    }

    /// Buffer one rendered record
    ///
    /// Returns `true` when the buffer has reached the flush threshold.
    fn append(&self, record: String) -> Result<bool> {
        let mut buffer = self.buffer.lock();
        // Checked under the buffer lock so dispose's final flush sees every
        // accepted record
        if self.disposed.load(Ordering::Acquire) {
            return Err(LoggerError::sink_disposed(&self.display_path));
        }

        buffer.bytes += record.len();
        buffer.records.push(record);
        Ok(buffer.bytes >= self.max_buffer_size)
    }

    fn log_record(&self, record: String) {
        match self.append(record) {
            Ok(true) => {
                if let Err(e) = self.flush() {
                    self.diagnostics.report("file", &e);
                }
            }
            Ok(false) => {}
            Err(e) => {
                self.metrics.record_lost(1);
                self.diagnostics.report("file", &e);
            }
        }
    }

    fn flush(&self) -> Result<()> {
        let _flushing = self.flush_lock.lock();

        // Swap the buffer out before writing; appends made during the write
        // go to the next batch
        let batch = {
            let mut buffer = self.buffer.lock();
            if buffer.records.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *buffer)
        };

        let count = batch.records.len();
        let mut payload = batch.records.join("\n");
        payload.push('\n');

        match self.write(payload.as_bytes()) {
            Ok(()) => {
                self.metrics.record_write(count, payload.len());
                Ok(())
            }
            Err(e) => {
                self.metrics.record_lost(count);
                Err(e)
            }
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LoggerError::io_operation("opening log file", &self.display_path, e))?;

        file.write_all(bytes)
            .map_err(|e| LoggerError::io_operation("appending to log file", &self.display_path, e))
    }
}

struct FlushTimer {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl FlushTimer {
    fn start(inner: &Arc<Inner>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = bounded::<()>(0);
        let ticker = tick(interval);
        let inner = Arc::clone(inner);

        let handle = thread::Builder::new()
            .name("file-sink-flush".to_string())
            .spawn(move || loop {
                select! {
                    recv(ticker) -> _ => {
                        if let Err(e) = inner.flush() {
                            inner.diagnostics.report("file", &e);
                        }
                    }
                    // Disconnected when the sink drops the sender
                    recv(stopped) -> _ => break,
                }
            })
            .map_err(|e| LoggerError::io_operation("spawning flush timer", "file sink", e))?;

        Ok(Self { stop, handle })
    }

    fn cancel(self, diagnostics: &Diagnostics) {
        drop(self.stop);
        if self.handle.join().is_err() {
            diagnostics.report("file", &LoggerError::other("flush timer thread panicked"));
        }
    }
}

/// Line-buffered file sink with size and time triggered flushes
///
/// # Example
///
/// ```no_run
/// use fanout_logger::prelude::*;
/// use std::sync::Arc;
///
/// let sink = Arc::new(BufferedFileSink::new("logs/app.log")?);
/// let mut logger = Logger::new();
/// logger.add_transport(Arc::clone(&sink));
///
/// logger.info("service started");
/// sink.dispose()?;
/// # Ok::<(), fanout_logger::LoggerError>(())
/// ```
pub struct BufferedFileSink {
    inner: Arc<Inner>,
    timer: Mutex<Option<FlushTimer>>,
}

impl BufferedFileSink {
    /// Open a sink with the default threshold and interval
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_config(FileSinkConfig::new(path))
    }

    pub fn from_config(config: FileSinkConfig) -> Result<Self> {
        Self::with_diagnostics(config, Diagnostics::default())
    }

    /// Open a sink that reports failures to `handler` instead of stderr
    pub fn with_error_handler(config: FileSinkConfig, handler: ErrorHandler) -> Result<Self> {
        Self::with_diagnostics(config, Diagnostics::with_handler(handler))
    }

    fn with_diagnostics(config: FileSinkConfig, diagnostics: Diagnostics) -> Result<Self> {
        config.validate()?;

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::file_sink(
                        config.path.display().to_string(),
                        format!("failed to create directory: {}", e),
                    )
                })?;
            }
        }

        let inner = Arc::new(Inner {
            display_path: config.path.display().to_string(),
            format: FileFormat::from_path(&config.path),
            path: config.path,
            max_buffer_size: config.max_buffer_size,
            formatter: Formatter::new().with_timestamp_format(config.timestamp_format),
            buffer: Mutex::new(Buffer::default()),
            flush_lock: Mutex::new(()),
            disposed: AtomicBool::new(false),
            metrics: SinkMetrics::new(),
            diagnostics,
        });
        let timer = FlushTimer::start(&inner, config.flush_interval)?;

        Ok(Self {
            inner,
            timer: Mutex::new(Some(timer)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn format(&self) -> FileFormat {
        self.inner.format
    }

    /// Bytes currently waiting in the buffer
    pub fn buffered_bytes(&self) -> usize {
        self.inner.buffer.lock().bytes
    }

    pub fn buffered_records(&self) -> usize {
        self.inner.buffer.lock().records.len()
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.inner.metrics
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn is_timer_active(&self) -> bool {
        self.timer.lock().is_some()
    }
}

impl Sink for BufferedFileSink {
    fn log(&self, entry: &LogEntry) {
        match self.inner.render(entry) {
            Ok(record) => self.inner.log_record(record),
            Err(e) => {
                self.inner.metrics.record_lost(1);
                self.inner.diagnostics.report("file", &e);
            }
        }
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    /// Stop the timer, then write whatever is still buffered
    fn dispose(&self) -> Result<()> {
        {
            let _buffer = self.inner.buffer.lock();
            self.inner.disposed.store(true, Ordering::Release);
        }

        if let Some(timer) = self.timer.lock().take() {
            timer.cancel(&self.inner.diagnostics);
        }

        self.inner.flush()
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for BufferedFileSink {
    fn drop(&mut self) {
        // Ensure all buffered records reach the file
        if let Err(e) = self.dispose() {
            self.inner.diagnostics.report("file", &e);
        }
    }
}

//! JSON array file sink
//!
//! Keeps the destination a single JSON array of log objects. Each record is
//! written immediately: the closing `]` is truncated and `,<record>]` is
//! appended.
//!
//! Whitespace around the brackets is tolerated, so `[ ]` or a trailing
//! newline written by another tool still counts as a valid array.
//!
//! Known limitation: truncation and append are two separate system calls.
//! A crash between them leaves the array unterminated, and the sink will then
//! report the file as corrupt instead of writing to it.

use crate::core::{
    Diagnostics, ErrorHandler, Formatter, LogEntry, LoggerError, Result, Sink, SinkMetrics,
    TimestampFormat,
};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// File sink whose destination is always one JSON array
pub struct JsonArrayFileSink {
    path: PathBuf,
    display_path: String,
    formatter: Formatter,
    /// Serializes the read-truncate-append sequence
    write_lock: Mutex<()>,
    disposed: AtomicBool,
    metrics: SinkMetrics,
    diagnostics: Diagnostics,
}

impl JsonArrayFileSink {
    /// Create a new JSON array sink, creating parent directories as needed
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let display_path = path.display().to_string();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::file_sink(&display_path, format!("failed to create directory: {}", e))
                })?;
            }
        }

        Ok(Self {
            path,
            display_path,
            formatter: Formatter::default(),
            write_lock: Mutex::new(()),
            disposed: AtomicBool::new(false),
            metrics: SinkMetrics::new(),
            diagnostics: Diagnostics::default(),
        })
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.formatter = Formatter::new().with_timestamp_format(format);
        self
    }

    /// Report failures to `handler` instead of stderr
    #[must_use]
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.diagnostics = Diagnostics::with_handler(handler);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Add one element to the array in the destination file
    ///
    /// Fails with `SinkDisposed` once the sink has been disposed.
    pub fn append_record(&self, record: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(record)?;
        let _guard = self.write_lock.lock();
        if self.disposed.load(Ordering::Acquire) {
            return Err(LoggerError::sink_disposed(&self.display_path));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| self.io_error("opening JSON array file", e))?;

        let len = file
            .metadata()
            .map_err(|e| self.io_error("reading JSON array file size", e))?
            .len();

        let closing = last_significant_byte(&mut file, len)
            .map_err(|e| self.io_error("reading JSON array tail", e))?;

        // Absent, empty or whitespace-only: start a new document
        let Some((close_pos, close_byte)) = closing else {
            let document = format!("[{}]", json);
            file.set_len(0)
                .and_then(|_| file.seek(SeekFrom::Start(0)))
                .and_then(|_| file.write_all(document.as_bytes()))
                .map_err(|e| self.io_error("writing JSON array file", e))?;
            self.metrics.record_write(1, document.len());
            return Ok(());
        };

        if close_byte != b']' {
            return Err(LoggerError::corrupt_document(
                &self.display_path,
                "file does not end with ']'",
            ));
        }
        let opening = first_significant_byte(&mut file, close_pos)
            .map_err(|e| self.io_error("reading JSON array head", e))?;
        if opening != Some(b'[') {
            return Err(LoggerError::corrupt_document(
                &self.display_path,
                "file does not start with '['",
            ));
        }
        let previous = last_significant_byte(&mut file, close_pos)
            .map_err(|e| self.io_error("reading JSON array tail", e))?;

        let piece = match previous {
            Some((_, b'[')) => format!("{}]", json),
            _ => format!(",{}]", json),
        };

        file.set_len(close_pos)
            .map_err(|e| self.io_error("truncating JSON array file", e))?;
        file.seek(SeekFrom::End(0))
            .and_then(|_| file.write_all(piece.as_bytes()))
            .map_err(|e| self.io_error("appending to JSON array file", e))?;

        self.metrics.record_write(1, piece.len());
        Ok(())
    }

    fn io_error(&self, operation: &str, source: std::io::Error) -> LoggerError {
        LoggerError::io_operation(operation, &self.display_path, source)
    }
}

const SCAN_WINDOW: usize = 64;

fn is_json_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\n' | b'\r' | b'\t')
}

/// Position and value of the last non-whitespace byte before `end`
fn last_significant_byte(file: &mut File, end: u64) -> io::Result<Option<(u64, u8)>> {
    let mut window = [0u8; SCAN_WINDOW];
    let mut end = end;
    while end > 0 {
        let start = end.saturating_sub(SCAN_WINDOW as u64);
        let chunk = &mut window[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(chunk)?;
        if let Some(offset) = chunk.iter().rposition(|b| !is_json_whitespace(*b)) {
            return Ok(Some((start + offset as u64, chunk[offset])));
        }
        end = start;
    }
    Ok(None)
}

/// First non-whitespace byte before `end`
fn first_significant_byte(file: &mut File, end: u64) -> io::Result<Option<u8>> {
    let mut window = [0u8; SCAN_WINDOW];
    let mut start = 0;
    while start < end {
        let stop = (start + SCAN_WINDOW as u64).min(end);
        let chunk = &mut window[..(stop - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(chunk)?;
        if let Some(byte) = chunk.iter().copied().find(|b| !is_json_whitespace(*b)) {
            return Ok(Some(byte));
        }
        start = stop;
    }
    Ok(None)
}

impl Sink for JsonArrayFileSink {
    fn log(&self, entry: &LogEntry) {
        let record = self
            .formatter
            .to_json_record(&entry.message, entry.level, Some(&entry.context));

        if let Err(e) = self.append_record(&record) {
            self.metrics.record_lost(1);
            self.diagnostics.report(self.name(), &e);
        }
    }

    fn dispose(&self) -> Result<()> {
        // Take the lock so an in-flight append completes first
        let _guard = self.write_lock.lock();
        self.disposed.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        "json-array"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogContext, LogLevel};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_two_records_form_array() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("records.json");
        let sink = JsonArrayFileSink::new(&path)?;

        let r1 = json!({"message": "first", "level": "info"});
        let r2 = json!({"message": "second", "level": "error", "code": 7});
        sink.append_record(&r1)?;
        sink.append_record(&r2)?;

        let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(parsed, json!([r1, r2]));
        assert_eq!(sink.metrics().records_written(), 2);

        Ok(())
    }

    #[test]
    fn test_appends_to_empty_array() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.json");
        fs::write(&path, "[]")?;
        let sink = JsonArrayFileSink::new(&path)?;

        sink.append_record(&json!({"n": 1}))?;

        assert_eq!(fs::read_to_string(&path)?, r#"[{"n":1}]"#);
        Ok(())
    }

    #[test]
    fn test_appends_to_empty_array_with_whitespace() -> Result<()> {
        let dir = tempdir()?;

        for (name, initial) in [("spaced.json", "[ ]"), ("lines.json", "[\n]\n"), ("blank.json", "\n  \n")] {
            let path = dir.path().join(name);
            fs::write(&path, initial)?;
            let sink = JsonArrayFileSink::new(&path)?;

            sink.append_record(&json!({"n": 1}))?;
            sink.append_record(&json!({"n": 2}))?;

            let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
            assert_eq!(parsed, json!([{"n": 1}, {"n": 2}]), "starting from {:?}", initial);
        }

        Ok(())
    }

    #[test]
    fn test_appends_after_trailing_newline() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("pretty.json");
        fs::write(&path, "[\n  {\"n\": 1}\n]\n")?;
        let sink = JsonArrayFileSink::new(&path)?;

        sink.append_record(&json!({"n": 2}))?;

        let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(parsed, json!([{"n": 1}, {"n": 2}]));
        Ok(())
    }

    #[test]
    fn test_missing_opening_bracket_is_corrupt() -> Result<()> {
        let dir = tempdir()?;

        for (name, initial) in [("bare.json", "]"), ("object.json", "{\"n\": 1}]")] {
            let path = dir.path().join(name);
            fs::write(&path, initial)?;
            let sink = JsonArrayFileSink::new(&path)?;

            let result = sink.append_record(&json!({"n": 2}));

            assert!(matches!(result, Err(LoggerError::CorruptDocument { .. })));
            assert_eq!(fs::read_to_string(&path)?, initial);
        }

        Ok(())
    }

    #[test]
    fn test_append_record_after_dispose_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("closed.json");
        let sink = JsonArrayFileSink::new(&path)?;

        sink.append_record(&json!({"n": 1}))?;
        sink.dispose()?;
        let result = sink.append_record(&json!({"n": 2}));

        assert!(matches!(result, Err(LoggerError::SinkDisposed { .. })));
        assert_eq!(fs::read_to_string(&path)?, r#"[{"n":1}]"#);
        Ok(())
    }

    #[test]
    fn test_corrupt_document_left_untouched() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"[{"n":1}"#)?;
        let sink = JsonArrayFileSink::new(&path)?;

        let result = sink.append_record(&json!({"n": 2}));

        assert!(matches!(result, Err(LoggerError::CorruptDocument { .. })));
        assert_eq!(fs::read_to_string(&path)?, r#"[{"n":1}"#);
        Ok(())
    }

    #[test]
    fn test_log_writes_structured_entry() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("entries.json");
        let sink = JsonArrayFileSink::new(&path)?;

        let context = LogContext::new().with_field("user", "alice");
        sink.log(&LogEntry::new(LogLevel::Info, "login", context.clone()));
        sink.log(&LogEntry::new(LogLevel::Warn, "retry", context));

        let parsed: Vec<serde_json::Value> = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["message"], "login");
        assert_eq!(parsed[1]["level"], "warn");
        assert_eq!(parsed[1]["user"], "alice");

        Ok(())
    }

    #[test]
    fn test_log_after_dispose_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("closed.json");
        let reports = Arc::new(AtomicUsize::new(0));
        let reports_clone = Arc::clone(&reports);
        let sink = JsonArrayFileSink::new(&path)?.with_error_handler(Arc::new(move |_, _| {
            reports_clone.fetch_add(1, Ordering::SeqCst);
        }));

        sink.dispose()?;
        sink.log(&LogEntry::new(LogLevel::Info, "late", LogContext::new()));

        assert!(!path.exists());
        assert_eq!(sink.metrics().records_lost(), 1);
        assert_eq!(reports.load(Ordering::SeqCst), 1);
        Ok(())
    }
}

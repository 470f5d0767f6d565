//! Core logger types and traits

pub mod diagnostics;
pub mod error;
pub mod formatter;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod sink;
pub mod timestamp;
pub mod worker;

pub use diagnostics::{Diagnostics, ErrorHandler};
pub use error::{LoggerError, Result};
pub use formatter::{format_message, Formatter, OutputFormat};
pub use log_context::{
    enrich_context, generate_base_context, FieldValue, LogContext, LoggerContext,
    CORRELATION_ID_FIELD, TIMESTAMP_FIELD,
};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::{LoggerMetrics, SinkMetrics};
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use sink::Sink;
pub use timestamp::TimestampFormat;
pub use worker::{BackgroundWorker, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT};

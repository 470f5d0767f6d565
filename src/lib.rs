//! # Fanout Logger
//!
//! A structured logging library: a central `Logger` accepts leveled,
//! contextual messages and fans each one out to a set of sinks.
//!
//! ## Features
//!
//! - **Context enrichment**: every entry carries a timestamp, optional
//!   correlation id, logger-wide fields and the caller's own fields
//! - **Failure isolation**: a failing or panicking sink never affects the
//!   caller or the other sinks
//! - **Buffered file output**: size and time triggered batch writes, plain
//!   text or JSON lines by file extension, plus a JSON array variant
//! - **Remote sinks**: HTTP and search-index backends posting from their own
//!   worker threads (`network` feature)
//! - **Request tracing**: a tower layer threading a correlation id through
//!   every log call of a request (`middleware` feature)
//!
//! ## Example
//!
//! ```no_run
//! use fanout_logger::prelude::*;
//! use std::sync::Arc;
//!
//! let file = Arc::new(BufferedFileSink::new("logs/app.log")?);
//! let logger = Logger::builder()
//!     .field("service", "checkout")
//!     .transport(ConsoleSink::new())
//!     .transport(Arc::clone(&file))
//!     .build();
//!
//! logger.info_with_context("order placed", LogContext::new().with_field("order_id", 981));
//! logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
//! # Ok::<(), fanout_logger::LoggerError>(())
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

#[cfg(feature = "middleware")]
pub mod middleware;

pub mod prelude {
    pub use crate::core::{
        enrich_context, format_message, generate_base_context, ErrorHandler, FieldValue,
        LogContext, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerContext, LoggerError,
        LoggerMetrics, OutputFormat, OverflowCallback, OverflowPolicy, Result, Sink, SinkMetrics,
        TimestampFormat, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{
        BufferedFileSink, ConsoleSink, FileFormat, FileSinkConfig, IndexClient,
        JsonArrayFileSink, SearchIndexConfig, SearchIndexSink,
    };

    #[cfg(feature = "network")]
    pub use crate::sinks::{HttpIndexClient, HttpSink, HttpSinkConfig};

    #[cfg(feature = "middleware")]
    pub use crate::middleware::{RequestLogger, RequestTracingLayer, TracingConfig};
}

pub use crate::core::{
    enrich_context, format_message, generate_base_context, ErrorHandler, FieldValue, LogContext,
    LogEntry, LogLevel, Logger, LoggerBuilder, LoggerContext, LoggerError, LoggerMetrics,
    OutputFormat, OverflowCallback, OverflowPolicy, Result, Sink, SinkMetrics, TimestampFormat,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use sinks::{BufferedFileSink, ConsoleSink, JsonArrayFileSink, SearchIndexSink};

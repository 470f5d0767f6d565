//! Per-request logging helper

use crate::core::{LogContext, LogLevel, Logger};
use std::sync::Arc;

/// Logs through the shared logger with the request's correlation id
///
/// Inserted into the request extensions by `RequestTracingService`:
///
/// ```
/// use fanout_logger::middleware::RequestLogger;
///
/// fn handle(request: &http::Request<()>) {
///     if let Some(log) = request.extensions().get::<RequestLogger>() {
///         log.info("loading account");
///     }
/// }
/// ```
#[derive(Clone)]
pub struct RequestLogger {
    logger: Arc<Logger>,
    correlation_id: String,
}

impl RequestLogger {
    pub fn new(logger: Arc<Logger>, correlation_id: impl Into<String>) -> Self {
        Self {
            logger,
            correlation_id: correlation_id.into(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.logger
            .log_correlated(level, &self.correlation_id, message, None);
    }

    pub fn log_with_context(&self, level: LogLevel, message: impl Into<String>, context: LogContext) {
        self.logger
            .log_correlated(level, &self.correlation_id, message, Some(context));
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }
}

impl std::fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogger")
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

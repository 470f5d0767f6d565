//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. A leading
//! `ctx: <expr>;` attaches a `LogContext` to the entry.
//!
//! # Examples
//!
//! ```
//! use fanout_logger::prelude::*;
//! use fanout_logger::info;
//!
//! let logger = Logger::new();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // With structured context
//! let user_id = 42;
//! info!(logger, ctx: LogContext::new().with_field("user_id", user_id); "User {} logged in", user_id);
//! ```

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = Logger::new();
/// use fanout_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Warn, ctx: LogContext::new().with_field("code", 503); "Upstream unavailable");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, ctx: $ctx:expr; $($arg:tt)+) => {
        $logger.log_with_context($level, format!($($arg)+), $ctx)
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = Logger::new();
/// use fanout_logger::debug;
/// debug!(logger, "Debug information");
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = Logger::new();
/// use fanout_logger::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = Logger::new();
/// use fanout_logger::warn;
/// warn!(logger, "Low disk space");
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = Logger::new();
/// use fanout_logger::error;
/// error!(logger, "Failed to connect to database");
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogContext, LogEntry, LogLevel, Logger, Sink};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Captured {
        entries: Mutex<Vec<LogEntry>>,
    }

    impl Sink for Captured {
        fn log(&self, entry: &LogEntry) {
            self.entries.lock().push(entry.clone());
        }

        fn name(&self) -> &str {
            "captured"
        }
    }

    fn capturing_logger() -> (Logger, Arc<Captured>) {
        let sink = Arc::new(Captured::default());
        let mut logger = Logger::new();
        logger.add_transport(Arc::clone(&sink));
        (logger, sink)
    }

    #[test]
    fn test_log_macro() {
        let (logger, sink) = capturing_logger();
        log!(logger, LogLevel::Info, "Test message");
        log!(logger, LogLevel::Info, "Formatted: {}", 42);

        let entries = sink.entries.lock();
        assert_eq!(entries[0].message, "Test message");
        assert_eq!(entries[1].message, "Formatted: 42");
    }

    #[test]
    fn test_level_macros() {
        let (logger, sink) = capturing_logger();
        debug!(logger, "Count: {}", 5);
        info!(logger, "Items: {}", 100);
        warn!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);

        let levels: Vec<LogLevel> = sink.entries.lock().iter().map(|e| e.level).collect();
        assert_eq!(levels, LogLevel::ALL.to_vec());
    }

    #[test]
    fn test_context_form() {
        let (logger, sink) = capturing_logger();
        let context = LogContext::new().with_field("attempt", 2);
        warn!(logger, ctx: context; "Retrying {}", "upload");

        let entries = sink.entries.lock();
        assert_eq!(entries[0].message, "Retrying upload");
        assert!(entries[0].context.contains_key("attempt"));
    }
}

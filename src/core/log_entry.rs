//! Log entry structure

use super::formatter::Formatter;
use super::log_context::LogContext;
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};

/// One dispatched record, shared by every sink
///
/// `formatted` is rendered once by the dispatcher with line breaks in the
/// message escaped; `message` keeps the text as logged. Sinks that need a
/// different representation re-derive it from `message`, `level` and
/// `context`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: LogContext,
    #[serde(skip)]
    pub formatted: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, context: LogContext) -> Self {
        Self::with_formatter(level, message, context, &Formatter::default())
    }

    pub fn with_formatter(
        level: LogLevel,
        message: impl Into<String>,
        context: LogContext,
        formatter: &Formatter,
    ) -> Self {
        let message = message.into();
        let formatted = formatter.format_text(&message, level, Some(&context));
        Self {
            level,
            message,
            context,
            formatted,
        }
    }
}

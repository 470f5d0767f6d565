//! Rendering of log entries
//!
//! Two representations are produced from the same `(message, level, context)`:
//! - Text: `[<timestamp>] [<LEVEL>] <message> {<key: value>, ...}`
//! - Json: `{"level", "message", "timestamp", ...context}`
//!
//! In text lines `level` and `timestamp` appear in the prefix only; every
//! other field goes inside the braces in key order, and the braces are left
//! out when no such field exists. Line breaks and tabs in the message are
//! escaped there so one record is always one line; JSON output keeps the
//! message as logged.

use super::log_context::{FieldValue, LogContext, LEVEL_FIELD, MESSAGE_FIELD, TIMESTAMP_FIELD};
use super::log_level::LogLevel;
use super::timestamp::TimestampFormat;
use chrono::Utc;
use std::borrow::Cow;

/// Output format for log entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    ///
    /// Example: `[2025-01-08T10:30:45.123Z] [INFO] Request processed {user: 7}`
    #[default]
    Text,

    /// JSON format for machine processing
    ///
    /// Example: `{"level":"info","message":"Request processed","timestamp":"2025-01-08T10:30:45.123Z","user":7}`
    Json,
}

/// Formats entries with a configurable timestamp rendering
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    timestamp_format: TimestampFormat,
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }

    /// Render according to `format`; JSON is emitted compact on one line
    pub fn render(
        &self,
        format: &OutputFormat,
        message: &str,
        level: LogLevel,
        context: Option<&LogContext>,
    ) -> String {
        match format {
            OutputFormat::Text => self.format_text(message, level, context),
            OutputFormat::Json => {
                serde_json::to_string(&self.to_json_record(message, level, context))
                    .unwrap_or_default()
            }
        }
    }

    /// Format as a single human-readable line
    pub fn format_text(&self, message: &str, level: LogLevel, context: Option<&LogContext>) -> String {
        let timestamp = context
            .and_then(LogContext::timestamp)
            .map(|value| value.render(&self.timestamp_format))
            .unwrap_or_else(|| self.timestamp_format.format(&Utc::now()));

        let mut line = format!(
            "[{}] [{}] {}",
            timestamp,
            level.to_str(),
            escape_line_breaks(message)
        );

        let extras: Vec<String> = context
            .into_iter()
            .flat_map(|ctx| ctx.iter())
            .filter(|(key, _)| key.as_str() != LEVEL_FIELD && key.as_str() != TIMESTAMP_FIELD)
            .map(|(key, value)| format!("{}: {}", key, value.render(&self.timestamp_format)))
            .collect();

        if !extras.is_empty() {
            line.push_str(" {");
            line.push_str(&extras.join(", "));
            line.push('}');
        }

        line
    }

    /// Build the structured record `{level, message, timestamp, ...context}`
    ///
    /// Context fields are applied last, so a context `timestamp` replaces the
    /// synthesized one.
    pub fn to_json_record(
        &self,
        message: &str,
        level: LogLevel,
        context: Option<&LogContext>,
    ) -> serde_json::Value {
        let mut record = serde_json::Map::new();

        record.insert(
            LEVEL_FIELD.to_string(),
            serde_json::Value::String(level.as_str().to_string()),
        );
        record.insert(
            MESSAGE_FIELD.to_string(),
            serde_json::Value::String(message.to_string()),
        );
        record.insert(
            TIMESTAMP_FIELD.to_string(),
            FieldValue::Timestamp(Utc::now()).to_json_value(&self.timestamp_format),
        );

        if let Some(context) = context {
            for (key, value) in context.iter() {
                record.insert(key.clone(), value.to_json_value(&self.timestamp_format));
            }
        }

        serde_json::Value::Object(record)
    }
}

/// Escape newlines, carriage returns and tabs to prevent log injection
fn escape_line_breaks(message: &str) -> Cow<'_, str> {
    if message.contains(['\n', '\r', '\t']) {
        Cow::Owned(
            message
                .replace('\n', "\\n")
                .replace('\r', "\\r")
                .replace('\t', "\\t"),
        )
    } else {
        Cow::Borrowed(message)
    }
}

/// Format a message with the default formatter
///
/// A missing context behaves like an empty one.
pub fn format_message(message: &str, level: LogLevel, context: Option<&LogContext>) -> String {
    Formatter::default().format_text(message, level, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_context::CORRELATION_ID_FIELD;
    use chrono::TimeZone;

    fn fixed_context() -> LogContext {
        let ts = Utc
            .with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime");
        LogContext::new().with_field(TIMESTAMP_FIELD, ts)
    }

    #[test]
    fn test_text_format_without_extra_fields() {
        let result = format_message("Test message", LogLevel::Info, Some(&fixed_context()));
        assert_eq!(result, "[2025-01-08T10:30:45.000Z] [INFO] Test message");
    }

    #[test]
    fn test_text_format_with_context() {
        let context = fixed_context()
            .with_field("user_id", 123)
            .with_field("action", "login");

        let result = format_message("User logged in", LogLevel::Warn, Some(&context));
        assert_eq!(
            result,
            "[2025-01-08T10:30:45.000Z] [WARN] User logged in {action: login, user_id: 123}"
        );
    }

    #[test]
    fn test_text_format_never_repeats_level() {
        let context = fixed_context().with_field(LEVEL_FIELD, "shadowed");
        let result = format_message("msg", LogLevel::Error, Some(&context));
        assert_eq!(result, "[2025-01-08T10:30:45.000Z] [ERROR] msg");
    }

    #[test]
    fn test_text_format_synthesizes_timestamp() {
        let result = format_message("no context", LogLevel::Debug, None);
        assert!(result.starts_with('['));
        assert!(result.contains("Z] [DEBUG] no context"));
        assert!(!result.contains('{'));
    }

    #[test]
    fn test_text_format_string_timestamp() {
        let context = LogContext::new()
            .with_field(TIMESTAMP_FIELD, "yesterday")
            .with_field(CORRELATION_ID_FIELD, "abc");
        let result = format_message("m", LogLevel::Info, Some(&context));
        assert_eq!(result, "[yesterday] [INFO] m {correlationId: abc}");
    }

    #[test]
    fn test_json_record() {
        let context = fixed_context()
            .with_field("request_id", "abc-123")
            .with_field("latency_ms", 42);

        let record = Formatter::new().to_json_record("Request completed", LogLevel::Info, Some(&context));

        assert_eq!(record["level"], "info");
        assert_eq!(record["message"], "Request completed");
        assert_eq!(record["timestamp"], "2025-01-08T10:30:45.000Z");
        assert_eq!(record["request_id"], "abc-123");
        assert_eq!(record["latency_ms"], 42);
    }

    #[test]
    fn test_json_render_is_single_line() {
        let rendered = Formatter::new().render(&OutputFormat::Json, "a\nb", LogLevel::Error, None);
        assert_eq!(rendered.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["message"], "a\nb");
        assert!(parsed["timestamp"].is_string());
    }

    #[test]
    fn test_custom_timestamp_format() {
        let formatter = Formatter::new().with_timestamp_format(TimestampFormat::Custom("%Y-%m-%d".into()));
        let result = formatter.format_text("m", LogLevel::Info, Some(&fixed_context()));
        assert_eq!(result, "[2025-01-08] [INFO] m");
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }
}

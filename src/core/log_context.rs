//! Structured logging context for key-value fields
//!
//! This module provides:
//! - `LogContext`: Per-entry structured fields
//! - `generate_base_context` / `enrich_context`: the ambient-then-caller merge
//! - `LoggerContext`: Persistent fields shared by every entry of a logger

use super::timestamp::{iso8601, TimestampFormat};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Reserved key holding the entry timestamp
pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Reserved key holding the request correlation id
pub const CORRELATION_ID_FIELD: &str = "correlationId";
/// Key of the level in structured records
pub const LEVEL_FIELD: &str = "level";
/// Key of the message in structured records
pub const MESSAGE_FIELD: &str = "message";

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Timestamp(ts) => write!(f, "{}", iso8601(ts)),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl FieldValue {
    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self, timestamp_format: &TimestampFormat) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Timestamp(ts) => timestamp_format.to_json_value(ts),
            FieldValue::Null => serde_json::Value::Null,
        }
    }

    /// Render with an explicit timestamp format; other variants use `Display`
    #[must_use]
    pub fn render(&self, timestamp_format: &TimestampFormat) -> String {
        match self {
            FieldValue::Timestamp(ts) => timestamp_format.format(ts),
            other => other.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        FieldValue::String(s.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u16> for FieldValue {
    fn from(i: u16) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u64> for FieldValue {
    fn from(i: u64) -> Self {
        match i64::try_from(i) {
            Ok(v) => FieldValue::Int(v),
            Err(_) => FieldValue::Float(i as f64),
        }
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        FieldValue::from(i as u64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

/// Context for structured logging with key-value fields
///
/// Keys are kept sorted so every rendering of the same context is identical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogContext {
    fields: BTreeMap<String, FieldValue>,
}

impl LogContext {
    /// Create a new empty log context
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Add a field to the context
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add a field to the context (mutable version)
    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    /// Get all fields
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Check if context has any fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn timestamp(&self) -> Option<&FieldValue> {
        self.fields.get(TIMESTAMP_FIELD)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.fields.get(CORRELATION_ID_FIELD).and_then(FieldValue::as_str)
    }

    /// Apply every field of `other` on top of this context
    pub fn merge(&mut self, other: &LogContext) {
        for (key, value) in &other.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Format fields as `key: value` pairs joined by `", "`
    pub fn format_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for LogContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Build the ambient context every entry starts from
///
/// Always holds `timestamp` (now); holds `correlationId` when one is given.
pub fn generate_base_context(correlation_id: Option<&str>) -> LogContext {
    let mut context = LogContext::new().with_field(TIMESTAMP_FIELD, Utc::now());
    if let Some(id) = correlation_id {
        context.add_field(CORRELATION_ID_FIELD, id);
    }
    context
}

/// Return `base` with every field of `extra` applied on top
pub fn enrich_context(base: &LogContext, extra: &LogContext) -> LogContext {
    let mut merged = base.clone();
    merged.merge(extra);
    merged
}

/// Logger-level persistent context for structured logging
///
/// `LoggerContext` stores fields that persist across all log entries, such as
/// service name or environment. They sit between the ambient base context
/// and the caller's context, so callers can still override them per entry.
///
/// # Example
///
/// ```
/// use fanout_logger::core::LoggerContext;
///
/// let ctx = LoggerContext::new();
/// ctx.set("service", "api-gateway");
/// ctx.set("version", "1.2.3");
///
/// assert_eq!(ctx.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggerContext {
    fields: Arc<RwLock<BTreeMap<String, FieldValue>>>,
}

impl LoggerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field in the context, overwriting any previous value
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.fields.write().remove(key);
    }

    pub fn clear(&self) {
        self.fields.write().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    /// Snapshot the current fields as a `LogContext`
    pub fn to_log_context(&self) -> LogContext {
        LogContext {
            fields: self.fields.read().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_creation() {
        let ctx = LogContext::new();
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_log_context_with_fields() {
        let ctx = LogContext::new()
            .with_field("user_id", 123)
            .with_field("username", "john_doe")
            .with_field("active", true);

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.get("user_id"), Some(&FieldValue::Int(123)));
    }

    #[test]
    fn test_log_context_format_is_sorted() {
        let ctx = LogContext::new()
            .with_field("zeta", "last")
            .with_field("alpha", 42);

        assert_eq!(ctx.format_fields(), "alpha: 42, zeta: last");
    }

    #[test]
    fn test_base_context_has_timestamp() {
        let ctx = generate_base_context(None);
        assert!(matches!(ctx.timestamp(), Some(FieldValue::Timestamp(_))));
        assert!(ctx.correlation_id().is_none());
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_base_context_with_correlation_id() {
        let ctx = generate_base_context(Some("req-42"));
        assert_eq!(ctx.correlation_id(), Some("req-42"));
    }

    #[test]
    fn test_enrich_extra_wins() {
        let base = LogContext::new()
            .with_field("key", "base_value")
            .with_field("kept", 1);
        let extra = LogContext::new().with_field("key", "extra_value");

        let merged = enrich_context(&base, &extra);

        assert_eq!(merged.get("key"), Some(&FieldValue::from("extra_value")));
        assert_eq!(merged.get("kept"), Some(&FieldValue::Int(1)));
        // inputs untouched
        assert_eq!(base.get("key"), Some(&FieldValue::from("base_value")));
    }

    #[test]
    fn test_enrich_can_override_timestamp() {
        let base = generate_base_context(None);
        let extra = LogContext::new().with_field(TIMESTAMP_FIELD, "2024-01-01T00:00:00.000Z");

        let merged = enrich_context(&base, &extra);
        assert_eq!(
            merged.timestamp(),
            Some(&FieldValue::from("2024-01-01T00:00:00.000Z"))
        );
    }

    #[test]
    fn test_logger_context_snapshot() {
        let ctx = LoggerContext::new();
        ctx.set("service", "api");
        ctx.set("version", "1.0");
        ctx.remove("version");

        let snapshot = ctx.to_log_context();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("service"));

        ctx.clear();
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_field_value_from_unsigned() {
        assert_eq!(FieldValue::from(7u64), FieldValue::Int(7));
        assert!(matches!(FieldValue::from(u64::MAX), FieldValue::Float(_)));
    }
}

//! Search-index sink
//!
//! Indexes `{message, level, ...context, timestamp}` documents into a fixed
//! index through an `IndexClient`. Documents are handed to the client from a
//! background worker; client errors are reported and the document dropped.

use crate::core::{
    timestamp::iso8601, BackgroundWorker, Diagnostics, ErrorHandler, LogEntry, LoggerError,
    OverflowPolicy, Result, Sink, TimestampFormat, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
use chrono::Utc;
use std::sync::Arc;

/// Index used when none is configured
pub const DEFAULT_INDEX: &str = "log-index";

/// Client able to store one document in a named index
pub trait IndexClient: Send + Sync {
    fn index(&self, index: &str, document: &serde_json::Value) -> Result<()>;
}

impl<C: IndexClient + ?Sized> IndexClient for Arc<C> {
    fn index(&self, index: &str, document: &serde_json::Value) -> Result<()> {
        (**self).index(index, document)
    }
}

#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    pub index: String,
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_INDEX.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl SearchIndexConfig {
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }
}

/// Build the indexed document for an entry
///
/// The `timestamp` is the indexing time and overrides any context field of
/// the same name.
pub fn index_document(entry: &LogEntry) -> serde_json::Value {
    let mut document = serde_json::Map::new();
    document.insert("message".to_string(), entry.message.clone().into());
    document.insert("level".to_string(), entry.level.as_str().into());

    let format = TimestampFormat::default();
    for (key, value) in entry.context.iter() {
        document.insert(key.clone(), value.to_json_value(&format));
    }
    document.insert("timestamp".to_string(), iso8601(&Utc::now()).into());

    serde_json::Value::Object(document)
}

pub struct SearchIndexSink {
    index: String,
    worker: BackgroundWorker<serde_json::Value>,
    diagnostics: Diagnostics,
}

impl SearchIndexSink {
    pub fn new<C: IndexClient + 'static>(client: C) -> Result<Self> {
        Self::with_config(client, SearchIndexConfig::default())
    }

    pub fn with_config<C: IndexClient + 'static>(client: C, config: SearchIndexConfig) -> Result<Self> {
        Self::with_diagnostics(client, config, Diagnostics::default())
    }

    /// Report failures to `handler` instead of stderr
    pub fn with_error_handler<C: IndexClient + 'static>(
        client: C,
        config: SearchIndexConfig,
        handler: ErrorHandler,
    ) -> Result<Self> {
        Self::with_diagnostics(client, config, Diagnostics::with_handler(handler))
    }

    fn with_diagnostics<C: IndexClient + 'static>(
        client: C,
        config: SearchIndexConfig,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        if config.index.is_empty() {
            return Err(LoggerError::config("search index sink", "index must not be empty"));
        }

        let index = config.index.clone();
        let worker_diagnostics = diagnostics.clone();
        let worker = BackgroundWorker::spawn(
            "search-index-sink",
            config.queue_capacity,
            config.overflow_policy,
            diagnostics.clone(),
            move |document: serde_json::Value| {
                if let Err(e) = client.index(&index, &document) {
                    worker_diagnostics.report("search-index", &e);
                }
            },
        )?;

        Ok(Self {
            index: config.index,
            worker,
            diagnostics,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

impl Sink for SearchIndexSink {
    fn log(&self, entry: &LogEntry) {
        match self.worker.submit(index_document(entry)) {
            Ok(()) | Err(LoggerError::QueueFull { .. }) => {}
            Err(e) => self.diagnostics.report(self.name(), &e),
        }
    }

    fn flush(&self) -> Result<()> {
        self.worker.flush(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    fn dispose(&self) -> Result<()> {
        if self.worker.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
            Ok(())
        } else {
            Err(LoggerError::worker_stopped(self.worker.name()))
        }
    }

    fn name(&self) -> &str {
        "search-index"
    }
}

/// Index client for Elasticsearch-compatible HTTP APIs
///
/// Posts each document to `<base_url>/<index>/_doc`.
#[cfg(feature = "network")]
pub struct HttpIndexClient {
    base_url: String,
    client: parking_lot::Mutex<Option<reqwest::blocking::Client>>,
}

#[cfg(feature = "network")]
impl HttpIndexClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: parking_lot::Mutex::new(None),
        }
    }

    pub fn document_url(&self, index: &str) -> String {
        format!("{}/{}/_doc", self.base_url, index)
    }
}

#[cfg(feature = "network")]
impl IndexClient for HttpIndexClient {
    fn index(&self, index: &str, document: &serde_json::Value) -> Result<()> {
        let url = self.document_url(index);

        // Built on first use, on the thread that sends
        let mut guard = self.client.lock();
        if guard.is_none() {
            let built = reqwest::blocking::Client::builder()
                .build()
                .map_err(|e| LoggerError::transport(&url, format!("building client: {}", e)))?;
            *guard = Some(built);
        }
        let Some(client) = guard.as_ref() else {
            return Ok(());
        };

        let response = client
            .post(&url)
            .json(document)
            .send()
            .map_err(|e| LoggerError::transport(&url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoggerError::remote_status(&url, status.to_string()));
        }
        Ok(())
    }
}

//! HTTP sink for remote logging
//!
//! Posts `{"message", "level"}` to a configured endpoint. Requests are sent
//! from a background worker, so `log` never waits on the network.
//! Non-success responses and transport failures are reported on the
//! diagnostic channel and the record is dropped.

use crate::core::{
    BackgroundWorker, Diagnostics, ErrorHandler, LogEntry, LoggerError, OverflowPolicy, Result,
    Sink, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
};
use reqwest::blocking::Client;
use reqwest::Method;
use std::time::Duration;

/// Configuration for `HttpSink`
///
/// No request timeout is set unless one is configured; reqwest's client
/// default then applies.
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    pub endpoint: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl HttpSinkConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: Method::POST,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            timeout: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a request header; existing headers are kept
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
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

    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.endpoint).map_err(|e| {
            LoggerError::config("http sink", format!("invalid endpoint '{}': {}", self.endpoint, e))
        })?;
        Ok(())
    }
}

/// HTTP sink that posts each record from its own worker thread
///
/// # Example
///
/// ```no_run
/// use fanout_logger::prelude::*;
///
/// let mut logger = Logger::new();
/// logger.add_transport(HttpSink::new("http://localhost:9000/logs")?);
/// logger.error("payment failed");
/// # Ok::<(), fanout_logger::LoggerError>(())
/// ```
pub struct HttpSink {
    endpoint: String,
    worker: BackgroundWorker<serde_json::Value>,
    diagnostics: Diagnostics,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::from_config(HttpSinkConfig::new(endpoint))
    }

    pub fn from_config(config: HttpSinkConfig) -> Result<Self> {
        Self::with_diagnostics(config, Diagnostics::default())
    }

    /// Report failures to `handler` instead of stderr
    pub fn with_error_handler(config: HttpSinkConfig, handler: ErrorHandler) -> Result<Self> {
        Self::with_diagnostics(config, Diagnostics::with_handler(handler))
    }

    fn with_diagnostics(config: HttpSinkConfig, diagnostics: Diagnostics) -> Result<Self> {
        config.validate()?;

        let endpoint = config.endpoint.clone();
        let queue_capacity = config.queue_capacity;
        let overflow_policy = config.overflow_policy.clone();
        let worker_diagnostics = diagnostics.clone();
        // The blocking client is created on the worker thread and lives there
        let mut client: Option<Client> = None;

        let worker = BackgroundWorker::spawn(
            "http-sink",
            queue_capacity,
            overflow_policy,
            diagnostics.clone(),
            move |payload: serde_json::Value| {
                if client.is_none() {
                    match build_client(&config) {
                        Ok(built) => client = Some(built),
                        Err(e) => {
                            worker_diagnostics.report("http", &e);
                            return;
                        }
                    }
                }
                if let Some(ref http) = client {
                    if let Err(e) = post(http, &config, &payload) {
                        worker_diagnostics.report("http", &e);
                    }
                }
            },
        )?;

        Ok(Self {
            endpoint,
            worker,
            diagnostics,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Records waiting to be posted
    pub fn pending(&self) -> usize {
        self.worker.pending()
    }
}

fn build_client(config: &HttpSinkConfig) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| LoggerError::transport(&config.endpoint, format!("building client: {}", e)))
}

fn post(client: &Client, config: &HttpSinkConfig, payload: &serde_json::Value) -> Result<()> {
    let mut request = client
        .request(config.method.clone(), &config.endpoint)
        .body(serde_json::to_vec(payload)?);
    for (name, value) in &config.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request
        .send()
        .map_err(|e| LoggerError::transport(&config.endpoint, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoggerError::remote_status(&config.endpoint, status.to_string()));
    }
    Ok(())
}

impl Sink for HttpSink {
    fn log(&self, entry: &LogEntry) {
        let payload = serde_json::json!({
            "message": entry.message,
            "level": entry.level.as_str(),
        });

        match self.worker.submit(payload) {
            // Overflow is reported by the worker according to its policy
            Ok(()) | Err(LoggerError::QueueFull { .. }) => {}
            Err(e) => self.diagnostics.report(self.name(), &e),
        }
    }

    /// Wait until every queued record has been posted
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
        "http"
    }
}

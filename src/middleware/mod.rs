//! Request tracing for tower services
//!
//! `RequestTracingLayer` gives every inbound request a correlation id, logs
//! its arrival and completion through a shared `Logger`, and makes a
//! `RequestLogger` available to handlers through the request extensions.

mod layer;
mod request_logger;
mod service;

pub use layer::RequestTracingLayer;
pub use request_logger::RequestLogger;
pub use service::RequestTracingService;

use http::HeaderName;

/// Header read for an inbound correlation id unless configured otherwise
pub const DEFAULT_CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Header carrying the inbound correlation id
    pub header_name: HeaderName,
    /// Copy the correlation id onto successful responses
    pub echo_header: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            header_name: HeaderName::from_static(DEFAULT_CORRELATION_HEADER),
            echo_header: false,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn with_header_name(mut self, name: HeaderName) -> Self {
        self.header_name = name;
        self
    }

    #[must_use]
    pub fn with_echo_header(mut self, echo: bool) -> Self {
        self.echo_header = echo;
        self
    }
}

//! Request tracing Tower layer

use super::{RequestTracingService, TracingConfig};
use crate::core::Logger;
use std::sync::Arc;
use tower::Layer;

/// Tower layer wrapping services with request tracing
///
/// # Example
///
/// ```
/// use fanout_logger::middleware::RequestTracingLayer;
/// use fanout_logger::Logger;
/// use std::sync::Arc;
///
/// let layer = RequestTracingLayer::new(Arc::new(Logger::new()));
/// ```
#[derive(Clone)]
pub struct RequestTracingLayer {
    logger: Arc<Logger>,
    config: Arc<TracingConfig>,
}

impl RequestTracingLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self::with_config(logger, TracingConfig::default())
    }

    pub fn with_config(logger: Arc<Logger>, config: TracingConfig) -> Self {
        Self {
            logger,
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for RequestTracingLayer {
    type Service = RequestTracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTracingService::new(inner, Arc::clone(&self.logger), Arc::clone(&self.config))
    }
}

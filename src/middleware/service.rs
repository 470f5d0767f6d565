//! Request tracing Tower service

use super::{RequestLogger, TracingConfig};
use crate::core::Logger;
use http::{HeaderValue, Method, Request, Response};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;
use uuid::Uuid;

/// Service produced by `RequestTracingLayer`
#[derive(Clone)]
pub struct RequestTracingService<S> {
    inner: S,
    logger: Arc<Logger>,
    config: Arc<TracingConfig>,
}

impl<S> RequestTracingService<S> {
    pub(crate) fn new(inner: S, logger: Arc<Logger>, config: Arc<TracingConfig>) -> Self {
        Self {
            inner,
            logger,
            config,
        }
    }

    fn correlation_id<B>(&self, request: &Request<B>) -> String {
        request
            .headers()
            .get(&self.config.header_name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

/// Tracks one request; warns if dropped before the inner service answered
struct InFlight {
    log: RequestLogger,
    method: Method,
    path: String,
    start: Instant,
    finished: bool,
}

impl InFlight {
    fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            self.log.warn(format!(
                "Request terminated prematurely: {} {} [{}ms]",
                self.method,
                self.path,
                self.elapsed_ms()
            ));
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestTracingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let correlation_id = self.correlation_id(&request);
        let log = RequestLogger::new(Arc::clone(&self.logger), correlation_id);

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        log.info(format!("Incoming request: {} {}", method, path));
        request.extensions_mut().insert(log.clone());

        let echo_header = self
            .config
            .echo_header
            .then(|| self.config.header_name.clone());

        // Use the instance that was driven to readiness
        let ready = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, ready);

        let mut in_flight = InFlight {
            log,
            method,
            path,
            start: Instant::now(),
            finished: false,
        };

        Box::pin(async move {
            let result = inner.call(request).await;
            in_flight.finished = true;

            match result {
                Ok(mut response) => {
                    in_flight.log.info(format!(
                        "Request processed: {} {} - {} [{}ms]",
                        in_flight.method,
                        in_flight.path,
                        response.status().as_u16(),
                        in_flight.elapsed_ms()
                    ));
                    if let Some(header) = echo_header {
                        if let Ok(value) = HeaderValue::from_str(in_flight.log.correlation_id()) {
                            response.headers_mut().insert(header, value);
                        }
                    }
                    Ok(response)
                }
                Err(e) => {
                    in_flight.log.error(format!(
                        "Request processing error: {} {} - Error: {}",
                        in_flight.method, in_flight.path, e
                    ));
                    Err(e)
                }
            }
        })
    }
}

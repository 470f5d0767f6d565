//! Diagnostic channel for failures inside the logging pipeline
//!
//! Sink and dispatcher failures are never routed back through the logger;
//! they go to an `ErrorHandler`, which writes to stderr unless replaced.

use super::error::LoggerError;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Callback receiving the failing component's name and the error
pub type ErrorHandler = Arc<dyn Fn(&str, &LoggerError) + Send + Sync>;

/// Reporting endpoint shared by the logger, workers and sinks
#[derive(Clone)]
pub struct Diagnostics {
    handler: ErrorHandler,
}

impl Diagnostics {
    /// Report to stderr with the `[LOGGER ERROR]` prefix
    pub fn stderr() -> Self {
        Self {
            handler: Arc::new(|source, err| match err {
                LoggerError::SinkPanicked(_) => {
                    eprintln!(
                        "[LOGGER CRITICAL] {}: {}. Other sinks continue to function.",
                        source, err
                    )
                }
                _ => eprintln!("[LOGGER ERROR] {}: {}", source, err),
            }),
        }
    }

    pub fn with_handler(handler: ErrorHandler) -> Self {
        Self { handler }
    }

    pub fn report(&self, source: &str, err: &LoggerError) {
        (self.handler)(source, err);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

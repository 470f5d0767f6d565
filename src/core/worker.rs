//! Background worker thread fed by a bounded queue
//!
//! Used wherever a record must be handed off without waiting for its I/O:
//! the logger's async mode gives every sink its own worker, and the network
//! sinks post from one.

use super::diagnostics::{panic_message, Diagnostics};
use super::error::{LoggerError, Result};
use super::metrics::LoggerMetrics;
use super::overflow_policy::{OverflowCallback, OverflowPolicy};
use crossbeam_channel::{bounded, SendTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default shutdown timeout for draining a worker (5 seconds)
///
/// Used when a worker or logger is dropped without an explicit shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default queue size for sinks that post from a worker
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

enum Message<T> {
    Record(T),
    Flush(Sender<()>),
}

/// A named thread draining a bounded queue through a handler
pub struct BackgroundWorker<T: Send + 'static> {
    name: String,
    capacity: usize,
    sender: RwLock<Option<Sender<Message<T>>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    metrics: Arc<LoggerMetrics>,
    diagnostics: Diagnostics,
}

impl<T: Send + 'static> BackgroundWorker<T> {
    /// Start the worker thread
    ///
    /// Panics inside `handler` are caught per record and reported; the
    /// worker keeps draining.
    pub fn spawn<F>(
        name: impl Into<String>,
        capacity: usize,
        policy: OverflowPolicy,
        diagnostics: Diagnostics,
        mut handler: F,
    ) -> Result<Self>
    where
        F: FnMut(T) + Send + 'static,
    {
        let name = name.into();
        if capacity == 0 {
            return Err(LoggerError::config(&name, "queue capacity must be at least 1"));
        }

        let (sender, receiver) = bounded::<Message<T>>(capacity);
        let thread_name = name.clone();
        let thread_diagnostics = diagnostics.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                // Ends once every sender is gone and the queue is drained
                for message in receiver.iter() {
                    match message {
                        Message::Record(item) => {
                            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
                                || handler(item),
                            ));
                            if let Err(payload) = result {
                                thread_diagnostics.report(
                                    &thread_name,
                                    &LoggerError::SinkPanicked(panic_message(payload.as_ref())),
                                );
                            }
                        }
                        Message::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            })
            .map_err(|e| LoggerError::io_operation("spawning worker thread", name.clone(), e))?;

        Ok(Self {
            name,
            capacity,
            sender: RwLock::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            policy,
            on_overflow: None,
            metrics: Arc::new(LoggerMetrics::new()),
            diagnostics,
        })
    }

    /// Share an existing metrics instance instead of a private one
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<LoggerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn with_overflow_callback(mut self, callback: Option<OverflowCallback>) -> Self {
        self.on_overflow = callback;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records waiting in the queue
    pub fn pending(&self) -> usize {
        self.sender.read().as_ref().map_or(0, Sender::len)
    }

    pub fn is_running(&self) -> bool {
        self.sender.read().is_some()
    }

    /// Queue a record without waiting for it to be handled
    pub fn submit(&self, item: T) -> Result<()> {
        let guard = self.sender.read();
        let sender = match guard.as_ref() {
            Some(sender) => sender,
            None => {
                self.metrics.record_dropped();
                return Err(LoggerError::worker_stopped(&self.name));
            }
        };

        match sender.try_send(Message::Record(item)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => self.handle_overflow(sender, message),
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped();
                Err(LoggerError::worker_stopped(&self.name))
            }
        }
    }

    fn handle_overflow(&self, sender: &Sender<Message<T>>, message: Message<T>) -> Result<()> {
        self.metrics.record_queue_full();

        match &self.policy {
            OverflowPolicy::DropNewest => {
                self.metrics.record_dropped();
                Err(LoggerError::queue_full(sender.len(), self.capacity))
            }
            OverflowPolicy::Block => {
                self.metrics.record_block();
                sender
                    .send(message)
                    .map_err(|_| LoggerError::worker_stopped(&self.name))
            }
            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(message, *timeout) {
                    Ok(()) => Ok(()),
                    Err(SendTimeoutError::Timeout(_)) => self.alert_and_drop(sender.len()),
                    Err(SendTimeoutError::Disconnected(_)) => {
                        Err(LoggerError::worker_stopped(&self.name))
                    }
                }
            }
            OverflowPolicy::AlertAndDrop => self.alert_and_drop(sender.len()),
        }
    }

    fn alert_and_drop(&self, queued: usize) -> Result<()> {
        let previously_dropped = self.metrics.record_dropped();
        let err = LoggerError::queue_full(queued, self.capacity);

        // Alert on the first drop and every thousandth after it
        let dropped = previously_dropped + 1;
        if previously_dropped == 0 || dropped % 1000 == 0 {
            self.diagnostics.report(&self.name, &err);
            if let Some(ref callback) = self.on_overflow {
                callback(dropped);
            }
        }

        Err(err)
    }

    /// Wait until every record queued before this call has been handled
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        {
            let guard = self.sender.read();
            let Some(sender) = guard.as_ref() else {
                return Ok(());
            };
            sender
                .send_timeout(Message::Flush(ack_tx), timeout)
                .map_err(|_| {
                    LoggerError::other(format!("{}: flush request timed out", self.name))
                })?;
        }

        ack_rx.recv_timeout(timeout).map_err(|_| {
            LoggerError::other(format!("{}: queue not drained within {:?}", self.name, timeout))
        })
    }

    /// Close the queue and wait for the thread to drain it
    ///
    /// Returns `true` if the thread finished within `timeout`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        drop(self.sender.write().take());

        let Some(handle) = self.handle.lock().take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    self.diagnostics.report(
                        &self.name,
                        &LoggerError::SinkPanicked(panic_message(e.as_ref())),
                    );
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                self.diagnostics.report(
                    &self.name,
                    &LoggerError::other(format!(
                        "worker did not finish within {:?}; queued records may be lost",
                        timeout
                    )),
                );
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl<T: Send + 'static> Drop for BackgroundWorker<T> {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quiet() -> Diagnostics {
        Diagnostics::with_handler(Arc::new(|_, _| {}))
    }

    #[test]
    fn test_worker_handles_records_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let worker = BackgroundWorker::spawn("test-worker", 16, OverflowPolicy::Block, quiet(), move |n: u32| {
            seen_clone.lock().push(n);
        })
        .unwrap();

        for n in 0..10 {
            worker.submit(n).unwrap();
        }
        worker.flush(Duration::from_secs(2)).unwrap();

        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_worker_survives_handler_panic() {
        let handled = Arc::new(AtomicUsize::new(0));
        let handled_clone = Arc::clone(&handled);
        let reports = Arc::new(AtomicUsize::new(0));
        let reports_clone = Arc::clone(&reports);
        let diagnostics = Diagnostics::with_handler(Arc::new(move |_, _| {
            reports_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let worker = BackgroundWorker::spawn("panicky", 4, OverflowPolicy::Block, diagnostics, move |n: u32| {
            if n == 1 {
                panic!("bad record");
            }
            handled_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for n in 0..3 {
            worker.submit(n).unwrap();
        }
        worker.flush(Duration::from_secs(2)).unwrap();

        assert_eq!(handled.load(Ordering::SeqCst), 2);
        assert_eq!(reports.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_newest_when_full() {
        let (release_tx, release_rx) = bounded::<()>(0);
        let worker = BackgroundWorker::spawn("slow", 1, OverflowPolicy::DropNewest, quiet(), move |_: u32| {
            let _ = release_rx.recv();
        })
        .unwrap();
        let metrics = Arc::new(LoggerMetrics::new());
        let worker = worker.with_metrics(Arc::clone(&metrics));

        // First record occupies the handler, second fills the queue
        worker.submit(0).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        worker.submit(1).unwrap();
        assert!(matches!(worker.submit(2), Err(LoggerError::QueueFull { .. })));
        assert_eq!(metrics.dropped_count(), 1);

        drop(release_tx);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let worker = BackgroundWorker::spawn("closed", 4, OverflowPolicy::Block, quiet(), |_: u32| {}).unwrap();
        assert!(worker.shutdown(Duration::from_secs(1)));
        assert!(!worker.is_running());
        assert!(matches!(worker.submit(1), Err(LoggerError::WorkerStopped { .. })));
        assert!(worker.flush(Duration::from_millis(10)).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = BackgroundWorker::spawn("zero", 0, OverflowPolicy::Block, quiet(), |_: u32| {});
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }
}

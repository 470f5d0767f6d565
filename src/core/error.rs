//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Worker queue full with buffer details
    #[error("Sink queue full: {current}/{max} records buffered")]
    QueueFull { current: usize, max: usize },

    /// Worker already stopped
    #[error("Sink worker '{worker}' already stopped")]
    WorkerStopped { worker: String },

    /// Record offered to a sink after `dispose()`
    #[error("Sink '{sink}' is disposed; record rejected")]
    SinkDisposed { sink: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSinkError { path: String, message: String },

    /// Structured file no longer holds a well-formed array
    #[error("Corrupt JSON array in '{path}': {message}")]
    CorruptDocument { path: String, message: String },

    /// Remote endpoint answered with a non-success status
    #[error("Remote endpoint {endpoint} responded with {status}")]
    RemoteStatus { endpoint: String, status: String },

    /// Transport-level failure talking to a remote endpoint
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// Sink panicked while handling a record
    #[error("Sink panicked: {0}")]
    SinkPanicked(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a queue full error with buffer details
    pub fn queue_full(current: usize, max: usize) -> Self {
        LoggerError::QueueFull { current, max }
    }

    pub fn worker_stopped(worker: impl Into<String>) -> Self {
        LoggerError::WorkerStopped {
            worker: worker.into(),
        }
    }

    pub fn sink_disposed(sink: impl Into<String>) -> Self {
        LoggerError::SinkDisposed { sink: sink.into() }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSinkError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn corrupt_document(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::CorruptDocument {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn remote_status(endpoint: impl Into<String>, status: impl Into<String>) -> Self {
        LoggerError::RemoteStatus {
            endpoint: endpoint.into(),
            status: status.into(),
        }
    }

    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

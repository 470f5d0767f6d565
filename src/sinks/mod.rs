//! Sink implementations

pub mod console;
pub mod file;
pub mod json_array;
pub mod search_index;

#[cfg(feature = "network")]
pub mod http;

pub use console::ConsoleSink;
pub use file::{
    BufferedFileSink, FileFormat, FileSinkConfig, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BUFFER_SIZE,
};
pub use json_array::JsonArrayFileSink;
pub use search_index::{IndexClient, SearchIndexConfig, SearchIndexSink, DEFAULT_INDEX};

#[cfg(feature = "network")]
pub use http::{HttpSink, HttpSinkConfig};
#[cfg(feature = "network")]
pub use search_index::HttpIndexClient;

pub use crate::core::Sink;

//! File logging example
//!
//! Demonstrates logging to the console, a buffered text file and a JSON
//! array file at the same time.
//!
//! Run with: cargo run --example file_logging

use fanout_logger::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Fanout Logger - File Logging Example ===\n");

    let text_file = Arc::new(BufferedFileSink::from_config(
        FileSinkConfig::new("logs/application.log")
            .with_max_buffer_size(4 * 1024)
            .with_flush_interval(Duration::from_secs(1)),
    )?);
    let json_file = Arc::new(JsonArrayFileSink::new("logs/application.json")?);

    let mut logger = Logger::new();
    logger.add_transport(ConsoleSink::new());
    logger.add_transport(Arc::clone(&text_file));
    logger.add_transport(Arc::clone(&json_file));

    println!("1. Logging to console and files:");
    logger.info("Application started");
    logger.debug("Loading configuration...");
    logger.warn("Using default settings for some options");
    logger.error("Failed to load optional plugin");

    println!("\n2. Performing some operations:");
    for i in 1..=5 {
        logger.info_with_context(
            format!("Processing item {}/5", i),
            LogContext::new().with_field("item", i),
        );
    }

    println!(
        "\n   {} bytes still buffered for {}",
        text_file.buffered_bytes(),
        text_file.path().display()
    );

    // Stops the flush timer and writes what is still buffered
    logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

    println!("\n=== Example completed successfully! ===");
    println!(
        "Check '{}' and '{}' for the log output",
        text_file.path().display(),
        json_file.path().display()
    );

    Ok(())
}

//! Basic logger usage example
//!
//! Demonstrates synchronous logging to the console with context fields and
//! a minimum level.
//!
//! Run with: cargo run --example basic_usage

use fanout_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== Fanout Logger - Basic Usage Example ===\n");

    // Every entry carries these fields
    let mut logger = Logger::builder()
        .field("service", "inventory")
        .field("version", "1.4.0")
        .transport(ConsoleSink::new())
        .build();

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");

    println!("\n2. Logging with per-call context:");
    logger.info_with_context(
        "Stock adjusted",
        LogContext::new()
            .with_field("sku", "A-1001")
            .with_field("delta", -3),
    );

    println!("\n3. Logging with a minimum level:");
    logger.set_min_level(LogLevel::Warn);
    println!("   Minimum level set to WARN - debug and info won't show:");
    logger.debug("Debug message (hidden)");
    logger.info("Info message (hidden)");
    logger.warn("Warning message (visible)");

    logger.flush()?;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}

//! Console sink implementation

use crate::core::{Formatter, LogEntry, OutputFormat, Result, Sink, TimestampFormat};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::Write;

/// Prints each entry's text line; warnings and errors go to stderr
pub struct ConsoleSink {
    use_colors: bool,
    output_format: OutputFormat,
    formatter: Formatter,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            use_colors: cfg!(feature = "console"),
            output_format: OutputFormat::default(),
            formatter: Formatter::default(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }

    /// Set the output format for this sink
    ///
    /// # Example
    ///
    /// ```
    /// use fanout_logger::sinks::ConsoleSink;
    /// use fanout_logger::OutputFormat;
    ///
    /// let sink = ConsoleSink::new()
    ///     .with_output_format(OutputFormat::Json);
    /// ```
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Timestamp rendering used by the JSON output
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.formatter = Formatter::new().with_timestamp_format(format);
        self
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.output_format {
            OutputFormat::Text if self.use_colors => Self::colorize(entry),
            OutputFormat::Text => entry.formatted.clone(),
            OutputFormat::Json => self.formatter.render(
                &OutputFormat::Json,
                &entry.message,
                entry.level,
                Some(&entry.context),
            ),
        }
    }

    /// Color only the `[LEVEL]` token of the shared line
    #[cfg(feature = "console")]
    fn colorize(entry: &LogEntry) -> String {
        let token = format!("[{}]", entry.level.to_str());
        let colored = format!("[{}]", entry.level.to_str().color(entry.level.color_code()));
        entry.formatted.replacen(&token, &colored, 1)
    }

    #[cfg(not(feature = "console"))]
    fn colorize(entry: &LogEntry) -> String {
        entry.formatted.clone()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn log(&self, entry: &LogEntry) {
        let output = self.render(entry);

        // Route Warn and Error to stderr, others to stdout
        if entry.level.is_diagnostic() {
            eprintln!("{}", output);
        } else {
            println!("{}", output);
        }
    }

    fn flush(&self) -> Result<()> {
        // Flush both stdout and stderr since we write to both
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

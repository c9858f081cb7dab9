//! Console sink implementation

use crate::core::{Level, LoggerError, Result, Sink};
use parking_lot::Mutex;
use std::io::{self, Write};

/// Writes encoded records to standard output.
///
/// Each record is written with a single `write_all` while the sink's own
/// lock is held, so concurrent callers never interleave inside a line.
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Console sink over an arbitrary writer (tests, in-memory capture)
    ///
    /// # Example
    ///
    /// ```
    /// use rust_tee_logger::sinks::ConsoleSink;
    /// use rust_tee_logger::{Level, Sink};
    ///
    /// let sink = ConsoleSink::with_writer(std::io::sink());
    /// sink.write(Level::Info, b"hello\n").unwrap();
    /// ```
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn write(&self, _level: Level, bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer
            .write_all(bytes)
            .map_err(|e| LoggerError::io_operation("writing to console", "write failed", e))
    }

    fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        match writer.flush() {
            Ok(()) => Ok(()),
            // A closed stdout is not worth failing a sync over
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            Err(e) => Err(LoggerError::io_operation("flushing console", "flush failed", e)),
        }
    }

    fn name(&self) -> &str {
        "console"
    }
}

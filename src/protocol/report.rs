//! Report sinks.
//!
//! A sink receives the console lines and display commands produced by a
//! tramming run. Sinks are infallible from the procedure's point of view:
//! a sink that cannot deliver logs the problem and moves on.

use bytes::BytesMut;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tracing::warn;

use super::display::DisplayCommand;

/// Destination for tramming output.
pub trait ReportSink {
    /// Emit one line of host-console text.
    fn echo_line(&mut self, line: &str);

    /// Send one command to the touchscreen.
    fn send_display(&mut self, command: &DisplayCommand);
}

/// Everything a [`MemorySink`] has received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportLog {
    /// Console lines in emission order.
    pub lines: Vec<String>,
    /// Display commands in emission order.
    pub display: Vec<DisplayCommand>,
}

/// Sink that keeps everything in memory.
///
/// Clones share the same log, so one handle can be lent to the procedure
/// while another is read from a UI thread.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<ReportLog>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the console lines.
    pub fn lines(&self) -> Vec<String> {
        self.log.lock().lines.clone()
    }

    /// Get a copy of the display commands.
    pub fn display_commands(&self) -> Vec<DisplayCommand> {
        self.log.lock().display.clone()
    }

    /// Get a copy of the whole log.
    pub fn snapshot(&self) -> ReportLog {
        self.log.lock().clone()
    }

    /// Take the log, leaving the sink empty.
    pub fn drain(&self) -> ReportLog {
        std::mem::take(&mut *self.log.lock())
    }
}

impl ReportSink for MemorySink {
    fn echo_line(&mut self, line: &str) {
        self.log.lock().lines.push(line.to_string());
    }

    fn send_display(&mut self, command: &DisplayCommand) {
        self.log.lock().display.push(command.clone());
    }
}

/// Sink writing to a serial stream shared by host and display.
///
/// Console lines are written with a trailing newline; display commands are
/// written as framed protocol bytes into the same stream.
#[derive(Debug)]
pub struct SerialSink<W: Write> {
    writer: W,
    frame: BytesMut,
}

impl<W: Write> SerialSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frame: BytesMut::with_capacity(64),
        }
    }

    /// Get the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for SerialSink<W> {
    fn echo_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.writer, "{}", line) {
            warn!("Failed to write report line: {}", e);
        }
    }

    fn send_display(&mut self, command: &DisplayCommand) {
        self.frame.clear();
        command.encode(&mut self.frame);
        if let Err(e) = self.writer.write_all(&self.frame) {
            warn!("Failed to write display command {}: {}", command, e);
        }
    }
}

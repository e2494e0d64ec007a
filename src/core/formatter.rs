//! Formatter contract and the default text layout

use super::buffer::Buffer2K;
use super::message::Message;
use super::timestamp::TimestampFormat;
use std::fmt::Write;

/// Byte range of a formatted record that a sink may decorate (e.g. color)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorRange {
    pub start: usize,
    pub stop: usize,
}

impl ColorRange {
    pub const fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    pub const fn is_empty(&self) -> bool {
        self.start >= self.stop
    }
}

/// Buffer a record is rendered into; one size class above the payload
pub type RecordBuffer = Buffer2K;

/// Turns a [`Message`] into bytes for a sink
pub trait Formatter: Send {
    /// Write the rendered record into `out` and return the colorable range
    fn format(&self, message: &Message, out: &mut RecordBuffer) -> ColorRange;
}

/// `[timestamp] [LEVEL] [tid] payload (file:line)`
#[derive(Debug, Clone, Default)]
pub struct DefaultFormatter {
    timestamp_format: TimestampFormat,
}

impl DefaultFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        if !format.is_valid() {
            eprintln!(
                "[LOGGER WARNING] Invalid timestamp pattern {:?}; timestamps will render short",
                format
            );
        }
        self.timestamp_format = format;
        self
    }
}

impl Formatter for DefaultFormatter {
    fn format(&self, message: &Message, out: &mut RecordBuffer) -> ColorRange {
        // Writes into a fixed buffer only fail on a bad timestamp pattern;
        // overflow is truncated.
        out.append(b"[");
        let _ = self.timestamp_format.write_to(&message.timestamp, out);
        out.append(b"] [");
        let start = out.readable();
        let _ = write!(out, "{:5}", message.level);
        let stop = out.readable();
        let _ = write!(out, "] [{}] ", message.thread_id);
        out.append(message.buffer.as_bytes());
        let _ = write!(out, " ({})", message.source);
        terminate(out);
        ColorRange::new(start, stop)
    }
}

/// End the record with a newline, overwriting the last byte when full
fn terminate(out: &mut RecordBuffer) {
    if out.writable() == 0 {
        out.truncate(out.readable().saturating_sub(1));
    }
    out.append(b"\n");
}

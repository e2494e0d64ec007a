//! Sink contract for log output destinations

use super::buffer::BufferView;
use super::error::Result;
use super::formatter::{ColorRange, DefaultFormatter, Formatter, RecordBuffer};
use super::log_level::LogLevel;
use super::message::Message;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

pub trait Sink: Send {
    /// Write one formatted record; `color` marks the decoratable sub-range of `buf`
    fn write(
        &mut self,
        level: LogLevel,
        timestamp: DateTime<Utc>,
        buf: BufferView<'_>,
        color: ColorRange,
    ) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

struct SinkState {
    formatter: Box<dyn Formatter>,
    sink: Box<dyn Sink>,
}

/// A sink shared between loggers, with its own level filter and formatter.
///
/// Format and write happen under one mutex, so a sink never sees
/// interleaved records even when it is fed from several loggers.
pub struct SinkHandle {
    level: AtomicU8,
    state: Mutex<SinkState>,
}

impl SinkHandle {
    pub fn new<S: Sink + 'static>(sink: S) -> Arc<Self> {
        Self::with_formatter(sink, DefaultFormatter::new())
    }

    pub fn with_formatter<S, F>(sink: S, formatter: F) -> Arc<Self>
    where
        S: Sink + 'static,
        F: Formatter + 'static,
    {
        Arc::new(Self {
            level: AtomicU8::new(LogLevel::Trace.as_u8()),
            state: Mutex::new(SinkState {
                formatter: Box::new(formatter),
                sink: Box::new(sink),
            }),
        })
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_formatter<F: Formatter + 'static>(&self, formatter: F) {
        self.state.lock().formatter = Box::new(formatter);
    }

    pub fn name(&self) -> String {
        self.state.lock().sink.name().to_string()
    }

    /// Format `message` and hand it to the sink.
    ///
    /// Failures and panics are reported on stderr and never propagate.
    pub fn log(&self, message: &Message) {
        if message.level < self.level() {
            return;
        }

        let mut buf = RecordBuffer::new();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let formatter = &state.formatter;
        let color = match catch_unwind(AssertUnwindSafe(|| formatter.format(message, &mut buf))) {
            Ok(color) => color,
            Err(panic_info) => {
                report(state.sink.name(), "format", Err(panic_info));
                return;
            }
        };
        let sink = &mut state.sink;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            sink.write(message.level, message.timestamp, buf.view(), color)
        }));
        report(sink.name(), "write", outcome);
    }

    pub fn flush(&self) {
        let mut state = self.state.lock();
        let sink = &mut state.sink;
        let outcome = catch_unwind(AssertUnwindSafe(|| sink.flush()));
        report(sink.name(), "flush", outcome);
    }
}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHandle")
            .field("level", &self.level())
            .finish_non_exhaustive()
    }
}

fn report(sink: &str, operation: &str, outcome: std::thread::Result<Result<()>>) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("[LOGGER ERROR] Sink '{}' {} failed: {}", sink, operation, e);
        }
        Err(panic_info) => {
            eprintln!(
                "[LOGGER CRITICAL] Sink '{}' panicked during {}: {}. \
                 Other sinks continue to function.",
                sink,
                operation,
                panic_message(&*panic_info)
            );
        }
    }
}

pub(crate) fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

//! Named, leveled logger front end

use super::buffer::Buffer1K;
use super::log_level::LogLevel;
use super::message::{Message, MessageKind, SourceLocation};
use super::service::ServiceInner;
use super::sink::SinkHandle;
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

/// A named logger owning a list of sinks.
///
/// Synchronous loggers format and write on the calling thread. Asynchronous
/// loggers hand a [`Message`] to their service's writer thread and return
/// immediately.
///
/// Loggers are created through [`Service::create_logger`](super::service::Service::create_logger).
pub struct Logger {
    name: String,
    min_level: AtomicU8,
    sinks: Vec<Arc<SinkHandle>>,
    is_async: bool,
    service: Weak<ServiceInner>,
    this: Weak<Logger>,
}

impl Logger {
    pub(crate) fn new(
        service: Weak<ServiceInner>,
        name: String,
        sinks: Vec<Arc<SinkHandle>>,
        is_async: bool,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name,
            min_level: AtomicU8::new(LogLevel::Trace.as_u8()),
            sinks,
            is_async,
            service,
            this: this.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the minimum level; concurrent callers may still see the old
    /// value for a message or two.
    pub fn set_level(&self, level: LogLevel) {
        self.min_level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn sinks(&self) -> &[Arc<SinkHandle>] {
        &self.sinks
    }

    #[inline]
    pub fn should_log(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    /// Emit a pre-rendered payload.
    ///
    /// Dropped when `level` is below the logger's minimum. For asynchronous
    /// loggers the message is queued; if the owning service is gone, or has
    /// already shut down, it is discarded.
    pub fn log(&self, source_id: u32, level: LogLevel, buffer: Buffer1K, source: SourceLocation) {
        if !self.should_log(level) {
            return;
        }

        let message = Message::log(self.this.clone(), source_id, level, buffer, source);
        if self.is_async {
            if let Some(service) = self.service.upgrade() {
                service.submit(Box::new(message));
            }
        } else {
            self.backend_log(&message);
        }
    }

    /// Flush every sink; queued behind earlier messages for async loggers
    pub fn flush(&self) {
        if self.is_async {
            if let Some(service) = self.service.upgrade() {
                service.submit(Box::new(Message::flush(self.this.clone())));
            }
        } else {
            self.backend_flush();
        }
    }

    /// Render `args` into a message buffer and emit it
    #[track_caller]
    pub fn log_fmt(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        if !self.should_log(level) {
            return;
        }
        let source = SourceLocation::caller();
        let mut buffer = Buffer1K::new();
        let _ = buffer.write_fmt(args);
        self.log(0, level, buffer, source);
    }

    #[track_caller]
    pub fn trace(&self, message: impl AsRef<str>) {
        self.log_str(LogLevel::Trace, message.as_ref());
    }

    #[track_caller]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log_str(LogLevel::Debug, message.as_ref());
    }

    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log_str(LogLevel::Info, message.as_ref());
    }

    #[track_caller]
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log_str(LogLevel::Warn, message.as_ref());
    }

    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log_str(LogLevel::Error, message.as_ref());
    }

    #[track_caller]
    pub fn fatal(&self, message: impl AsRef<str>) {
        self.log_str(LogLevel::Fatal, message.as_ref());
    }

    #[track_caller]
    fn log_str(&self, level: LogLevel, message: &str) {
        if !self.should_log(level) {
            return;
        }
        let source = SourceLocation::caller();
        let mut buffer = Buffer1K::new();
        buffer.append_str(message);
        self.log(0, level, buffer, source);
    }

    /// Writer-side delivery of one message
    pub(crate) fn dispatch(&self, message: &Message) {
        match message.kind {
            MessageKind::Log => self.backend_log(message),
            MessageKind::Flush => self.backend_flush(),
        }
    }

    fn backend_log(&self, message: &Message) {
        for sink in &self.sinks {
            sink.log(message);
        }
    }

    fn backend_flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("sinks", &self.sinks.len())
            .field("is_async", &self.is_async)
            .finish()
    }
}

//! Unit of work for the writer thread

use super::buffer::{Buffer1K, BufferView};
use super::log_level::LogLevel;
use super::logger::Logger;
use super::queue::{Link, Linked};
use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID_CACHE: Cell<u64> = const { Cell::new(0) };
}

/// Stable numeric id of the calling thread, assigned on first use
pub fn current_thread_id() -> u64 {
    THREAD_ID_CACHE.with(|cache| {
        let id = cache.get();
        if id != 0 {
            return id;
        }
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        cache.set(id);
        id
    })
}

/// Where a log call was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Location of the (`#[track_caller]`-propagated) caller
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }

    pub const fn unknown() -> Self {
        Self::new("<unknown>", 0, 0)
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Format the payload and write it to every sink
    Log,
    /// Flush every sink of the target logger
    Flush,
}

/// One queued log record or flush request.
///
/// The logger reference is weak: a logger may be dropped while its messages
/// are still queued, in which case they are discarded at dispatch.
pub struct Message {
    pub kind: MessageKind,
    pub logger: Weak<Logger>,
    pub source_id: u32,
    pub level: LogLevel,
    pub thread_id: u64,
    pub timestamp: DateTime<Utc>,
    pub source: SourceLocation,
    pub buffer: Buffer1K,
    link: Link<Message>,
}

impl Message {
    pub fn log(
        logger: Weak<Logger>,
        source_id: u32,
        level: LogLevel,
        buffer: Buffer1K,
        source: SourceLocation,
    ) -> Self {
        Self {
            kind: MessageKind::Log,
            logger,
            source_id,
            level,
            thread_id: current_thread_id(),
            timestamp: Utc::now(),
            source,
            buffer,
            link: Link::new(),
        }
    }

    pub fn flush(logger: Weak<Logger>) -> Self {
        Self {
            kind: MessageKind::Flush,
            logger,
            source_id: 0,
            level: LogLevel::Trace,
            thread_id: current_thread_id(),
            timestamp: Utc::now(),
            source: SourceLocation::unknown(),
            buffer: Buffer1K::new(),
            link: Link::new(),
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[inline]
    pub fn payload(&self) -> BufferView<'_> {
        self.buffer.view()
    }
}

impl Linked for Message {
    fn link(&self) -> &Link<Self> {
        &self.link
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind)
            .field("source_id", &self.source_id)
            .field("level", &self.level)
            .field("thread_id", &self.thread_id)
            .field("timestamp", &self.timestamp)
            .field("source", &self.source)
            .field("payload", &String::from_utf8_lossy(self.buffer.as_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_id_is_cached_per_thread() {
        let here = current_thread_id();
        assert_eq!(here, current_thread_id());
        let other = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(here, other);
    }

    #[test]
    fn test_caller_location() {
        let location = SourceLocation::caller();
        assert!(location.file.ends_with("message.rs"));
        assert!(location.line > 0);
        assert_eq!(
            location.to_string(),
            format!("{}:{}", location.file, location.line)
        );
    }

    #[test]
    fn test_message_constructors() {
        let mut buffer = Buffer1K::new();
        buffer.append(b"payload");
        let message = Message::log(
            Weak::new(),
            7,
            LogLevel::Warn,
            buffer,
            SourceLocation::new("main.rs", 10, 1),
        );
        assert_eq!(message.kind, MessageKind::Log);
        assert_eq!(message.source_id, 7);
        assert_eq!(message.payload().as_bytes(), b"payload");
        assert!(message.logger.upgrade().is_none());

        let flush = Message::flush(Weak::new());
        assert_eq!(flush.kind, MessageKind::Flush);
        assert!(flush.payload().is_empty());
    }
}

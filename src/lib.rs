//! # tidelog
//!
//! An embeddable, high-throughput logging library.
//!
//! ## Features
//!
//! - **Low producer latency**: asynchronous loggers link a fixed-size message
//!   into a lock-free intrusive queue and return
//! - **Deterministic shutdown**: `Service::stop` delivers every message
//!   submitted before it and discards later ones without blocking
//! - **Rotating files**: size and daily rotation with a crash-safe manifest
//!   that survives restarts
//! - **Background compression**: closed segments are LZ4-compressed and aged
//!   out off the hot path
//!
//! ## Example
//!
//! ```
//! use tidelog::prelude::*;
//! use tidelog::info;
//!
//! let service = Service::new();
//! service.start()?;
//!
//! let memory = MemorySink::new("memory");
//! let logger = service.create_logger(vec![SinkHandle::new(memory.clone())], "app", true)?;
//! info!(logger, "listening on port {}", 8080);
//!
//! service.stop();
//! assert!(memory.lines()[0].contains("listening on port 8080"));
//! # Ok::<(), tidelog::LoggerError>(())
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Buffer1K, ColorRange, DefaultFormatter, Formatter, LogLevel, Logger, LoggerError, Result,
        Service, ServiceConfig, ServiceMetrics, Sink, SinkHandle, SourceLocation, TimestampFormat,
    };
    pub use crate::sinks::{ConsoleSink, FileSink, FileSinkConfig, MemorySink};
}

pub use crate::core::{
    allocated_memory, Buffer1K, Buffer2K, Buffer4K, Buffer8K, BufferView, ColorRange,
    CompressionHandle, CountingAllocator, DefaultFormatter, Formatter, LogLevel, Logger,
    LoggerError, Message, MessageBuffer, RecordBuffer, Result, Service, ServiceConfig,
    ServiceMetrics, Sink, SinkHandle, SourceLocation, TimestampFormat,
};
pub use crate::sinks::{
    ConsoleSink, ConsoleStream, ConsoleTarget, FileSink, FileSinkConfig, Manifest, MemorySink,
};

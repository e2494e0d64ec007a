//! Core pipeline types: buffers, queue, logger, service and workers

pub mod buffer;
pub mod compression;
pub mod config;
pub mod error;
pub mod formatter;
pub mod log_level;
pub mod logger;
pub mod memory;
pub mod message;
pub mod metrics;
pub mod queue;
pub mod service;
mod signal;
pub mod sink;
pub mod timestamp;

pub use buffer::{Buffer1K, Buffer2K, Buffer4K, Buffer8K, BufferView, MessageBuffer};
pub use compression::{
    clear_expired, compress_file, compressed_path, Compressed, CompressionHandle,
    CompressionTask, LZ4_EXTENSION,
};
pub use config::{
    ServiceConfig, DEFAULT_COMPRESSION_CHUNK_SIZE, DEFAULT_COMPRESSION_WAIT_TIMEOUT,
    DEFAULT_WRITER_WAIT_TIMEOUT,
};
pub use error::{LoggerError, Result};
pub use formatter::{ColorRange, DefaultFormatter, Formatter, RecordBuffer};
pub use log_level::LogLevel;
pub use logger::Logger;
pub use memory::{allocated_memory, CountingAllocator};
pub use message::{current_thread_id, Message, MessageKind, SourceLocation};
pub use metrics::ServiceMetrics;
pub use queue::{Batch, IntrusiveQueue, Link, Linked};
pub use service::Service;
pub use sink::{Sink, SinkHandle};
pub use timestamp::TimestampFormat;

//! Output destinations

mod console;
mod file;
mod manifest;
mod memory;

pub use console::{ConsoleSink, ConsoleStream, ConsoleTarget, StdStream};
pub use file::{day_key, FileSink, FileSinkConfig, DEFAULT_MAX_SIZE};
pub use manifest::Manifest;
pub use memory::MemorySink;

//! Console sink
//!
//! Terminal access goes through [`ConsoleTarget`], implemented once per
//! platform family, so the sink itself never branches on the OS.

use crate::core::{BufferView, ColorRange, LogLevel, Result, Sink};
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::io::{self, Write};

/// Byte-oriented terminal stream
pub trait ConsoleTarget: Send {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
    fn supports_color(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

/// Standard output or standard error of the process
#[derive(Debug)]
pub struct StdStream {
    stream: ConsoleStream,
    color: bool,
}

impl StdStream {
    pub fn new(stream: ConsoleStream) -> Self {
        Self {
            stream,
            color: platform::supports_color(stream),
        }
    }
}

impl ConsoleTarget for StdStream {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.stream {
            ConsoleStream::Stdout => io::stdout().lock().write_all(bytes),
            ConsoleStream::Stderr => io::stderr().lock().write_all(bytes),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream {
            ConsoleStream::Stdout => io::stdout().flush(),
            ConsoleStream::Stderr => io::stderr().flush(),
        }
    }

    fn supports_color(&self) -> bool {
        self.color
    }
}

#[cfg(unix)]
mod platform {
    use super::ConsoleStream;
    use std::io::IsTerminal;

    pub(super) fn supports_color(stream: ConsoleStream) -> bool {
        let tty = match stream {
            ConsoleStream::Stdout => std::io::stdout().is_terminal(),
            ConsoleStream::Stderr => std::io::stderr().is_terminal(),
        };
        if !tty || std::env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if std::env::var_os("COLORTERM").is_some() {
            return true;
        }
        match std::env::var("TERM") {
            Ok(term) => term != "dumb",
            Err(_) => false,
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::ConsoleStream;
    use std::io::IsTerminal;

    pub(super) fn supports_color(stream: ConsoleStream) -> bool {
        if std::env::var_os("NO_COLOR").is_some() {
            return false;
        }
        match stream {
            ConsoleStream::Stdout => std::io::stdout().is_terminal(),
            ConsoleStream::Stderr => std::io::stderr().is_terminal(),
        }
    }
}

#[cfg(not(any(unix, windows)))]
mod platform {
    use super::ConsoleStream;

    pub(super) fn supports_color(_stream: ConsoleStream) -> bool {
        false
    }
}

/// Writes formatted records to a console target, coloring the level token
pub struct ConsoleSink {
    target: Box<dyn ConsoleTarget>,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::with_target(StdStream::new(ConsoleStream::Stdout))
    }

    pub fn stderr() -> Self {
        Self::with_target(StdStream::new(ConsoleStream::Stderr))
    }

    pub fn with_target<T: ConsoleTarget + 'static>(target: T) -> Self {
        let use_colors = target.supports_color();
        Self {
            target: Box::new(target),
            use_colors,
        }
    }

    /// Override color detection
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }
}

impl Sink for ConsoleSink {
    fn write(
        &mut self,
        level: LogLevel,
        _timestamp: DateTime<Utc>,
        buf: BufferView<'_>,
        color: ColorRange,
    ) -> Result<()> {
        if !self.use_colors || color.is_empty() || color.stop > buf.len() {
            self.target.write(buf.as_bytes())?;
            return Ok(());
        }

        let token = String::from_utf8_lossy(buf.range(color.start, color.stop));
        let colored = token.color(level.color_code()).to_string();
        self.target.write(buf.range(0, color.start))?;
        self.target.write(colored.as_bytes())?;
        self.target.write(buf.range(color.stop, buf.len()))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.target.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Capture {
        bytes: Arc<Mutex<Vec<u8>>>,
        color: bool,
    }

    impl ConsoleTarget for Capture {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.bytes.lock().extend_from_slice(bytes);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn supports_color(&self) -> bool {
            self.color
        }
    }

    const LINE: &[u8] = b"[ts] [WARN ] [1] disk low (a.rs:1)\n";

    #[test]
    fn test_plain_output() {
        let capture = Capture::default();
        let mut sink = ConsoleSink::with_target(capture.clone());
        sink.write(
            LogLevel::Warn,
            Utc::now(),
            BufferView::new(LINE),
            ColorRange::new(6, 11),
        )
        .unwrap();
        assert_eq!(capture.bytes.lock().as_slice(), LINE);
    }

    #[test]
    fn test_colored_output_wraps_level_only() {
        colored::control::set_override(true);
        let capture = Capture {
            color: true,
            ..Capture::default()
        };
        let mut sink = ConsoleSink::with_target(capture.clone());
        sink.write(
            LogLevel::Warn,
            Utc::now(),
            BufferView::new(LINE),
            ColorRange::new(6, 11),
        )
        .unwrap();

        let out = String::from_utf8(capture.bytes.lock().clone()).unwrap();
        assert!(out.starts_with("[ts] ["));
        assert!(out.contains("\u{1b}["));
        assert!(out.contains("WARN "));
        assert!(out.ends_with("] [1] disk low (a.rs:1)\n"));
    }

    #[test]
    fn test_out_of_range_color_falls_back() {
        let capture = Capture {
            color: true,
            ..Capture::default()
        };
        let mut sink = ConsoleSink::with_target(capture.clone());
        sink.write(
            LogLevel::Info,
            Utc::now(),
            BufferView::new(b"short\n"),
            ColorRange::new(2, 100),
        )
        .unwrap();
        assert_eq!(capture.bytes.lock().as_slice(), b"short\n");
        assert!(!ConsoleSink::stdout().with_colors(false).use_colors);
    }
}

//! In-memory sink for tests and embedding

use crate::core::{BufferView, ColorRange, LogLevel, Result, Sink};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Captures every record it receives as a line of text.
///
/// Clones share the same storage, so a test can keep one clone and hand the
/// other to a [`SinkHandle`](crate::SinkHandle).
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    lines: Arc<Mutex<Vec<String>>>,
    flushes: Arc<AtomicUsize>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Arc::new(Mutex::new(Vec::new())),
            flushes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Records written so far, trailing newline removed
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(
        &mut self,
        _level: LogLevel,
        _timestamp: DateTime<Utc>,
        buf: BufferView<'_>,
        _color: ColorRange,
    ) -> Result<()> {
        let text = String::from_utf8_lossy(buf.as_bytes());
        self.lines
            .lock()
            .push(text.trim_end_matches('\n').to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_storage() {
        let sink = MemorySink::new("mem");
        let mut writer = sink.clone();
        writer
            .write(
                LogLevel::Info,
                Utc::now(),
                BufferView::new(b"one\n"),
                ColorRange::default(),
            )
            .unwrap();
        writer.flush().unwrap();

        assert_eq!(sink.lines(), vec!["one".to_string()]);
        assert_eq!(sink.flush_count(), 1);
        assert_eq!(writer.name(), "mem");

        sink.clear();
        assert!(sink.is_empty());
    }
}

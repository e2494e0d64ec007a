//! Background compression and retention worker
//!
//! Rotated log files are streamed through an LZ4 frame encoder into
//! `<stem>.log.lz4` and the source is deleted afterwards. Retention sweeps
//! delete compressed artifacts older than a number of days.

use super::error::{LoggerError, Result};
use super::metrics::ServiceMetrics;
use super::signal::Signal;
use lz4_flex::frame::FrameEncoder;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Extension of compressed artifacts, without the leading dot
pub const LZ4_EXTENSION: &str = "log.lz4";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Work item for the compression thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionTask {
    /// Compress `path` into `destination`, then delete `path`
    Compress { path: PathBuf, destination: PathBuf },

    /// Delete `<prefix>*.log.lz4` files in `destination` older than `keep_days`
    Clear {
        prefix: String,
        destination: PathBuf,
        keep_days: u32,
    },
}

#[derive(Debug, Default)]
struct Pending {
    tasks: Vec<CompressionTask>,
    closed: bool,
}

/// Task queue drained in batches by the compression thread
#[derive(Debug)]
pub(crate) struct CompressionQueue {
    pending: Mutex<Pending>,
    signal: Signal,
    stop: AtomicBool,
    wait_timeout: Duration,
    chunk_size: usize,
    metrics: Arc<ServiceMetrics>,
}

impl CompressionQueue {
    pub(crate) fn new(
        wait_timeout: Duration,
        chunk_size: usize,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            signal: Signal::new(),
            stop: AtomicBool::new(false),
            wait_timeout,
            chunk_size,
            metrics,
        }
    }

    /// Queue a task for the worker.
    ///
    /// Once the queue has been closed there is no worker left, so the task
    /// runs on the calling thread instead of being lost.
    pub(crate) fn post(&self, task: CompressionTask) {
        {
            let mut pending = self.pending.lock();
            if !pending.closed {
                pending.tasks.push(task);
                drop(pending);
                self.signal.notify();
                return;
            }
        }
        self.process(task);
    }

    /// Worker loop: swap out the pending batch, process it, then sleep
    pub(crate) fn run(&self) {
        loop {
            self.run_pending();
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            self.signal.wait(self.wait_timeout);
        }
    }

    /// Process everything queued so far on the calling thread
    pub(crate) fn run_pending(&self) {
        let batch = std::mem::take(&mut self.pending.lock().tasks);
        for task in batch {
            self.process(task);
        }
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.signal.notify();
    }

    /// Refuse further queueing and run whatever is left inline
    pub(crate) fn close(&self) {
        let batch = {
            let mut pending = self.pending.lock();
            pending.closed = true;
            std::mem::take(&mut pending.tasks)
        };
        for task in batch {
            self.process(task);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().tasks.len()
    }

    fn process(&self, task: CompressionTask) {
        match task {
            CompressionTask::Compress { path, destination } => {
                let outcome = compress_file(&path, &destination, self.chunk_size);
                self.record(&path, outcome);
            }
            CompressionTask::Clear {
                prefix,
                destination,
                keep_days,
            } => {
                let removed = clear_expired(&prefix, &destination, keep_days, SystemTime::now());
                if removed > 0 {
                    self.metrics.record_retention_removed(removed as u64);
                }
            }
        }
    }

    fn record(&self, source: &Path, outcome: Result<Compressed>) {
        match outcome {
            Ok(compressed) => {
                self.metrics.record_compressed();
                if let Some(e) = compressed.source_error {
                    eprintln!(
                        "[LOGGER WARNING] Compressed '{}' into '{}' but could not remove the source: {}",
                        source.display(),
                        compressed.artifact.display(),
                        e
                    );
                }
            }
            Err(e) => {
                self.metrics.record_compression_failure();
                eprintln!("[LOGGER ERROR] {}; keeping uncompressed file", e);
            }
        }
    }
}

/// Cloneable handle used by file sinks to post work to the compression thread
#[derive(Clone)]
pub struct CompressionHandle {
    queue: Arc<CompressionQueue>,
}

impl CompressionHandle {
    pub(crate) fn new(queue: Arc<CompressionQueue>) -> Self {
        Self { queue }
    }

    /// Fire-and-forget compression of a closed log file
    pub fn post_compress(&self, path: impl Into<PathBuf>, destination: impl Into<PathBuf>) {
        self.queue.post(CompressionTask::Compress {
            path: path.into(),
            destination: destination.into(),
        });
    }

    /// Fire-and-forget retention sweep
    pub fn clear_old(&self, prefix: impl Into<String>, destination: impl Into<PathBuf>, keep_days: u32) {
        self.queue.post(CompressionTask::Clear {
            prefix: prefix.into(),
            destination: destination.into(),
            keep_days,
        });
    }

    /// Tasks waiting for the worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl std::fmt::Debug for CompressionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionHandle")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Path of the compressed artifact for `source` inside `destination`
pub fn compressed_path(source: &Path, destination: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.join(format!("{}.{}", stem, LZ4_EXTENSION))
}

/// A finished compressed artifact
#[derive(Debug)]
pub struct Compressed {
    pub artifact: PathBuf,
    /// Set when the artifact is in place but the source could not be deleted
    pub source_error: Option<io::Error>,
}

/// Stream `source` through an LZ4 frame encoder into `destination`.
///
/// The artifact is written under a `.tmp` name and renamed once complete;
/// the source is deleted last. On failure the partial artifact is removed
/// and the source is left in place. A source that survives a completed
/// rename is not a failure; it is returned in [`Compressed::source_error`].
pub fn compress_file(source: &Path, destination: &Path, chunk_size: usize) -> Result<Compressed> {
    let target = compressed_path(source, destination);
    let mut temp = target.clone().into_os_string();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    let source_name = source.display().to_string();

    if let Err(e) = encode(source, destination, &temp, chunk_size) {
        let _ = fs::remove_file(&temp);
        return Err(LoggerError::compression(&source_name, e.to_string()));
    }

    fs::rename(&temp, &target).map_err(|e| {
        let _ = fs::remove_file(&temp);
        LoggerError::compression(&source_name, format!("rename failed: {}", e))
    })?;

    Ok(Compressed {
        artifact: target,
        source_error: fs::remove_file(source).err(),
    })
}

fn encode(source: &Path, destination: &Path, temp: &Path, chunk_size: usize) -> Result<()> {
    fs::create_dir_all(destination)?;
    let mut input = File::open(source)?;
    let mut encoder = FrameEncoder::new(File::create(temp)?);

    let mut chunk = vec![0u8; chunk_size.max(1)];
    loop {
        let read = input.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        encoder.write_all(&chunk[..read])?;
    }

    let output = encoder
        .finish()
        .map_err(|e| LoggerError::other(format!("lz4 frame error: {}", e)))?;
    output.sync_all()?;
    Ok(())
}

/// Delete regular files in `dir` named `<prefix>*.log.lz4` whose
/// modification time is older than `now - keep_days`.
///
/// Per-entry failures are reported and skipped. Returns the number of files
/// deleted.
pub fn clear_expired(prefix: &str, dir: &Path, keep_days: u32, now: SystemTime) -> usize {
    let age = Duration::from_secs(u64::from(keep_days) * SECONDS_PER_DAY);
    let Some(cutoff) = now.checked_sub(age) else {
        return 0;
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!(
                "[LOGGER WARNING] Retention sweep cannot list '{}': {}",
                dir.display(),
                e
            );
            return 0;
        }
    };

    let suffix = format!(".{}", LZ4_EXTENSION);
    let mut removed = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                eprintln!("[LOGGER WARNING] Retention sweep skipped an entry: {}", e);
                continue;
            }
        };

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.starts_with(prefix) || !file_name.ends_with(&suffix) {
            continue;
        }

        let modified = match entry.metadata().and_then(|meta| {
            if meta.is_file() {
                meta.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Retention sweep cannot stat '{}': {}",
                    entry.path().display(),
                    e
                );
                continue;
            }
        };

        if modified < cutoff {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!(
                    "[LOGGER WARNING] Retention sweep cannot remove '{}': {}",
                    entry.path().display(),
                    e
                ),
            }
        }
    }
    removed
}

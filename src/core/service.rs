//! Dispatch service: logger registry, delivery pipeline and background workers
//!
//! Producers submit messages through a lock-free intrusive queue guarded by
//! a submission counter. The counter is the number of submissions currently
//! linking a message; shutdown swaps it from `0` to a permanent closed
//! sentinel, which only succeeds once no producer is mid-link. Anything
//! submitted after that is discarded on the producer's thread.

use super::compression::{CompressionHandle, CompressionQueue, CompressionTask};
use super::config::ServiceConfig;
use super::error::{LoggerError, Result};
use super::logger::Logger;
use super::message::Message;
use super::metrics::ServiceMetrics;
use super::queue::IntrusiveQueue;
use super::signal::Signal;
use super::sink::{panic_message, SinkHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Submission counter value once the pipeline no longer accepts messages
const CLOSED: isize = isize::MIN;

#[derive(Default)]
struct Registry {
    loggers: HashMap<String, Arc<Logger>>,
    default: Option<Arc<Logger>>,
}

#[derive(Default)]
struct Workers {
    writer: Option<JoinHandle<()>>,
    compressor: Option<JoinHandle<()>>,
    stopped: bool,
}

pub(crate) struct ServiceInner {
    config: ServiceConfig,
    registry: Mutex<Registry>,
    queue: IntrusiveQueue<Message>,
    submissions: AtomicIsize,
    writer_signal: Signal,
    stop_writer: AtomicBool,
    compression: Arc<CompressionQueue>,
    workers: Mutex<Workers>,
    metrics: Arc<ServiceMetrics>,
}

impl ServiceInner {
    /// Queue `message` for the writer thread, or discard it if the pipeline
    /// has been closed.
    pub(crate) fn submit(&self, message: Box<Message>) {
        let previous = self.submissions.fetch_add(1, Ordering::AcqRel);
        if previous < 0 {
            // Re-pin the sentinel so repeated late submissions never walk the
            // counter back up towards zero.
            let _ = self.submissions.compare_exchange(
                previous + 1,
                CLOSED,
                Ordering::AcqRel,
                Ordering::Relaxed,
            );
            self.metrics.record_discarded();
            drop(message);
            return;
        }

        self.metrics.record_submitted();
        let was_empty = self.queue.push_back(message);
        self.submissions.fetch_sub(1, Ordering::AcqRel);

        if was_empty {
            self.writer_signal.notify();
        }
    }

    /// Deliver everything queued so far. Consumer side only.
    fn drain(&self) {
        for message in self.queue.take_batch() {
            match message.logger.upgrade() {
                Some(logger) => {
                    logger.dispatch(&message);
                    self.metrics.record_dispatched();
                }
                None => {
                    self.metrics.record_orphaned();
                }
            }
        }
    }

    /// Close the submission counter and deliver the remainder.
    ///
    /// Spins while producers are mid-submission; each of them is allowed to
    /// finish linking, and is drained by the loop or the final pass.
    fn close_and_drain(&self) {
        loop {
            self.drain();
            match self
                .submissions
                .compare_exchange(0, CLOSED, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(current) if current < 0 => break,
                Err(_) => thread::yield_now(),
            }
        }
        self.drain();
    }

    fn run_writer(&self) {
        loop {
            self.drain();
            if self.stop_writer.load(Ordering::Acquire) {
                self.close_and_drain();
                break;
            }
            self.writer_signal.wait(self.config.writer_wait_timeout);
        }
    }

    fn is_closed(&self) -> bool {
        self.submissions.load(Ordering::Acquire) < 0
    }
}

/// Owner of the logger registry and the background delivery pipeline.
///
/// # Example
///
/// ```
/// use tidelog::{MemorySink, Service, SinkHandle};
///
/// let service = Service::new();
/// service.start().unwrap();
///
/// let memory = MemorySink::new("memory");
/// let logger = service
///     .create_logger(vec![SinkHandle::new(memory.clone())], "app", true)
///     .unwrap();
/// logger.info("hello");
///
/// service.stop();
/// assert_eq!(memory.lines().len(), 1);
/// ```
pub struct Service {
    inner: Arc<ServiceInner>,
}

impl Service {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let metrics = Arc::new(ServiceMetrics::new());
        let compression = Arc::new(CompressionQueue::new(
            config.compression_wait_timeout,
            config.compression_chunk_size,
            Arc::clone(&metrics),
        ));
        Self {
            inner: Arc::new(ServiceInner {
                config,
                registry: Mutex::new(Registry::default()),
                queue: IntrusiveQueue::new(),
                submissions: AtomicIsize::new(0),
                writer_signal: Signal::new(),
                stop_writer: AtomicBool::new(false),
                compression,
                workers: Mutex::new(Workers::default()),
                metrics,
            }),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Create a logger and register it under `name`.
    ///
    /// Fails with [`LoggerError::DuplicateLogger`] if the name is taken.
    pub fn create_logger(
        &self,
        sinks: Vec<Arc<SinkHandle>>,
        name: impl Into<String>,
        is_async: bool,
    ) -> Result<Arc<Logger>> {
        let name = name.into();
        let mut registry = self.inner.registry.lock();
        if registry.loggers.contains_key(&name) {
            return Err(LoggerError::duplicate_logger(name));
        }
        let logger = Logger::new(Arc::downgrade(&self.inner), name.clone(), sinks, is_async);
        registry.loggers.insert(name, Arc::clone(&logger));
        Ok(logger)
    }

    pub fn find(&self, name: &str) -> Option<Arc<Logger>> {
        self.inner.registry.lock().loggers.get(name).cloned()
    }

    /// Remove `name` from the registry; the logger lives on while other
    /// owners hold it.
    pub fn erase(&self, name: &str) -> Option<Arc<Logger>> {
        self.inner.registry.lock().loggers.remove(name)
    }

    /// Empty the registry and the default slot
    pub fn clear(&self) {
        let mut registry = self.inner.registry.lock();
        registry.loggers.clear();
        registry.default = None;
    }

    pub fn get_default(&self) -> Option<Arc<Logger>> {
        self.inner.registry.lock().default.clone()
    }

    /// Make `logger` the default.
    ///
    /// The previous default is removed from the name registry in the same
    /// critical section, provided its name still maps to it. The new default
    /// is registered under its name unless that name is already taken.
    pub fn set_default(&self, logger: Arc<Logger>) {
        let mut registry = self.inner.registry.lock();
        if let Some(previous) = registry.default.take() {
            if !Arc::ptr_eq(&previous, &logger) {
                let registered = registry
                    .loggers
                    .get(previous.name())
                    .is_some_and(|entry| Arc::ptr_eq(entry, &previous));
                if registered {
                    registry.loggers.remove(previous.name());
                }
            }
        }
        registry
            .loggers
            .entry(logger.name().to_string())
            .or_insert_with(|| Arc::clone(&logger));
        registry.default = Some(logger);
    }

    /// Names currently registered, in no particular order
    pub fn logger_names(&self) -> Vec<String> {
        self.inner.registry.lock().loggers.keys().cloned().collect()
    }

    /// Spawn the writer and compression threads.
    ///
    /// A second call while they are running is a no-op, as is a call after
    /// [`stop`](Self::stop).
    pub fn start(&self) -> Result<()> {
        let mut workers = self.inner.workers.lock();
        if workers.stopped || self.inner.is_closed() {
            eprintln!("[LOGGER WARNING] Service already stopped; start() ignored");
            return Ok(());
        }

        if workers.writer.is_none() {
            let inner = Arc::clone(&self.inner);
            let handle = thread::Builder::new()
                .name("log-writer".to_string())
                .spawn(move || inner.run_writer())
                .map_err(|e| LoggerError::io_operation("spawning writer thread", "log-writer", e))?;
            workers.writer = Some(handle);
        }

        if workers.compressor.is_none() {
            let queue = Arc::clone(&self.inner.compression);
            let handle = thread::Builder::new()
                .name("log-compressor".to_string())
                .spawn(move || queue.run())
                .map_err(|e| {
                    LoggerError::io_operation("spawning compression thread", "log-compressor", e)
                })?;
            workers.compressor = Some(handle);
        }

        Ok(())
    }

    /// Drain the pipeline and join both background threads.
    ///
    /// Every message submitted before this call is delivered. Later calls are
    /// no-ops. Without a running writer the drain happens on this thread.
    pub fn stop(&self) {
        let mut workers = self.inner.workers.lock();
        if workers.stopped {
            return;
        }
        workers.stopped = true;

        self.inner.stop_writer.store(true, Ordering::Release);
        self.inner.writer_signal.notify();
        if let Some(writer) = workers.writer.take() {
            if let Err(payload) = writer.join() {
                eprintln!(
                    "[LOGGER CRITICAL] Writer thread panicked: {}",
                    panic_message(&*payload)
                );
            }
        }
        // No-op after a clean writer exit; otherwise closes and drains here.
        self.inner.close_and_drain();

        self.inner.compression.request_stop();
        if let Some(compressor) = workers.compressor.take() {
            if let Err(payload) = compressor.join() {
                eprintln!(
                    "[LOGGER CRITICAL] Compression thread panicked: {}",
                    panic_message(&*payload)
                );
            }
        }
        self.inner.compression.close();
    }

    pub fn is_running(&self) -> bool {
        let workers = self.inner.workers.lock();
        workers.writer.is_some() && !workers.stopped
    }

    /// Whether the submission counter has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// No message is waiting for the writer
    pub fn queue_is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.inner.metrics
    }

    /// Handle for posting compression and retention work
    pub fn compression_handle(&self) -> CompressionHandle {
        CompressionHandle::new(Arc::clone(&self.inner.compression))
    }

    /// Queue `path` for compression into `destination`
    pub fn post_compress(&self, path: impl Into<PathBuf>, destination: impl Into<PathBuf>) {
        self.inner.compression.post(CompressionTask::Compress {
            path: path.into(),
            destination: destination.into(),
        });
    }

    /// Queue a retention sweep of `destination`
    pub fn clear_old(
        &self,
        prefix: impl Into<String>,
        destination: impl Into<PathBuf>,
        keep_days: u32,
    ) {
        self.inner.compression.post(CompressionTask::Clear {
            prefix: prefix.into(),
            destination: destination.into(),
            keep_days,
        });
    }
}

impl Default for Service {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("running", &self.is_running())
            .field("closed", &self.is_closed())
            .field("metrics", self.metrics())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use crate::sinks::MemorySink;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn memory_logger(service: &Service, name: &str, is_async: bool) -> (Arc<Logger>, MemorySink) {
        let memory = MemorySink::new(name);
        let logger = service
            .create_logger(vec![SinkHandle::new(memory.clone())], name, is_async)
            .unwrap();
        (logger, memory)
    }

    #[test]
    fn test_registry_basics() {
        let service = Service::new();
        let (logger, _) = memory_logger(&service, "net", false);

        assert!(Arc::ptr_eq(&service.find("net").unwrap(), &logger));
        assert!(matches!(
            service.create_logger(Vec::new(), "net", false),
            Err(LoggerError::DuplicateLogger { .. })
        ));

        assert!(service.erase("net").is_some());
        assert!(service.find("net").is_none());
        assert!(service.erase("net").is_none());
    }

    #[test]
    fn test_set_default_replaces_previous_entry() {
        let service = Service::new();
        let (first, _) = memory_logger(&service, "first", false);
        let (second, _) = memory_logger(&service, "second", false);

        service.set_default(Arc::clone(&first));
        assert!(Arc::ptr_eq(&service.get_default().unwrap(), &first));

        service.set_default(Arc::clone(&second));
        assert!(Arc::ptr_eq(&service.get_default().unwrap(), &second));
        assert!(service.find("first").is_none());
        assert!(service.find("second").is_some());

        // re-setting the same default keeps it registered
        service.set_default(Arc::clone(&second));
        assert!(service.find("second").is_some());

        service.clear();
        assert!(service.get_default().is_none());
        assert!(service.logger_names().is_empty());
    }

    #[test]
    fn test_set_default_registers_unregistered_logger() {
        let service = Service::new();
        let (logger, _) = memory_logger(&service, "solo", false);
        service.erase("solo");

        service.set_default(Arc::clone(&logger));
        assert!(Arc::ptr_eq(&service.find("solo").unwrap(), &logger));
    }

    #[test]
    fn test_async_delivery_through_writer() {
        let service = Service::with_config(
            ServiceConfig::default().with_writer_wait_timeout(Duration::from_millis(20)),
        );
        service.start().unwrap();
        assert!(service.is_running());

        let (logger, memory) = memory_logger(&service, "async", true);
        for i in 0..100 {
            logger.log_fmt(LogLevel::Info, format_args!("message {}", i));
        }
        logger.flush();
        service.stop();

        let lines = memory.lines();
        assert_eq!(lines.len(), 100);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.contains(&format!("message {}", i)));
        }
        assert_eq!(memory.flush_count(), 1);
        assert_eq!(service.metrics().dispatched(), 101);
        assert!(service.queue_is_empty());
        assert!(!service.is_running());
    }

    #[test]
    fn test_stop_without_start_drains_inline() {
        let service = Service::new();
        let (logger, memory) = memory_logger(&service, "idle", true);
        logger.info("queued");
        assert!(memory.lines().is_empty());

        service.stop();
        assert_eq!(memory.lines().len(), 1);
        assert!(service.is_closed());

        logger.info("late");
        assert_eq!(memory.lines().len(), 1);
        assert_eq!(service.metrics().discarded(), 1);
    }

    #[test]
    fn test_start_is_idempotent_and_ignored_after_stop() {
        let service = Service::new();
        service.start().unwrap();
        service.start().unwrap();
        service.stop();
        service.stop();
        service.start().unwrap();
        assert!(!service.is_running());
    }

    #[test]
    fn test_orphaned_messages_are_dropped() {
        let service = Service::new();
        let (logger, memory) = memory_logger(&service, "gone", true);
        logger.info("in flight");
        service.erase("gone");
        drop(logger);

        service.stop();
        assert!(memory.lines().is_empty());
        assert_eq!(service.metrics().orphaned(), 1);
    }

    #[test]
    fn test_post_compress_runs_on_stop() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("svc_20260301.log");
        fs::write(&source, b"compress me").unwrap();

        let service = Service::new();
        service.post_compress(&source, dir.path());
        service.clear_old("svc_", dir.path(), 30);
        service.stop();

        assert!(!source.exists());
        assert!(dir.path().join("svc_20260301.log.lz4").exists());
        assert_eq!(service.metrics().compressed(), 1);
    }
}

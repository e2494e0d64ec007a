//! Rotating file sink
//!
//! Writes into `<directory>/<name>_<day>.log` (or `<name>_<day>_<seq:04>.log`
//! for later segments of the same day), rotating on size and on UTC day
//! boundaries. The current segment is persisted in
//! `<directory>/manifest_<name>.json` so a restarted process resumes where
//! it left off. Closed segments are handed to the service's compression
//! worker.

use super::manifest::Manifest;
use crate::core::{
    BufferView, ColorRange, CompressionHandle, LogLevel, LoggerError, Result, Service, Sink,
};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default size threshold for rotation (64 MiB)
pub const DEFAULT_MAX_SIZE: u64 = 64 * 1024 * 1024;

/// Configuration for a [`FileSink`]
///
/// # Example
///
/// ```
/// use tidelog::FileSinkConfig;
///
/// let config = FileSinkConfig::new("app", "/var/log/app")
///     .with_max_size(8 * 1024 * 1024)
///     .with_keep_days(14);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    /// Base name of segment, manifest and archive files
    pub name: String,

    /// Directory for live segments and the manifest
    pub directory: PathBuf,

    /// Directory for compressed segments; defaults to `directory`
    pub lz4_directory: Option<PathBuf>,

    /// Rotate once the current segment reaches this many bytes; `0` disables
    pub max_size: u64,

    /// Rotate at every UTC day boundary
    pub daily_rotation: bool,

    /// Delete compressed segments older than this many days; `0` disables
    pub keep_days: u32,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            directory: PathBuf::from("."),
            lz4_directory: None,
            max_size: DEFAULT_MAX_SIZE,
            daily_rotation: true,
            keep_days: 0,
        }
    }
}

impl FileSinkConfig {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_lz4_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.lz4_directory = Some(directory.into());
        self
    }

    #[must_use]
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_daily_rotation(mut self, enabled: bool) -> Self {
        self.daily_rotation = enabled;
        self
    }

    #[must_use]
    pub fn with_keep_days(mut self, keep_days: u32) -> Self {
        self.keep_days = keep_days;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(LoggerError::config("file sink", "name must not be empty"));
        }
        if self.name.contains(['/', '\\']) {
            return Err(LoggerError::config(
                "file sink",
                format!("name '{}' must not contain path separators", self.name),
            ));
        }
        Ok(())
    }

    pub fn archive_directory(&self) -> &Path {
        self.lz4_directory.as_deref().unwrap_or(&self.directory)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(format!("manifest_{}.json", self.name))
    }

    /// Path of the segment identified by `manifest`
    pub fn segment_path(&self, manifest: Manifest) -> PathBuf {
        let file_name = if manifest.seq == 0 {
            format!("{}_{}.log", self.name, manifest.day)
        } else {
            format!("{}_{}_{:04}.log", self.name, manifest.day, manifest.seq)
        };
        self.directory.join(file_name)
    }
}

/// `YYYYMMDD` of `timestamp` in UTC
pub fn day_key(timestamp: &DateTime<Utc>) -> u32 {
    let year = timestamp.year().max(0) as u32;
    year * 10_000 + timestamp.month() * 100 + timestamp.day()
}

fn next_midnight(timestamp: &DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A sink appending to rotating, manifest-tracked log files
pub struct FileSink {
    config: FileSinkConfig,
    manifest_path: PathBuf,
    manifest: Manifest,
    tomorrow: Option<DateTime<Utc>>,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    file_size: u64,
    compression: CompressionHandle,
}

impl FileSink {
    /// Create a sink whose closed segments go to `service`'s compression
    /// worker.
    ///
    /// A persisted manifest is loaded and its segment reopened for append.
    pub fn new(config: FileSinkConfig, service: &Service) -> Result<Self> {
        Self::with_compression(config, service.compression_handle())
    }

    pub fn with_compression(config: FileSinkConfig, compression: CompressionHandle) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.directory).map_err(|e| {
            LoggerError::io_operation(
                "creating log directory",
                config.directory.display().to_string(),
                e,
            )
        })?;
        fs::create_dir_all(config.archive_directory()).map_err(|e| {
            LoggerError::io_operation(
                "creating archive directory",
                config.archive_directory().display().to_string(),
                e,
            )
        })?;

        let manifest_path = config.manifest_path();
        let manifest = Manifest::load(&manifest_path).unwrap_or_default();

        let mut sink = Self {
            config,
            manifest_path,
            manifest,
            tomorrow: None,
            writer: None,
            current_path: None,
            file_size: 0,
            compression,
        };

        if sink.manifest.day != 0 {
            if let Err(e) = sink.open_current() {
                eprintln!("[LOGGER WARNING] {}; will retry on next write", e);
            }
        }
        Ok(sink)
    }

    pub fn config(&self) -> &FileSinkConfig {
        &self.config
    }

    pub fn manifest(&self) -> Manifest {
        self.manifest
    }

    /// Path of the open segment, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Bytes in the current segment
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Append `bytes` stamped with `timestamp`, rotating first if due.
    ///
    /// If the segment cannot be opened the write is dropped and the sink
    /// stays closed until the next attempt.
    pub fn write_at(&mut self, timestamp: DateTime<Utc>, bytes: &[u8]) -> Result<()> {
        let today = day_key(&timestamp);

        if self.tomorrow.map_or(true, |tomorrow| timestamp >= tomorrow) {
            self.tomorrow = Some(next_midnight(&timestamp));
            let previous_day = self.manifest.day;

            let never_rotated = previous_day == 0;
            if (self.config.daily_rotation || never_rotated)
                && (never_rotated || today > previous_day)
            {
                self.rotate(today);
            }

            if self.config.keep_days > 0 && !never_rotated {
                self.compression.clear_old(
                    format!("{}_", self.config.name),
                    self.config.archive_directory(),
                    self.config.keep_days,
                );
            }
        }

        if self.config.max_size > 0 && self.file_size >= self.config.max_size {
            self.rotate(today);
        }

        if self.writer.is_none() {
            self.open_current()?;
        }

        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        if let Err(e) = writer.write_all(bytes) {
            let path = self.current_path.take().unwrap_or_default();
            self.writer = None;
            return Err(LoggerError::file_sink(
                path.display().to_string(),
                format!("write failed: {}", e),
            ));
        }
        self.file_size += bytes.len() as u64;
        Ok(())
    }

    /// Close the current segment, advance and persist the manifest, then
    /// queue the closed segment for compression.
    fn rotate(&mut self, today: u32) {
        let closed = self.close_current();

        self.manifest = self.manifest.next(today);
        if let Err(e) = self.manifest.save(&self.manifest_path) {
            eprintln!("[LOGGER ERROR] {}", e);
        }

        if let Some(path) = closed {
            self.compression
                .post_compress(path, self.config.archive_directory());
        }
    }

    fn open_current(&mut self) -> Result<()> {
        let path = self.config.segment_path(self.manifest);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::file_sink(path.display().to_string(), format!("open failed: {}", e))
            })?;
        self.file_size = file.metadata().map(|meta| meta.len()).unwrap_or(0);
        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        Ok(())
    }

    fn close_current(&mut self) -> Option<PathBuf> {
        let path = self.current_path.take();
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                eprintln!(
                    "[LOGGER ERROR] Flushing '{}' before rotation failed: {}",
                    path.as_deref().unwrap_or(Path::new("")).display(),
                    e
                );
            }
        }
        self.file_size = 0;
        path
    }
}

impl Sink for FileSink {
    fn write(
        &mut self,
        _level: LogLevel,
        timestamp: DateTime<Utc>,
        buf: BufferView<'_>,
        _color: ColorRange,
    ) -> Result<()> {
        self.write_at(timestamp, buf.as_bytes())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("name", &self.config.name)
            .field("manifest", &self.manifest)
            .field("current_path", &self.current_path)
            .field("file_size", &self.file_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(FileSinkConfig::new("", ".").validate().is_err());
        assert!(FileSinkConfig::new("a/b", ".").validate().is_err());
        assert!(FileSinkConfig::new("a\\b", ".").validate().is_err());
        assert!(FileSinkConfig::new("app", ".").validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config = FileSinkConfig::from_json(
            r#"{"name": "api", "directory": "/tmp/logs", "max_size": 1024}"#,
        )
        .unwrap();
        assert_eq!(config.name, "api");
        assert_eq!(config.max_size, 1024);
        assert!(config.daily_rotation);
        assert_eq!(config.archive_directory(), Path::new("/tmp/logs"));
        assert!(FileSinkConfig::from_json(r#"{"directory": "/tmp"}"#).is_err());
    }

    #[test]
    fn test_segment_names() {
        let config = FileSinkConfig::new("app", "/logs");
        assert_eq!(
            config.segment_path(Manifest::new(20260301, 0)),
            PathBuf::from("/logs/app_20260301.log")
        );
        assert_eq!(
            config.segment_path(Manifest::new(20260301, 12)),
            PathBuf::from("/logs/app_20260301_0012.log")
        );
        assert_eq!(config.manifest_path(), PathBuf::from("/logs/manifest_app.json"));
    }

    #[test]
    fn test_day_key_and_midnight() {
        assert_eq!(day_key(&at(2026, 3, 1, 23)), 20260301);
        assert_eq!(next_midnight(&at(2026, 2, 28, 5)), at(2026, 3, 1, 0));
        assert_eq!(next_midnight(&at(2026, 12, 31, 0)), at(2027, 1, 1, 0));
    }

    #[test]
    fn test_first_write_opens_day_segment() {
        let dir = TempDir::new().unwrap();
        let service = Service::new();
        let mut sink =
            FileSink::new(FileSinkConfig::new("app", dir.path()), &service).unwrap();
        assert!(!sink.is_open());
        assert_eq!(sink.manifest(), Manifest::default());

        sink.write_at(at(2026, 3, 1, 8), b"hello\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(sink.manifest(), Manifest::new(20260301, 0));
        assert_eq!(sink.file_size(), 6);
        assert_eq!(
            fs::read(dir.path().join("app_20260301.log")).unwrap(),
            b"hello\n"
        );
        assert_eq!(
            Manifest::load(&dir.path().join("manifest_app.json")),
            Some(Manifest::new(20260301, 0))
        );
    }

    #[test]
    fn test_unlimited_size_never_rotates() {
        let dir = TempDir::new().unwrap();
        let service = Service::new();
        let config = FileSinkConfig::new("big", dir.path())
            .with_max_size(0)
            .with_daily_rotation(false);
        let mut sink = FileSink::new(config, &service).unwrap();

        let chunk = vec![b'x'; 4096];
        for hour in 0..20 {
            sink.write_at(at(2026, 3, 1 + hour / 10, hour % 10), &chunk)
                .unwrap();
        }
        assert_eq!(sink.manifest(), Manifest::new(20260301, 0));
        assert_eq!(sink.file_size(), 20 * 4096);
    }

    #[test]
    fn test_unopenable_segment_drops_write() {
        let dir = TempDir::new().unwrap();
        let service = Service::new();
        let mut sink =
            FileSink::new(FileSinkConfig::new("app", dir.path()), &service).unwrap();

        // a directory where the segment file should go
        fs::create_dir(dir.path().join("app_20260301.log")).unwrap();
        let err = sink.write_at(at(2026, 3, 1, 8), b"lost\n").unwrap_err();
        assert!(matches!(err, LoggerError::FileSinkError { .. }));
        assert!(!sink.is_open());

        fs::remove_dir(dir.path().join("app_20260301.log")).unwrap();
        sink.write_at(at(2026, 3, 1, 9), b"kept\n").unwrap();
        assert!(sink.is_open());
    }
}

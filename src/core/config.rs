//! Service configuration

use super::error::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on how long the writer sleeps without a wake-up
pub const DEFAULT_WRITER_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default bound on how long the compression worker sleeps without a wake-up
pub const DEFAULT_COMPRESSION_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Bytes read from a rotated file per encoder update
pub const DEFAULT_COMPRESSION_CHUNK_SIZE: usize = 16 * 1024;

/// Tunables for a [`Service`](super::service::Service)
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tidelog::ServiceConfig;
///
/// let config = ServiceConfig::default()
///     .with_writer_wait_timeout(Duration::from_millis(500))
///     .with_compression_chunk_size(64 * 1024);
///
/// assert_eq!(config.compression_chunk_size, 64 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Safety net against a missed wake-up of the writer thread
    pub writer_wait_timeout: Duration,

    /// Safety net against a missed wake-up of the compression thread
    pub compression_wait_timeout: Duration,

    /// Read chunk used when streaming a rotated file through the encoder
    pub compression_chunk_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            writer_wait_timeout: DEFAULT_WRITER_WAIT_TIMEOUT,
            compression_wait_timeout: DEFAULT_COMPRESSION_WAIT_TIMEOUT,
            compression_chunk_size: DEFAULT_COMPRESSION_CHUNK_SIZE,
        }
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn with_writer_wait_timeout(mut self, timeout: Duration) -> Self {
        self.writer_wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_compression_wait_timeout(mut self, timeout: Duration) -> Self {
        self.compression_wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_compression_chunk_size(mut self, size: usize) -> Self {
        self.compression_chunk_size = size;
        self
    }

    /// Parse a JSON document; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_chunk_size == 0 {
            return Err(LoggerError::config(
                "service",
                "compression_chunk_size must be greater than zero",
            ));
        }
        if self.writer_wait_timeout.is_zero() || self.compression_wait_timeout.is_zero() {
            return Err(LoggerError::config(
                "service",
                "wait timeouts must be greater than zero",
            ));
        }
        Ok(())
    }
}

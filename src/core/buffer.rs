//! Fixed-capacity message buffer
//!
//! A [`MessageBuffer`] holds one formatted log record in a single inline byte
//! region with a read cursor and a write cursor:
//!
//! ```text
//! +-------------------+------------------+------------------+
//! | prependable bytes |  readable bytes  |  writable bytes  |
//! +-------------------+------------------+------------------+
//! 0      <=          read      <=      write      <=       N
//! ```
//!
//! Appends never grow the buffer. Whatever does not fit is dropped, so a
//! log call can never fail or reallocate because of a long message.

use std::fmt;
use std::ops::Deref;

/// Fixed-capacity byte container for one log record
#[derive(Clone)]
pub struct MessageBuffer<const N: usize> {
    read: usize,
    write: usize,
    data: [u8; N],
}

pub type Buffer1K = MessageBuffer<1024>;
pub type Buffer2K = MessageBuffer<2048>;
pub type Buffer4K = MessageBuffer<4096>;
pub type Buffer8K = MessageBuffer<8192>;

impl<const N: usize> MessageBuffer<N> {
    pub const CAPACITY: usize = N;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            read: 0,
            write: 0,
            data: [0; N],
        }
    }

    /// Create an empty buffer whose cursors start at `reserved`, leaving
    /// that many bytes available to [`prepend`](Self::prepend)
    #[must_use]
    pub const fn with_prefix_space(reserved: usize) -> Self {
        let start = if reserved < N { reserved } else { N };
        Self {
            read: start,
            write: start,
            data: [0; N],
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub const fn readable(&self) -> usize {
        self.write - self.read
    }

    #[inline]
    pub const fn writable(&self) -> usize {
        N - self.write
    }

    #[inline]
    pub const fn prependable(&self) -> usize {
        self.read
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// Copy as much of `bytes` as fits at the write cursor.
    ///
    /// Returns the number of bytes actually stored; the rest is truncated.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.writable());
        self.data[self.write..self.write + n].copy_from_slice(&bytes[..n]);
        self.write += n;
        n
    }

    #[inline]
    pub fn append_str(&mut self, s: &str) -> usize {
        self.append(s.as_bytes())
    }

    /// Write `bytes` immediately before the readable region.
    ///
    /// Fails without touching the buffer when fewer than `bytes.len()`
    /// prependable bytes are available.
    pub fn prepend(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.prependable() {
            return false;
        }
        let start = self.read - bytes.len();
        self.data[start..self.read].copy_from_slice(bytes);
        self.read = start;
        true
    }

    /// Copy the first `out.len()` readable bytes (or fewer) into `out`
    pub fn peek(&self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.readable());
        out[..n].copy_from_slice(&self.data[self.read..self.read + n]);
        n
    }

    /// Copy the last `out.len()` readable bytes (or fewer) into `out`
    pub fn rpeek(&self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.readable());
        out[..n].copy_from_slice(&self.data[self.write - n..self.write]);
        n
    }

    /// Advance the read cursor past `n` bytes; returns how many were skipped
    pub fn consume(&mut self, n: usize) -> usize {
        let n = n.min(self.readable());
        self.read += n;
        n
    }

    /// Keep only the first `len` readable bytes
    pub fn truncate(&mut self, len: usize) {
        if len < self.readable() {
            self.write = self.read + len;
        }
    }

    /// Move the unread region to offset 0, reclaiming consumed space.
    ///
    /// Not called implicitly so the append path stays branch-free.
    pub fn shrink(&mut self) {
        if self.read == 0 {
            return;
        }
        let len = self.readable();
        self.data.copy_within(self.read..self.write, 0);
        self.read = 0;
        self.write = len;
    }

    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.read..self.write]
    }

    /// Borrow the readable region without copying
    #[inline]
    pub fn view(&self) -> BufferView<'_> {
        BufferView {
            bytes: self.as_bytes(),
        }
    }
}

impl<const N: usize> Default for MessageBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for MessageBuffer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBuffer")
            .field("capacity", &N)
            .field("read", &self.read)
            .field("write", &self.write)
            .field("content", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

/// Truncating sink for `write!`; never reports an error.
impl<const N: usize> fmt::Write for MessageBuffer<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s.as_bytes());
        Ok(())
    }
}

/// Read-only view of a buffer's unread bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferView<'a> {
    bytes: &'a [u8],
}

impl<'a> BufferView<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    #[inline]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Sub-range clamped to the view's bounds
    pub fn range(&self, start: usize, stop: usize) -> &'a [u8] {
        let stop = stop.min(self.bytes.len());
        let start = start.min(stop);
        &self.bytes[start..stop]
    }
}

impl Deref for BufferView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl AsRef<[u8]> for BufferView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

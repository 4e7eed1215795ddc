//! The growable output buffer every encoder writes into.

use bstr::ByteSlice;

use crate::Error;

/// Bytes kept in reserve past the logical capacity after every growth, so
/// small appends that follow an `ensure` never reallocate.
pub const SLACK: usize = 16;

/// Initial capacity of a fresh buffer.
pub const INITIAL_CAPACITY: usize = 4096;

/// A growable output buffer with a write cursor.
///
/// Writers call [`ensure`](Self::ensure) once for a batch of appends, then
/// append without further checks. Growth doubles the capacity, or adds the
/// requested length if doubling is not enough, plus [`SLACK`].
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }
}

impl OutputBuffer {
    /// A buffer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity + SLACK),
            capacity,
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.bytes.len()
    }

    /// Logical capacity, excluding the slack.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Guarantees at least `n` free bytes at the cursor.
    pub fn ensure(&mut self, n: usize) {
        let cursor = self.bytes.len();
        if self.capacity - cursor >= n {
            return;
        }
        let grown = (self.capacity * 2).max(self.capacity + n);
        tracing::trace!(from = self.capacity, to = grown, "growing output buffer");
        self.bytes.reserve_exact(grown + SLACK - cursor);
        self.capacity = grown;
    }

    /// Appends a slice. The caller must have ensured room for it.
    #[inline]
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        debug_assert!(
            self.bytes.len() + bytes.len() <= self.capacity + SLACK,
            "append of {} bytes without ensure",
            bytes.len()
        );
        self.bytes.extend_from_slice(bytes);
        self.sync_capacity();
    }

    /// Appends one byte. The caller must have ensured room for it.
    #[inline]
    pub fn append_byte(&mut self, b: u8) {
        debug_assert!(self.bytes.len() < self.capacity + SLACK, "append without ensure");
        self.bytes.push(b);
        self.sync_capacity();
    }

    /// Appends a string, ensuring room first.
    pub fn push_str(&mut self, s: &str) {
        self.ensure(s.len());
        self.append_bytes(s.as_bytes());
    }

    /// The written bytes.
    #[must_use]
    pub fn finish(&self) -> &[u8] {
        &self.bytes
    }

    /// The written bytes as text.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Encoding`] if raw input written through
    /// [`append_bytes`](Self::append_bytes) was not UTF-8.
    pub fn as_str(&self) -> Result<&str, Error> {
        self.bytes
            .to_str()
            .map_err(|e| Error::Encoding(format!("output is not UTF-8: {e}")))
    }

    /// The last byte written.
    #[must_use]
    pub fn last(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    /// Rewinds the cursor to zero, keeping the allocation.
    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    /// Consumes the buffer, returning the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    // Slack consumed by unchecked appends becomes part of the capacity.
    fn sync_capacity(&mut self) {
        if self.bytes.len() > self.capacity {
            self.capacity = self.bytes.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_doubles_or_adds_request() {
        let mut buf = OutputBuffer::with_capacity(8);
        buf.ensure(8);
        assert_eq!(buf.capacity(), 8);

        buf.append_bytes(b"abcdef");
        buf.ensure(4);
        assert_eq!(buf.capacity(), 16);

        buf.append_bytes(b"ghij");
        buf.ensure(100);
        assert_eq!(buf.capacity(), 16 + 100);
        assert_eq!(buf.finish(), b"abcdefghij");
    }

    #[test]
    fn cursor_never_exceeds_capacity() {
        let mut buf = OutputBuffer::with_capacity(1);
        for chunk in ["a", "bc", "def", "ghij", "klmno"] {
            buf.push_str(chunk);
            assert!(buf.cursor() <= buf.capacity());
        }
        assert_eq!(buf.as_str().ok(), Some("abcdefghijklmno"));
    }

    #[test]
    fn reset_keeps_allocation() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.push_str("0123456789");
        let capacity = buf.capacity();
        buf.reset();
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.capacity(), capacity);
        buf.push_str("x");
        assert_eq!(buf.finish(), b"x");
    }

    #[test]
    fn invalid_raw_bytes_are_reported() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.ensure(2);
        buf.append_bytes(&[0xC3, 0x28]);
        assert!(matches!(buf.as_str(), Err(Error::Encoding(_))));
    }
}

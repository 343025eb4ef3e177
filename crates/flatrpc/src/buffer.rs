use core::fmt::{self, Write};

use bstr::{BStr, ByteSlice};

/// A bounded, append-only output buffer.
///
/// The buffer tracks a *logical* length separately from what physically
/// fits. Appends always advance the logical length but only copy the bytes
/// that fit in front of the reserved NUL slot, so a caller detects
/// truncation by comparing [`logical_len`](Self::logical_len) with
/// [`capacity`](Self::capacity) after the fact.
///
/// Invariants
/// - `buf[..min(len, capacity - 1)]` holds a prefix of everything appended.
/// - No byte at or past `capacity - 1` is written by an append; that slot is
///   reserved for the NUL written by [`finish`](Self::finish).
///
/// ```rust
/// use flatrpc::ResponseBuffer;
///
/// let mut storage = [0u8; 6];
/// let mut out = ResponseBuffer::new(&mut storage);
/// out.append_str("hello world");
/// out.finish();
/// assert!(out.is_truncated());
/// assert_eq!(out.logical_len(), 11);
/// assert_eq!(out.as_bytes(), b"hello");
/// assert_eq!(storage, *b"hello\0");
/// ```
#[derive(Debug)]
pub struct ResponseBuffer<'o> {
    buf: &'o mut [u8],
    len: usize,
}

impl<'o> ResponseBuffer<'o> {
    /// Wraps `buf`, writing a NUL at the start if there is room for one.
    pub fn new(buf: &'o mut [u8]) -> Self {
        if let Some(first) = buf.first_mut() {
            *first = 0;
        }
        Self { buf, len: 0 }
    }

    /// Physical size of the underlying storage, NUL slot included.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes appended so far, including any that did not fit.
    #[must_use]
    pub const fn logical_len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been appended.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether some appended bytes were dropped.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.len > self.room()
    }

    /// Forgets all appended bytes.
    pub fn clear(&mut self) {
        self.len = 0;
        self.finish();
    }

    /// Appends `bytes`, copying whatever still fits.
    pub fn append(&mut self, bytes: &[u8]) {
        let room = self.room();
        if self.len < room {
            let take = bytes.len().min(room - self.len);
            self.buf[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        }
        self.len = self.len.saturating_add(bytes.len());
    }

    /// Appends `text`.
    pub fn append_str(&mut self, text: &str) {
        self.append(text.as_bytes());
    }

    /// Appends `text` escaped for use inside a JSON string literal, without
    /// the surrounding quotes.
    pub fn append_escaped(&mut self, text: &str) {
        // never fails, see the `fmt::Write` impl
        let _ = write_escaped(text, self);
    }

    /// Writes the terminating NUL right after the content, or in the last
    /// slot when the content was truncated.
    pub fn finish(&mut self) {
        let at = self.len.min(self.room());
        if let Some(slot) = self.buf.get_mut(at) {
            *slot = 0;
        }
    }

    /// The bytes physically held, without the NUL.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len.min(self.room())]
    }

    /// [`as_bytes`](Self::as_bytes) as a [`BStr`].
    #[must_use]
    pub fn as_bstr(&self) -> &BStr {
        self.as_bytes().as_bstr()
    }

    /// The held bytes as UTF-8, `None` if truncation split a character.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().to_str().ok()
    }

    /// Bytes an append may write to: everything but the NUL slot.
    fn room(&self) -> usize {
        self.buf.len().saturating_sub(1)
    }

    /// Panics if the buffer invariants do not hold.
    #[cfg(any(test, feature = "fuzzing"))]
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let held = self.as_bytes().len();
        assert!(held <= self.room(), "held {held} bytes past the NUL slot");
        assert_eq!(held, self.len.min(self.room()));
        if let Some(&nul) = self.buf.get(held) {
            assert_eq!(nul, 0, "missing NUL at {held}");
        }
    }
}

/// Appending never fails; bytes that do not fit are counted and dropped.
impl Write for ResponseBuffer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_str(s);
        Ok(())
    }
}

/// Writes `src` with the characters JSON requires (and the two line
/// separators older parsers choke on) escaped.
fn write_escaped<W: Write>(src: &str, out: &mut W) -> fmt::Result {
    for c in src.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            '\u{2028}' | '\u{2029}' => write!(out, "\\u{:04X}", u32::from(c))?,
            c if c.is_ascii_control() => write!(out, "\\u{:04X}", u32::from(c))?,
            _ => out.write_char(c)?,
        }
    }
    Ok(())
}

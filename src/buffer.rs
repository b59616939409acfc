//! Growable read buffer.
//!
//! Each connection owns one [`ReadBuf`]. Incoming bytes accumulate at the
//! write position; the http parser walks them in place. The buffer starts
//! at [`INIT_BUFFER_SIZE`] and doubles whenever the spare room is used up.
//!
//! The parser never keeps references into the storage. It takes [`Span`]s
//! (offset + length) and resolves them to a live slice at the moment of
//! use, so a reallocation during growth invalidates nothing.

/// 4096
pub const INIT_BUFFER_SIZE: usize = 4096;

/// An (offset, length) window into a [`ReadBuf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub off: usize,
    pub len: usize,
}

impl Span {
    /// Constructor.
    #[inline]
    pub const fn new(off: usize, len: usize) -> Self { Self { off, len } }

    #[inline]
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    #[inline]
    pub const fn end(&self) -> usize { self.off + self.len }

    /// Resolve against the buffer the span was taken from.
    #[inline]
    pub fn resolve<'b>(&self, buf: &'b ReadBuf) -> &'b [u8] {
        &buf.filled()[self.off..self.off + self.len]
    }

    /// Resolve as text. Request lines and header names have already been
    /// vetted as ascii by the parser.
    #[inline]
    pub fn resolve_str<'b>(&self, buf: &'b ReadBuf) -> &'b str {
        std::str::from_utf8(self.resolve(buf)).unwrap_or("")
    }
}

/// Heap buffer which doubles on demand.
#[derive(Debug)]
pub struct ReadBuf {
    buf: Vec<u8>,
    len: usize,
}

impl ReadBuf {
    #[inline]
    pub fn new() -> Self {
        Self {
            buf: vec![0; INIT_BUFFER_SIZE],
            len: 0,
        }
    }

    /// Bytes read so far.
    #[inline]
    pub fn filled(&self) -> &[u8] { &self.buf[..self.len] }

    #[inline]
    pub const fn len(&self) -> usize { self.len }

    #[inline]
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    #[inline]
    pub fn capacity(&self) -> usize { self.buf.len() }

    /// Writable room after the filled region. Doubles the storage first
    /// if the filled region has reached the end.
    #[inline]
    pub fn spare(&mut self) -> &mut [u8] {
        if self.len == self.buf.len() {
            self.grow();
        }
        &mut self.buf[self.len..]
    }

    /// Commit `n` bytes written into [`spare`](Self::spare).
    #[inline]
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.len + n <= self.buf.len());
        self.len += n;
    }

    /// Double the storage, keeping the filled bytes.
    pub fn grow(&mut self) {
        self.buf.resize(self.buf.len() * 2, 0);
    }

    /// Drop the first `n` bytes, moving the remainder to the front.
    /// Only called between pipelined exchanges; any span taken before
    /// this point is dead.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }

    /// Forget everything.
    #[inline]
    pub fn reset(&mut self) { self.len = 0; }
}

impl Default for ReadBuf {
    fn default() -> Self { Self::new() }
}

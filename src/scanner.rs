//! Streaming substitution over a bounded look-ahead buffer.
//!
//! The scanner keeps a fixed-size window over the input. Matching always runs
//! on `buf[pos..len]`; `len` is the end of valid data, so nothing past it is
//! ever read. While the input is live the window is kept full, and it is
//! shifted and refilled once `pos` passes the middle of the buffer. With a
//! capacity of at least twice the longest key, every match starting at a
//! position before the midpoint fits in the window.

use std::io::{self, Read, Write};

use crate::error::{EngineError, Result};
use crate::keys::KeyTable;
use crate::tree::SearchTree;

/// Look-ahead capacity used when none is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

// =============================================================================
// StreamCursor
// =============================================================================

/// Fixed-capacity window over an input stream.
///
/// Invariant: `pos <= len <= capacity`. Unless `eof` is set, `len ==
/// capacity` after every fill.
pub struct StreamCursor {
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
    eof: bool,
}

impl StreamCursor {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            len: 0,
            eof: false,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == self.len
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Unread bytes.
    #[inline]
    pub fn window(&self) -> &[u8] {
        &self.buf[self.pos..self.len]
    }

    #[inline]
    fn slice(&self, from: usize, to: usize) -> &[u8] {
        &self.buf[from..to]
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.len);
        self.pos += n;
    }

    /// All input consumed.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.eof && self.pos == self.len
    }

    /// Past the midpoint with more input to come.
    #[inline]
    pub fn needs_refill(&self) -> bool {
        !self.eof && (self.pos > self.buf.len() / 2 || self.pos == self.len)
    }

    /// Move the unread tail to the front and read until the buffer is full or
    /// the input is exhausted. Returns the number of bytes read.
    pub fn refill<R: Read>(&mut self, input: &mut R) -> io::Result<usize> {
        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.len, 0);
            self.len -= self.pos;
            self.pos = 0;
        }

        let mut total = 0;
        while !self.eof && self.len < self.buf.len() {
            match input.read(&mut self.buf[self.len..]) {
                Ok(0) => self.eof = true,
                Ok(n) => {
                    self.len += n;
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }
}

// =============================================================================
// StreamScanner
// =============================================================================

/// Counters collected over one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub replacements: u64,
    pub refills: u64,
}

/// Drives the matcher over an input stream and writes the substituted stream.
pub struct StreamScanner<'e, R, W> {
    tree: &'e SearchTree,
    keys: &'e KeyTable,
    input: R,
    output: W,
    cursor: StreamCursor,
}

impl<'e, R: Read, W: Write> StreamScanner<'e, R, W> {
    /// Fails with [`EngineError::BufferTooSmall`] when `capacity` cannot hold
    /// two copies of the longest key of `tree`.
    pub fn new(
        tree: &'e SearchTree,
        keys: &'e KeyTable,
        input: R,
        output: W,
        capacity: usize,
    ) -> Result<Self> {
        let required = min_capacity(tree.longest_key_len());
        if capacity < required {
            return Err(EngineError::BufferTooSmall { capacity, required });
        }
        Ok(Self {
            tree,
            keys,
            input,
            output,
            cursor: StreamCursor::with_capacity(capacity),
        })
    }

    /// Scan the input to the end, then flush the output.
    ///
    /// Output written before an I/O error is left in the sink.
    pub fn run(self) -> Result<ScanStats> {
        let Self {
            tree,
            keys,
            mut input,
            mut output,
            mut cursor,
        } = self;
        let mut stats = ScanStats::default();

        // Start of the pending run of copied bytes.
        let mut copy_from = cursor.pos();

        loop {
            if cursor.needs_refill() {
                emit(&mut output, cursor.slice(copy_from, cursor.pos()), &mut stats)?;
                let read = cursor.refill(&mut input)?;
                stats.bytes_read += read as u64;
                stats.refills += 1;
                copy_from = cursor.pos();
                tracing::trace!(read, len = cursor.len(), eof = cursor.is_eof(), "Buffer refilled");
            }

            if cursor.is_done() {
                break;
            }

            match tree.match_at(cursor.window(), usize::MAX) {
                Some(m) => {
                    emit(&mut output, cursor.slice(copy_from, cursor.pos()), &mut stats)?;
                    emit(&mut output, keys.value(m.key_id), &mut stats)?;
                    stats.replacements += 1;
                    cursor.advance(m.len);
                    copy_from = cursor.pos();
                }
                None => cursor.advance(1),
            }
        }

        emit(&mut output, cursor.slice(copy_from, cursor.pos()), &mut stats)?;
        output.flush()?;

        tracing::debug!(
            bytes_read = stats.bytes_read,
            bytes_written = stats.bytes_written,
            replacements = stats.replacements,
            refills = stats.refills,
            "Scan finished"
        );
        Ok(stats)
    }
}

#[inline]
fn emit<W: Write>(output: &mut W, bytes: &[u8], stats: &mut ScanStats) -> Result<()> {
    if !bytes.is_empty() {
        output.write_all(bytes)?;
        stats.bytes_written += bytes.len() as u64;
    }
    Ok(())
}

/// Smallest legal look-ahead capacity for keys up to `longest_key_len` bytes.
#[inline]
pub fn min_capacity(longest_key_len: usize) -> usize {
    (2 * longest_key_len).max(2)
}

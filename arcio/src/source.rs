//! Byte-counting input with support for pushing bytes back.
//!
//! Everything that reads ARC data does so through a [`ByteSource`], which keeps an exact count of
//! the bytes handed out so that record offsets and lengths can be tracked, and allows a bounded
//! number of bytes to be returned to the input when a parser looks ahead and decides the data is
//! not what it was looking for.

use std::cmp;
use std::io::{self, BufRead, Read};

use buf_redux::{BufReader, Buffer};

/// Default capacity of the read-ahead buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8 << 10;

/// A buffered reader that counts consumed bytes and supports pushback.
///
/// Bytes returned with [`unread`](Self::unread) are yielded again before any more data is taken
/// from the underlying reader, and un-count themselves from [`consumed`](Self::consumed). At most
/// `pushback_size` bytes (fixed at construction) may be pushed back at any time.
///
/// ```
/// # use arcio::source::ByteSource;
/// use std::io::Read;
///
/// let mut source = ByteSource::new(&b"filedesc://x.arc\nrest"[..], 16);
/// assert_eq!(source.read_line().unwrap().as_deref(), Some("filedesc://x.arc"));
/// assert_eq!(source.consumed(), 17);
///
/// let mut buf = [0u8; 4];
/// source.read_exact(&mut buf).unwrap();
/// source.unread(&buf).unwrap();
/// assert_eq!(source.consumed(), 17);
/// ```
#[derive(Debug)]
pub struct ByteSource<R> {
    inner: BufReader<R>,
    /// Pushed-back bytes occupy `pushback[pushback_pos..]`.
    pushback: Box<[u8]>,
    pushback_pos: usize,
    consumed: u64,
    counter: u64,
}

impl<R: Read> ByteSource<R> {
    /// Wrap a reader, allocating a new read-ahead buffer.
    pub fn new(inner: R, pushback_size: usize) -> Self {
        Self::with_buffer(Buffer::with_capacity(DEFAULT_BUFFER_SIZE), inner, pushback_size)
    }

    /// Wrap a reader using a caller-provided buffer, which may be recovered with
    /// [`into_inner_with_buffer`](Self::into_inner_with_buffer) for reuse.
    pub fn with_buffer(mut buffer: Buffer, inner: R, pushback_size: usize) -> Self {
        buffer.clear();
        ByteSource {
            inner: BufReader::with_buffer(buffer, inner),
            pushback: vec![0u8; pushback_size].into_boxed_slice(),
            pushback_pos: pushback_size,
            consumed: 0,
            counter: 0,
        }
    }

    /// The maximum number of bytes that may be pushed back.
    pub fn pushback_size(&self) -> usize {
        self.pushback.len()
    }

    /// The total number of bytes read from this source, less any that were pushed back.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// The value of the local counter, which advances with [`consumed`](Self::consumed) but can
    /// be reset to measure the bytes read since some point of interest.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn set_counter(&mut self, value: u64) {
        self.counter = value;
    }

    fn pushed_back(&self) -> usize {
        self.pushback.len() - self.pushback_pos
    }

    fn count(&mut self, n: usize) {
        self.consumed += n as u64;
        self.counter += n as u64;
    }

    /// Read a single byte, or `None` at end of input.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.fill_buf()?.first() {
            Some(&b) => b,
            None => return Ok(None),
        };
        self.consume(1);
        Ok(Some(byte))
    }

    /// Push bytes back onto the input, to be read again before anything else.
    ///
    /// Fails if the bytes do not fit in the remaining pushback space.
    pub fn unread(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.len() > self.pushback_pos {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "pushback buffer is full: cannot unread {} bytes with {} of {} in use",
                    bytes.len(),
                    self.pushed_back(),
                    self.pushback.len()
                ),
            ));
        }

        let start = self.pushback_pos - bytes.len();
        self.pushback[start..self.pushback_pos].copy_from_slice(bytes);
        self.pushback_pos = start;
        self.consumed -= bytes.len() as u64;
        self.counter = self.counter.saturating_sub(bytes.len() as u64);
        Ok(())
    }

    /// Read one line as bytes, up to and including `\n`.
    ///
    /// The returned line excludes the `\n` terminator and any `\r` immediately preceding it.
    /// Returns `None` if the input was already at its end; a final line without a terminator is
    /// returned as-is.
    pub fn read_line_bytes(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let mut read_any = false;

        loop {
            let (used, terminated) = {
                let buf = self.fill_buf()?;
                if buf.is_empty() {
                    break;
                }
                match buf.iter().position(|&b| b == b'\n') {
                    Some(i) => {
                        line.extend_from_slice(&buf[..i]);
                        (i + 1, true)
                    }
                    None => {
                        line.extend_from_slice(buf);
                        (buf.len(), false)
                    }
                }
            };
            read_any = true;
            self.consume(used);
            if terminated {
                break;
            }
        }

        if !read_any {
            return Ok(None);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Read one line as a string, replacing invalid UTF-8 sequences.
    ///
    /// See [`read_line_bytes`](Self::read_line_bytes) for handling of line terminators.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self
            .read_line_bytes()?
            .map(|line| String::from_utf8_lossy(&line).into_owned()))
    }

    /// Read until `buf` is full or the input ends, returning the number of bytes read.
    ///
    /// If the buffer could not be filled, every byte that was read is pushed back so the input
    /// is left as it was.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled < buf.len() {
            self.unread(&buf[..filled])?;
        }
        Ok(filled)
    }

    /// Fill `buf` from the input without consuming anything.
    pub fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_fully(buf)?;
        if n == buf.len() {
            self.unread(&buf[..n])?;
        }
        Ok(n)
    }

    /// Discard up to `n` bytes, returning the number actually skipped.
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        let mut remaining = n;
        while remaining > 0 {
            let available = self.fill_buf()?.len();
            if available == 0 {
                break;
            }
            let take = cmp::min(available as u64, remaining) as usize;
            self.consume(take);
            remaining -= take as u64;
        }
        Ok(n - remaining)
    }

    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }

    /// Unwrap the underlying reader, returning the read-ahead buffer for reuse.
    ///
    /// Buffered and pushed-back bytes are discarded.
    pub fn into_inner_with_buffer(self) -> (R, Buffer) {
        if self.pushed_back() > 0 {
            debug!(
                "discarding {} pushed-back bytes when unwrapping source",
                self.pushed_back()
            );
        }
        self.inner.into_inner_with_buffer()
    }
}

impl<R: Read> Read for ByteSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = if self.pushed_back() > 0 {
            let n = cmp::min(buf.len(), self.pushed_back());
            let end = self.pushback_pos + n;
            buf[..n].copy_from_slice(&self.pushback[self.pushback_pos..end]);
            self.pushback_pos = end;
            n
        } else {
            self.inner.read(buf)?
        };
        self.count(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for ByteSource<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pushed_back() > 0 {
            return Ok(&self.pushback[self.pushback_pos..]);
        }
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if self.pushed_back() > 0 {
            debug_assert!(amt <= self.pushed_back());
            self.pushback_pos += amt;
        } else {
            self.inner.consume(amt);
        }
        self.count(amt);
    }
}

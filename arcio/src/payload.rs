//! Framing of record content.
//!
//! The content of a record is exactly as long as its header declares. [`FixedLengthStream`]
//! enforces that boundary over the record's input, and [`Payload`] layers lookahead and digesting
//! on top of it.

use std::cmp;
use std::io::{self, BufRead, Read};

use buf_redux::Buffer;

use crate::digest::{Digest, Digester};
use crate::source::ByteSource;

/// The number of bytes to skip per read() call when closing a stream.
///
/// Larger values require more memory but will reduce overhead.
const SKIP_BUF_LEN: usize = 4096;

/// A reader over exactly `length` bytes of an underlying reader.
///
/// Reads never return bytes beyond the declared length. If the underlying reader ends early,
/// the shortfall is reported by [`unavailable`](Self::unavailable) rather than as an error.
/// Every byte that passes through the stream is fed to the block digester, if there is one.
#[derive(Debug)]
pub struct FixedLengthStream<R> {
    inner: R,
    length: u64,
    remaining: u64,
    unavailable: u64,
    digester: Option<Digester>,
    closed: bool,
}

impl<R: Read> FixedLengthStream<R> {
    pub fn new(inner: R, length: u64, digester: Option<Digester>) -> Self {
        FixedLengthStream {
            inner,
            length,
            remaining: length,
            unavailable: 0,
            digester,
            closed: false,
        }
    }

    /// The declared length of the stream.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.length
    }

    /// The number of bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// The number of bytes that could not be read because the underlying reader ended.
    pub fn unavailable(&self) -> u64 {
        self.unavailable
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read and discard any remaining bytes.
    ///
    /// Afterwards the underlying reader has advanced by exactly the declared length, unless it
    /// ended first. Closing more than once has no effect.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }

        let mut buf = [0u8; SKIP_BUF_LEN];
        while self.remaining > 0 {
            if self.read(&mut buf)? == 0 {
                break;
            }
        }
        if self.remaining > 0 {
            trace!("fixed-length stream closing with {} bytes unread", self.remaining);
        }
        self.closed = true;
        Ok(())
    }

    /// Finish the block digest.
    ///
    /// The stream is closed first so that the digest covers all of the declared bytes. Returns
    /// `None` if there is no digester or it was already taken.
    pub fn take_digest(&mut self) -> io::Result<Option<Digest>> {
        self.close()?;
        Ok(self.digester.take().map(Digester::finalize))
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for FixedLengthStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let limit = cmp::min(buf.len() as u64, self.remaining) as usize;
        let n = self.inner.read(&mut buf[..limit])?;
        if n == 0 {
            debug!(
                "input ended with {} of {} declared bytes unread",
                self.remaining, self.length
            );
            self.unavailable = self.remaining;
            self.remaining = 0;
            return Ok(0);
        }

        if let Some(ref mut digester) = self.digester {
            digester.update(&buf[..n]);
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// What remains of a [`Payload`] once it has been closed.
#[derive(Debug)]
pub struct ClosedPayload<R> {
    /// The reader the payload was read from, positioned after the declared content.
    pub inner: R,
    /// The buffer used by the payload, for reuse.
    pub buffer: Buffer,
    /// The number of declared bytes that were missing from the input.
    pub unavailable: u64,
    pub block_digest: Option<Digest>,
    pub payload_digest: Option<Digest>,
}

/// The content of a record.
///
/// Reading from a payload yields the declared content of the record, less anything already
/// consumed through [`source_mut`](Self::source_mut) by parsers of embedded structure (such as
/// an HTTP header). Once a payload digest has been started with
/// [`start_payload_digest`](Self::start_payload_digest), every byte subsequently read is
/// included in it, as are any bytes skipped when the payload is closed.
#[derive(Debug)]
pub struct Payload<R: Read> {
    source: ByteSource<FixedLengthStream<R>>,
    payload_digester: Option<Digester>,
}

impl<R: Read> Payload<R> {
    /// Frame `length` bytes of `inner`.
    ///
    /// `pushback_size` limits how far parsers may look ahead in the payload.
    pub fn new(
        inner: R,
        length: u64,
        block_digester: Option<Digester>,
        buffer: Buffer,
        pushback_size: usize,
    ) -> Self {
        Payload {
            source: ByteSource::with_buffer(
                buffer,
                FixedLengthStream::new(inner, length, block_digester),
                pushback_size,
            ),
            payload_digester: None,
        }
    }

    /// Access the payload's source, for parsing structures embedded in the content.
    ///
    /// Bytes read here are not included in the payload digest.
    pub fn source_mut(&mut self) -> &mut ByteSource<FixedLengthStream<R>> {
        &mut self.source
    }

    /// The declared length of the record content.
    pub fn declared_length(&self) -> u64 {
        self.source.get_ref().len()
    }

    /// The number of content bytes consumed so far.
    pub fn consumed(&self) -> u64 {
        self.source.consumed()
    }

    /// The number of content bytes not yet consumed, assuming the input is complete.
    pub fn remaining(&self) -> u64 {
        self.declared_length().saturating_sub(self.consumed())
    }

    /// Begin digesting all remaining content.
    pub fn start_payload_digest(&mut self, digester: Digester) {
        debug_assert!(self.payload_digester.is_none());
        self.payload_digester = Some(digester);
    }

    /// Read and discard the rest of the content, then finish digests.
    pub fn close(mut self) -> io::Result<ClosedPayload<R>> {
        loop {
            let n = {
                let buf = self.source.fill_buf()?;
                if buf.is_empty() {
                    break;
                }
                if let Some(ref mut digester) = self.payload_digester {
                    digester.update(buf);
                }
                buf.len()
            };
            self.source.consume(n);
        }

        let payload_digest = self.payload_digester.take().map(Digester::finalize);
        let (mut stream, buffer) = self.source.into_inner_with_buffer();
        let block_digest = stream.take_digest()?;
        Ok(ClosedPayload {
            unavailable: stream.unavailable(),
            inner: stream.into_inner(),
            buffer,
            block_digest,
            payload_digest,
        })
    }
}

impl<R: Read> Read for Payload<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.source.read(buf)?;
        if let Some(ref mut digester) = self.payload_digester {
            digester.update(&buf[..n]);
        }
        Ok(n)
    }
}

impl<R: Read> BufRead for Payload<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.source.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if let Some(ref mut digester) = self.payload_digester {
            // The buffer is unchanged since the caller's fill_buf, so this does no I/O.
            if let Ok(buf) = self.source.fill_buf() {
                digester.update(&buf[..cmp::min(amt, buf.len())]);
            }
        }
        self.source.consume(amt);
    }
}

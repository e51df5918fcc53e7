//! Handling of record compression.
//!
//! ARC files can be compressed, but the structure of the compressed data must be managed
//! to ensure a record can be accessed without decompressing every previous one in a file
//! (which may contain many records).
//!
//! Compressed ARC files (conventionally named `*.arc.gz`) hold each record in its own gzip
//! member. Provided the file offset of a member is known, a reading tool can read the record it
//! holds alone; if records were not compressed individually, readers would need to decompress
//! every preceding record in a file in order to reach a desired one.

use std::io::{Read, Result as IoResult, Write};
use std::path::Path;

use flate2::write::GzEncoder;

use crate::source::ByteSource;

/// The first bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The number of bytes that must be pushed back to [`sniff`](Compression::sniff) a stream.
pub const SNIFF_LENGTH: usize = crate::FILEDESC_PREFIX.len();

/// The supported methods of compressing a single [`ArcRecord`](crate::ArcRecord).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Compression {
    /// Uncompressed data
    None,
    /// `gzip` compression, with one gzip member per record
    Gzip,
}

impl Compression {
    /// Return the best guess of compression to be used for a file with the given name.
    ///
    /// A file that may be present is not accessed in any way; only the path is used to guess based
    /// on the name.
    ///
    /// ```
    /// # use arcio::Compression;
    /// assert_eq!(Compression::guess_for_filename("IA-001102.arc.gz"), Compression::Gzip);
    /// assert_eq!(Compression::guess_for_filename("IA-001102.arc"), Compression::None);
    /// ```
    pub fn guess_for_filename<P: AsRef<Path>>(path: P) -> Compression {
        match path.as_ref().extension() {
            Some(ext) if ext == "gz" => Compression::Gzip,
            _ => Compression::None,
        }
    }

    /// Determine the compression of a stream from the data at its current position.
    ///
    /// Up to [`SNIFF_LENGTH`] bytes are peeked from `source`, which must be able to push back
    /// that many; no data is consumed.
    pub fn sniff<R: Read>(source: &mut ByteSource<R>) -> IoResult<Compression> {
        let mut start = [0u8; SNIFF_LENGTH];
        let n = source.peek(&mut start)?;
        let start = &start[..n];

        if is_gzip(start) {
            Ok(Compression::Gzip)
        } else {
            if !is_arc(start) {
                debug!("uncompressed stream does not begin with a version block");
            }
            Ok(Compression::None)
        }
    }
}

/// Return `true` if `data` begins with a gzip member header.
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Return `true` if `data` looks like the start of an uncompressed ARC file.
pub fn is_arc(data: &[u8]) -> bool {
    data.starts_with(crate::FILEDESC_PREFIX.as_bytes())
}

/// Writes to an output stream with specified [`Compression`].
pub enum Writer<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Writer<W> {
    /// Construct a writer to the given adapter with the given compression mode.
    pub fn new(dest: W, mode: Compression) -> Self {
        match mode {
            Compression::None => Self::Plain(dest),
            Compression::Gzip => Self::Gzip(GzEncoder::new(dest, flate2::Compression::best())),
        }
    }

    /// Gracefully close the writer (terminating a compressed stream) and return the output stream.
    pub fn finish(self) -> IoResult<W> {
        match self {
            Self::Plain(w) => Ok(w),
            Self::Gzip(gz) => gz.finish(),
        }
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        match self {
            Writer::Plain(w) => w.write(buf),
            Writer::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> IoResult<()> {
        match self {
            Writer::Plain(w) => w.flush(),
            Writer::Gzip(w) => w.flush(),
        }
    }
}

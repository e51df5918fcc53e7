//! Tools for reading, validating and writing ARC (Internet Archive ARC) files.
//!
//! ## Background
//!
//! ARC is the container format used by the Internet Archive to store web crawls before WARC was
//! standardized. An ARC file is a simple concatenation of records, the first of which is a
//! *version block* describing the file itself, followed by any number of URL records each holding
//! one archived resource. Many large web archives still hold data in this format.
//!
//! ## ARC structure
//!
//! Every record begins with a single header line of space-separated fields. The number of fields
//! determines the record layout: version 1 records have five fields and version 2 records have
//! ten. A `-` in any position means the value is absent. The final field is the length of the
//! record content, which is followed by exactly one newline.
//!
//! ```text
//! filedesc://IA-001102.arc 0.0.0.0 19960923142103 text/plain 76
//! 1 0 Alexa Internet
//! URL IP-address Archive-date Content-type Archive-length
//!
//! http://www.dryswamp.edu:80/index.html 127.10.100.2 19961104142103 text/html 202
//! HTTP/1.0 200 Document follows
//! Date: Mon, 04 Nov 1996 14:21:06 GMT
//! ...
//! ```
//!
//! The version block's content starts with two more lines: the format version and the names of
//! the fields used by the rest of the file. Records with `http` URLs usually hold a complete HTTP
//! response including its header.
//!
//! ## Library structure
//!
//! [`ArcReader`] reads records from a stream (optionally compressed as one gzip member per
//! record), yielding an [`ArcRecord`] for each. A record exposes its parsed [`ArcHeader`], the
//! parsed HTTP header of its content if any, and provides access to the remaining content through
//! [`Read`](std::io::Read). Problems with the data are never fatal: each is recorded as a
//! [`Diagnosis`] in the record's [`Diagnostics`], which are complete once the record is closed.
//! Only I/O errors are returned as errors.
//!
//! [`ArcWriter`] does the opposite, writing records with a small state machine that ensures each
//! record is terminated correctly before the next begins.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

use thiserror::Error;

pub mod compression;
pub mod diagnosis;
pub mod digest;
pub mod field;
pub mod header;
pub mod http;
pub mod payload;
pub mod reader;
pub mod record;
pub mod source;
#[cfg(test)]
mod tests;
pub mod writer;

pub use compression::Compression;
pub use diagnosis::{Diagnosis, DiagnosisKind, DiagnosticTotals, Diagnostics};
pub use digest::{Digest, DigestAlgorithm};
pub use header::{ArcHeader, ArcVersion, VersionHeader};
pub use http::HttpHeader;
pub use reader::{ArcReader, ReaderConfig};
pub use record::{ArcRecord, RecordKind};
pub use writer::{ArcWriter, WriterState};

/// URL scheme identifying a version block.
pub const ARC_SCHEME: &str = "filedesc";
/// The literal prefix of a version block's URL.
pub const FILEDESC_PREFIX: &str = "filedesc://";

/// Number of fields in a version 1 header line.
pub const V1_FIELD_COUNT: usize = 5;
/// Number of fields in a version 2 header line.
pub const V2_FIELD_COUNT: usize = 10;

/// The block description of a version 1 file, naming the fields of every header line.
pub const V1_DESCRIPTION: &str = "URL IP-address Archive-date Content-type Archive-length";
/// The block description of a version 2 file.
pub const V2_DESCRIPTION: &str = "URL IP-address Archive-date Content-type Result-code Checksum \
                                  Location Offset Filename Archive-length";

/// Content type placeholder for records whose type is unknown.
pub const NO_TYPE: &str = "no-type";

/// Default limit on the size of an HTTP header in a record's content.
pub const DEFAULT_HTTP_HEADER_MAX_SIZE: usize = 8192;
/// Default number of bytes that may be pushed back to a source.
pub const DEFAULT_PUSHBACK_SIZE: usize = 32;

/// A fatal error in reading records.
///
/// Problems with the data being read are not errors; they are reported as diagnoses on records.
#[derive(Debug, Error)]
pub enum ReadError {
    /// An I/O error occurred while reading the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Compressed input was expected but the data at the given offset is not a gzip member.
    #[error("data at offset {offset} is not a gzip member")]
    NotGzip { offset: u64 },
}

/// A fatal error in writing records.
#[derive(Debug, Error)]
pub enum WriteError {
    /// An I/O error occurred while writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// An operation was attempted in a writer state that does not permit it.
    #[error("cannot {operation} in writer state {state:?}")]
    IllegalState {
        operation: &'static str,
        state: WriterState,
    },
}

/// An error in configuring a reader or writer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown digest algorithm \"{0}\"")]
    UnknownDigestAlgorithm(String),
}

/// RFC 2616 "separators" class
const SEPARATORS: &[char] = &[
    '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', '{', '}', ' ', '\t',
];

/// RFC 2616 "CTL" class: ASCII chars 0-31 and DEL (127)
const CTL: &[char] = &[
    '\x00', '\x01', '\x02', '\x03', '\x04', '\x05', '\x06', '\x07', '\x08', '\x09', '\x0a', '\x0b',
    '\x0c', '\x0d', '\x0e', '\x0f', '\x10', '\x11', '\x12', '\x13', '\x14', '\x15', '\x16', '\x17',
    '\x18', '\x19', '\x1a', '\x1b', '\x1c', '\x1d', '\x1e', '\x1f', '\x7f',
];

/// Decode bytes as ISO-8859-1, which maps every byte to the code point of the same value.
pub(crate) fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

//! Sequential and random-access reading of ARC streams.

use std::io::{self, BufRead, Read};

use buf_redux::Buffer;
use flate2::bufread::GzDecoder;

use crate::compression::{self, Compression, SNIFF_LENGTH};
use crate::diagnosis::{Diagnosis, DiagnosisKind, DiagnosticTotals, Diagnostics};
use crate::digest::DigestAlgorithm;
use crate::header::ArcHeader;
use crate::record::{ArcRecord, RecordContext, RecordKind};
use crate::source::{ByteSource, DEFAULT_BUFFER_SIZE};
use crate::{ReadError, DEFAULT_HTTP_HEADER_MAX_SIZE, DEFAULT_PUSHBACK_SIZE};

/// Options controlling how records are read.
///
/// ```
/// # use arcio::{DigestAlgorithm, ReaderConfig};
/// let config = ReaderConfig::default()
///     .with_block_digest(Some(DigestAlgorithm::Sha1))
///     .with_digest_encoding("base16");
/// assert!(config.parse_http);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Algorithm used to digest the entire content of each record.
    pub block_digest: Option<DigestAlgorithm>,
    /// Algorithm used to digest the content following the HTTP header of each record.
    pub payload_digest: Option<DigestAlgorithm>,
    /// Text encoding of digests: `base16`, `base32` or `base64`.
    pub digest_encoding: String,
    /// Whether to parse HTTP headers at the start of the content of HTTP records.
    pub parse_http: bool,
    /// The longest HTTP header that will be parsed.
    pub http_header_max_size: usize,
    /// Number of bytes that may be pushed back while reading records.
    pub pushback_size: usize,
    /// Size of read buffers.
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            block_digest: None,
            payload_digest: None,
            digest_encoding: "base32".to_owned(),
            parse_http: true,
            http_header_max_size: DEFAULT_HTTP_HEADER_MAX_SIZE,
            pushback_size: DEFAULT_PUSHBACK_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ReaderConfig {
    pub fn with_block_digest(mut self, algorithm: Option<DigestAlgorithm>) -> Self {
        self.block_digest = algorithm;
        self
    }

    pub fn with_payload_digest(mut self, algorithm: Option<DigestAlgorithm>) -> Self {
        self.payload_digest = algorithm;
        self
    }

    pub fn with_digest_encoding<S: Into<String>>(mut self, encoding: S) -> Self {
        self.digest_encoding = encoding.into();
        self
    }

    pub fn with_parse_http(mut self, parse_http: bool) -> Self {
        self.parse_http = parse_http;
        self
    }

    pub fn with_http_header_max_size(mut self, size: usize) -> Self {
        self.http_header_max_size = size;
        self
    }

    pub fn with_pushback_size(mut self, size: usize) -> Self {
        // at least one byte is needed to check record trailers
        self.pushback_size = std::cmp::max(size, 1);
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

/// The input of a reader, as seen by its records.
///
/// The underlying stream is itself a [`ByteSource`], whose count of consumed bytes gives the
/// offsets of gzip members.
#[derive(Debug)]
pub enum Input<R: BufRead> {
    Plain(ByteSource<R>),
    /// A single gzip member.
    Gzip(GzDecoder<ByteSource<R>>),
}

impl<R: BufRead> Input<R> {
    fn into_stream(self) -> ByteSource<R> {
        match self {
            Input::Plain(r) => r,
            Input::Gzip(r) => r.into_inner(),
        }
    }

    fn stream(&self) -> &ByteSource<R> {
        match self {
            Input::Plain(r) => r,
            Input::Gzip(r) => r.get_ref(),
        }
    }
}

impl<R: BufRead> Read for Input<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::Plain(r) => r.read(buf),
            Input::Gzip(r) => r.read(buf),
        }
    }
}

#[derive(Debug, Default)]
struct StreamState {
    records: u64,
    version_block_seen: bool,
    /// Header line layout declared by the version block.
    layout: Option<u8>,
}

/// Reads records from an ARC stream.
///
/// Records are read one at a time with [`next_record`](Self::next_record); each borrows the
/// reader, so a record must be closed (or dropped) before the next can be read.
///
/// ```
/// # use arcio::{ArcReader, Compression};
/// # use std::io::Read;
/// let data = b"filedesc://x.arc 0.0.0.0 20111224193000 text/plain 62\n\
///              1 0 x\n\
///              URL IP-address Archive-date Content-type Archive-length\n\
///              \n\
///              dns:example.com 192.0.2.1 20111224193001 text/dns 7\n\
///              a dns!\n\n";
/// let mut reader = ArcReader::new(&data[..], Compression::None);
///
/// let version_block = reader.next_record().unwrap().unwrap();
/// assert!(version_block.is_version_block());
/// drop(version_block);
///
/// let mut record = reader.next_record().unwrap().unwrap();
/// let mut content = String::new();
/// record.read_to_string(&mut content).unwrap();
/// assert_eq!(content, "a dns!\n");
/// record.close().unwrap();
/// assert_eq!(record.is_compliant(), Some(true));
/// drop(record);
///
/// assert!(reader.next_record().unwrap().is_none());
/// assert_eq!(reader.totals().noncompliant, 0);
/// ```
#[derive(Debug)]
pub struct ArcReader<R: BufRead> {
    source: Option<ByteSource<Input<R>>>,
    compression: Compression,
    config: ReaderConfig,
    /// Offset of the start of the input in the containing stream.
    base_offset: u64,
    /// Offset of the current gzip member.
    member_offset: u64,
    totals: DiagnosticTotals,
    diagnostics: Diagnostics,
    spare_buffer: Option<Buffer>,
    state: StreamState,
}

impl<R: BufRead> ArcReader<R> {
    /// Read a stream from its start with the default configuration.
    pub fn new(reader: R, compression: Compression) -> Self {
        Self::with_config(reader, compression, ReaderConfig::default())
    }

    pub fn with_config(reader: R, compression: Compression, config: ReaderConfig) -> Self {
        Self::at_offset(reader, compression, 0, config)
    }

    /// Read a stream from its start, detecting whether it is compressed.
    pub fn sniffed(reader: R, config: ReaderConfig) -> io::Result<Self> {
        let mut stream = Self::stream_source(reader);
        let compression = Compression::sniff(&mut stream)?;
        debug!("detected compression {:?}", compression);
        Ok(Self::from_stream(stream, compression, 0, config))
    }

    /// Read records from a reader positioned at `offset` in a stream.
    ///
    /// This allows records to be read directly given their offset (with compressed input, the
    /// offset of a gzip member) without reading the preceding data. Offsets of the records read
    /// are relative to the start of the stream.
    pub fn at_offset(reader: R, compression: Compression, offset: u64, config: ReaderConfig) -> Self {
        Self::from_stream(Self::stream_source(reader), compression, offset, config)
    }

    fn stream_source(reader: R) -> ByteSource<R> {
        ByteSource::new(reader, SNIFF_LENGTH)
    }

    fn from_stream(
        stream: ByteSource<R>,
        compression: Compression,
        offset: u64,
        config: ReaderConfig,
    ) -> Self {
        let source = ByteSource::with_buffer(
            Buffer::with_capacity(config.buffer_size),
            Input::Plain(stream),
            config.pushback_size,
        );

        ArcReader {
            source: Some(source),
            compression,
            config,
            base_offset: offset,
            member_offset: offset,
            totals: Default::default(),
            diagnostics: Diagnostics::new(),
            spare_buffer: None,
            state: Default::default(),
        }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Counts of diagnoses over all records closed so far.
    pub fn totals(&self) -> &DiagnosticTotals {
        &self.totals
    }

    /// Diagnoses about data that is not part of any record, such as garbage at the end of the
    /// stream.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The current offset in the stream.
    pub fn position(&self) -> u64 {
        match (&self.source, self.compression) {
            (None, _) => self.base_offset,
            (Some(source), Compression::None) => self.base_offset + source.consumed(),
            (Some(source), Compression::Gzip) => {
                self.base_offset + source.get_ref().stream().consumed()
            }
        }
    }

    /// Unwrap the underlying reader.
    ///
    /// Any data buffered by the reader is lost.
    pub fn into_inner(self) -> Option<R> {
        self.source.map(|source| {
            let (input, _) = source.into_inner_with_buffer();
            input.into_stream().into_inner_with_buffer().0
        })
    }

    /// Get the next record in the stream, or `None` if there are no more.
    pub fn next_record(&mut self) -> Result<Option<ArcRecord<'_, Input<R>>>, ReadError> {
        let member = self.compression == Compression::Gzip;
        let mut diagnostics = Diagnostics::new();

        let mut header = loop {
            if member && !self.next_member()? {
                self.end_of_stream(diagnostics);
                return Ok(None);
            }
            let source = match self.source.as_mut() {
                Some(source) => source,
                None => return Ok(None),
            };

            match ArcHeader::read_from(source, &mut diagnostics)? {
                Some(header) => break header,
                // a member without a record
                None if member => continue,
                None => {
                    self.end_of_stream(diagnostics);
                    return Ok(None);
                }
            }
        };

        header.start_offset = if member {
            self.member_offset
        } else {
            self.base_offset + header.start_offset
        };
        self.check_sequence(&header, &mut diagnostics);

        let ArcReader {
            source,
            config,
            totals,
            spare_buffer,
            state,
            ..
        } = self;
        let source = match source.as_mut() {
            Some(source) => source,
            None => return Ok(None),
        };
        let record = ArcRecord::open(
            source,
            header,
            diagnostics,
            RecordContext {
                config,
                totals,
                spare_buffer,
                member,
            },
        )?;
        if let RecordKind::VersionBlock(version) = record.kind() {
            state.layout = Some(version.record_field_version);
        }
        Ok(Some(record))
    }

    /// Check the position of a record in the stream.
    fn check_sequence(&mut self, header: &ArcHeader, diagnostics: &mut Diagnostics) {
        let at_stream_start = self.state.records == 0 && self.base_offset == 0;
        self.state.records += 1;

        if header.is_version_block() {
            if self.state.version_block_seen {
                warn!("duplicate version block at offset {}", header.start_offset);
                diagnostics.add_error(Diagnosis::new(DiagnosisKind::Duplicate, "version block", &[]));
            }
            self.state.version_block_seen = true;
            return;
        }

        if at_stream_start {
            warn!("stream does not begin with a version block");
            diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::ErrorExpected,
                "version block",
                &[],
            ));
        }
        if let Some(layout) = self.state.layout {
            if header.record_field_version != layout {
                diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::InvalidExpected,
                    "record field version",
                    &[
                        header.record_field_version.to_string().as_str(),
                        layout.to_string().as_str(),
                    ],
                ));
            }
        }
    }

    /// Advance to the next gzip member, returning `false` if the input has ended.
    fn next_member(&mut self) -> Result<bool, ReadError> {
        let source = match self.source.take() {
            Some(source) => source,
            None => return Ok(false),
        };
        let pushback_size = source.pushback_size();
        let (input, buffer) = source.into_inner_with_buffer();
        let mut stream = input.into_stream();
        let offset = self.base_offset + stream.consumed();

        let mut magic = [0u8; 2];
        let peeked = match stream.peek(&mut magic) {
            Ok(n) => n,
            Err(e) => {
                self.source = Some(ByteSource::with_buffer(buffer, Input::Plain(stream), pushback_size));
                return Err(e.into());
            }
        };

        if peeked == 0 || !compression::is_gzip(&magic[..peeked]) {
            self.source = Some(ByteSource::with_buffer(buffer, Input::Plain(stream), pushback_size));
            if peeked == 0 {
                return Ok(false);
            }
            return Err(ReadError::NotGzip { offset });
        }

        trace!("reading gzip member at offset {}", offset);
        self.member_offset = offset;
        self.source = Some(ByteSource::with_buffer(
            buffer,
            Input::Gzip(GzDecoder::new(stream)),
            pushback_size,
        ));
        Ok(true)
    }

    fn end_of_stream(&mut self, diagnostics: Diagnostics) {
        if diagnostics.is_empty() {
            return;
        }
        warn!("data following the last record in stream");
        for d in diagnostics.errors() {
            self.diagnostics.add_error(d.clone());
        }
        for d in diagnostics.warnings() {
            self.diagnostics.add_warning(d.clone());
        }
    }
}

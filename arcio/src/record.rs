//! Operations on complete ARC records.

use std::io::{self, BufRead, Read};

use buf_redux::Buffer;

use crate::diagnosis::{Diagnosis, DiagnosisKind, DiagnosticTotals, Diagnostics};
use crate::digest::{Digest, DigestAlgorithm};
use crate::header::{ArcHeader, VersionHeader};
use crate::http::HttpHeader;
use crate::payload::{ClosedPayload, Payload};
use crate::reader::ReaderConfig;
use crate::source::ByteSource;
use crate::NO_TYPE;

/// What a record is, beyond its header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    /// The version block at the start of a file.
    VersionBlock(VersionHeader),
    /// A record holding an archived resource.
    Data,
}

/// The parts of a reader that a record uses while it is open.
pub(crate) struct RecordContext<'a> {
    pub config: &'a ReaderConfig,
    pub totals: &'a mut DiagnosticTotals,
    pub spare_buffer: &'a mut Option<Buffer>,
    /// The input ends where the record does, as with a gzip member.
    pub member: bool,
}

/// A streaming ARC record.
///
/// The header of the record is accessible via the [`Self::header`] method, and its
/// content is accessible through the [`Read`] impl. For records with an HTTP header, which
/// is available from [`Self::http_header`], reading yields only the content following the HTTP
/// header; for version blocks, reading yields whatever follows the version lines.
///
/// When done reading, call [`Self::close`] to advance the underlying reader past this record
/// and complete its diagnostics. This also automatically happens when the record is dropped,
/// but any I/O error is then only logged, so you should explicitly call [`Self::close`] if you
/// wish to handle I/O errors at that point.
pub struct ArcRecord<'a, S: Read> {
    header: ArcHeader,
    kind: RecordKind,
    diagnostics: Diagnostics,
    http: Option<HttpHeader>,
    payload: Option<Payload<&'a mut ByteSource<S>>>,
    context: RecordContext<'a>,
    /// Position of the source at the start of the header line.
    source_start: u64,
    payload_length: u64,
    consumed: u64,
    unavailable: u64,
    block_digest: Option<Digest>,
    payload_digest: Option<Digest>,
    compliant: Option<bool>,
    closed: bool,
}

impl<'a, S: Read> ArcRecord<'a, S> {
    /// Begin a record whose header line has just been read from `source`.
    ///
    /// Structure at the start of the content (version lines or an HTTP header) is parsed
    /// immediately.
    pub(crate) fn open(
        source: &'a mut ByteSource<S>,
        header: ArcHeader,
        mut diagnostics: Diagnostics,
        context: RecordContext<'a>,
    ) -> io::Result<Self> {
        let config = context.config;
        let declared = header.declared_length();
        let source_start = source.consumed().saturating_sub(header.header_length);
        let block_digester = config.block_digest.map(DigestAlgorithm::digester);
        let buffer = context
            .spare_buffer
            .take()
            .unwrap_or_else(|| Buffer::with_capacity(config.buffer_size));

        let mut http = None;
        let (kind, payload) = if header.is_version_block() {
            VersionHeader::validate_header(&header, &mut diagnostics);
            let mut payload =
                Payload::new(source, declared, block_digester, buffer, config.pushback_size);
            let version = VersionHeader::read_from(payload.source_mut(), &mut diagnostics)?;
            (RecordKind::VersionBlock(version), payload)
        } else {
            let expects_http = config.parse_http
                && matches!(header.url_scheme.as_deref(), Some("http") | Some("https"))
                && header.content_type.value_str() != Some(NO_TYPE);
            let pushback_size = if expects_http {
                std::cmp::max(config.http_header_max_size, config.pushback_size)
            } else {
                config.pushback_size
            };
            let mut payload = Payload::new(source, declared, block_digester, buffer, pushback_size);

            if expects_http && declared == 0 {
                diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::Invalid,
                    "payload",
                    &["expected payload not found"],
                ));
            } else if expects_http {
                match HttpHeader::parse(payload.source_mut(), declared, &mut diagnostics)? {
                    Some(parsed) => {
                        if let Some(algorithm) = config.payload_digest {
                            payload.start_payload_digest(algorithm.digester());
                        }
                        http = Some(parsed);
                    }
                    None => diagnostics.add_error(Diagnosis::new(
                        DiagnosisKind::Error,
                        "HTTP header",
                        &["unable to parse HTTP header"],
                    )),
                }
            }
            (RecordKind::Data, payload)
        };

        trace!(
            "opened {} record at {} with {} declared bytes",
            if let RecordKind::Data = kind { "data" } else { "version block" },
            header.start_offset,
            declared
        );
        Ok(ArcRecord {
            payload_length: payload.remaining(),
            header,
            kind,
            diagnostics,
            http,
            payload: Some(payload),
            context,
            source_start,
            consumed: 0,
            unavailable: 0,
            block_digest: None,
            payload_digest: None,
            compliant: None,
            closed: false,
        })
    }

    pub fn header(&self) -> &ArcHeader {
        &self.header
    }

    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// The version lines, if this is a version block.
    pub fn version_header(&self) -> Option<&VersionHeader> {
        match self.kind {
            RecordKind::VersionBlock(ref version) => Some(version),
            RecordKind::Data => None,
        }
    }

    pub fn is_version_block(&self) -> bool {
        self.version_header().is_some()
    }

    /// The HTTP header at the start of the content, if there was one.
    pub fn http_header(&self) -> Option<&HttpHeader> {
        self.http.as_ref()
    }

    /// Offset of the record in the containing stream; see [`ArcHeader::start_offset`].
    pub fn start_offset(&self) -> u64 {
        self.header.start_offset
    }

    /// The number of bytes readable from the record, which excludes any parsed version lines or
    /// HTTP header.
    pub fn payload_length(&self) -> u64 {
        self.payload_length
    }

    /// The diagnostics of the record, which are only complete once it has been closed.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the record has no errors or warnings, available once it has been closed.
    pub fn is_compliant(&self) -> Option<bool> {
        self.compliant
    }

    /// The number of bytes of input occupied by the record, available once it has been closed.
    ///
    /// This is the length of the header line, the declared content and the trailing newline(s),
    /// less any bytes missing from truncated input.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// The number of declared content bytes missing from the input.
    pub fn unavailable(&self) -> u64 {
        self.unavailable
    }

    /// The digest of the entire declared content, available once the record has been closed.
    pub fn block_digest(&self) -> Option<&Digest> {
        self.block_digest.as_ref()
    }

    /// The digest of the content following the HTTP header, available once the record has
    /// been closed.
    pub fn payload_digest(&self) -> Option<&Digest> {
        self.payload_digest.as_ref()
    }

    /// Advance the input past this record and complete its diagnostics.
    ///
    /// Any unread content is skipped, then the trailing newline is checked. Closing more than
    /// once has no effect.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let payload = match self.payload.take() {
            Some(payload) => payload,
            None => return Ok(()),
        };
        let ClosedPayload {
            inner: source,
            buffer,
            unavailable,
            mut block_digest,
            mut payload_digest,
        } = payload.close()?;
        *self.context.spare_buffer = Some(buffer);

        self.unavailable = unavailable;
        if unavailable > 0 {
            self.diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::Invalid,
                "payload",
                &["Payload truncated", unavailable.to_string().as_str()],
            ));
        }

        let encoding = self.context.config.digest_encoding.as_str();
        let mut known_encoding = true;
        for digest in block_digest.iter_mut().chain(payload_digest.iter_mut()) {
            known_encoding &= digest.encode(encoding);
        }
        if !known_encoding {
            self.diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::Invalid,
                "digest encoding",
                &[encoding],
            ));
        }
        self.block_digest = block_digest;
        self.payload_digest = payload_digest;

        // A truncated record has no trailer to check
        if unavailable == 0 {
            check_trailing_newlines(source, &mut self.diagnostics)?;
        }

        if self.context.member {
            let extra = source.skip(u64::MAX)?;
            if extra > 0 {
                trace!("skipped {} bytes following record in gzip member", extra);
                self.diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::UndesiredData,
                    "gzip member",
                    &[extra.to_string().as_str()],
                ));
            }
        }

        self.consumed = source.consumed() - self.source_start;
        self.compliant = Some(self.diagnostics.is_empty());
        self.context.totals.fold(&self.diagnostics);
        debug!(
            "closed record at {} ({} bytes, {} errors, {} warnings)",
            self.header.start_offset,
            self.consumed,
            self.diagnostics.errors().len(),
            self.diagnostics.warnings().len()
        );
        Ok(())
    }
}

/// Consume the newlines following a record's content, expecting exactly one.
fn check_trailing_newlines<S: Read>(
    source: &mut ByteSource<S>,
    diagnostics: &mut Diagnostics,
) -> io::Result<()> {
    let mut newlines = 0u64;
    let mut carriage_return = false;
    loop {
        match source.read_byte()? {
            Some(b'\n') => newlines += 1,
            Some(b'\r') => carriage_return = true,
            Some(b) => {
                source.unread(&[b])?;
                break;
            }
            None => break,
        }
    }

    if newlines != 1 {
        diagnostics.add_error(Diagnosis::new(
            DiagnosisKind::InvalidExpected,
            "trailing newlines",
            &[newlines.to_string().as_str(), "1"],
        ));
    }
    if carriage_return {
        diagnostics.add_warning(Diagnosis::new(
            DiagnosisKind::InvalidData,
            "trailing newlines",
            &["carriage return"],
        ));
    }
    Ok(())
}

/// Read the record content.
impl<'a, S: Read> Read for ArcRecord<'a, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.payload {
            Some(ref mut payload) => payload.read(buf),
            None => Ok(0),
        }
    }
}

/// Read the record content, using the payload's buffer.
impl<'a, S: Read> BufRead for ArcRecord<'a, S> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self.payload {
            Some(ref mut payload) => payload.fill_buf(),
            None => Ok(&[]),
        }
    }

    fn consume(&mut self, amt: usize) {
        if let Some(ref mut payload) = self.payload {
            payload.consume(amt);
        }
    }
}

impl<'a, S: Read> Drop for ArcRecord<'a, S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!(
                "failed to close record at offset {}: {}",
                self.header.start_offset, e
            );
        }
    }
}

impl<'a, S: Read> std::fmt::Debug for ArcRecord<'a, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ArcRecord")
            .field("header", &self.header)
            .field("kind", &self.kind)
            .field("diagnostics", &self.diagnostics)
            .field("http", &self.http)
            .field("closed", &self.closed)
            .finish()
    }
}

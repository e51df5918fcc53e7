//! Writing ARC records.

use std::io::{self, Read, Write};

use crate::compression::{self, Compression};
use crate::diagnosis::{Diagnosis, DiagnosisKind, DiagnosticTotals, Diagnostics};
use crate::field::Field;
use crate::header::{ArcHeader, VersionHeader};
use crate::WriteError;

/// The position of an [`ArcWriter`] within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// No record is open.
    Init,
    /// A header line has been written, but no content.
    HeaderWritten,
    /// Some content has been written.
    PayloadWritten,
    /// Writing to the output failed. The writer cannot be used any further and the output is
    /// lost.
    Failed,
}

/// Writes ARC records to an output stream.
///
/// Each record is written as a header line followed by its content; closing the record writes
/// the trailing newline. When compressing, every record is written as its own gzip member.
/// Writing a header while a record is open closes that record first.
///
/// After any error writing to the output the writer is in the [`Failed`](WriterState::Failed)
/// state, where every operation fails.
///
/// ```
/// # use arcio::{ArcWriter, Compression};
/// let mut writer = ArcWriter::new(Vec::new(), Compression::None);
/// writer
///     .write_header(b"dns:example.com 192.0.2.1 20111224193001 text/dns 7\n", None)
///     .unwrap();
/// writer.write_payload(b"a dns!\n").unwrap();
/// assert!(writer.close_record().unwrap());
///
/// let out = writer.finish().unwrap();
/// assert_eq!(
///     out,
///     b"dns:example.com 192.0.2.1 20111224193001 text/dns 7\na dns!\n\n"
/// );
/// ```
pub struct ArcWriter<W: Write> {
    /// The output, while no record is open.
    output: Option<W>,
    /// The output of the open record.
    record: Option<compression::Writer<W>>,
    compression: Compression,
    state: WriterState,
    declared: u64,
    written: u64,
    diagnostics: Diagnostics,
    last_diagnostics: Diagnostics,
    totals: DiagnosticTotals,
}

impl<W: Write> ArcWriter<W> {
    pub fn new(output: W, compression: Compression) -> Self {
        ArcWriter {
            output: Some(output),
            record: None,
            compression,
            state: WriterState::Init,
            declared: 0,
            written: 0,
            diagnostics: Diagnostics::new(),
            last_diagnostics: Diagnostics::new(),
            totals: Default::default(),
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Counts of diagnoses over all records closed so far.
    pub fn totals(&self) -> &DiagnosticTotals {
        &self.totals
    }

    /// The diagnostics of the most recently closed record.
    pub fn last_diagnostics(&self) -> &Diagnostics {
        &self.last_diagnostics
    }

    /// Begin a record by writing its raw header line.
    ///
    /// `content_length` is the number of content bytes that will follow; if `None` it is taken
    /// from the archive length in the header line. A newline is added if the line lacks one.
    /// Any record already open is closed first.
    pub fn write_header(&mut self, header: &[u8], content_length: Option<u64>) -> Result<(), WriteError> {
        if self.state != WriterState::Init {
            self.close_record()?;
        }
        let output = match self.output.take() {
            Some(output) => output,
            None => return Err(self.illegal_state("write a header")),
        };

        self.diagnostics = Diagnostics::new();
        self.declared = match content_length {
            Some(length) => length,
            None => self.length_from_header(header),
        };
        self.written = 0;

        let mut record = compression::Writer::new(output, self.compression);
        if let Err(e) = write_line(&mut record, header) {
            return Err(self.fail(e));
        }
        trace!("wrote header for record of {} bytes", self.declared);

        self.record = Some(record);
        self.state = WriterState::HeaderWritten;
        Ok(())
    }

    /// Begin a record by writing a parsed header line.
    pub fn write_header_line(&mut self, header: &ArcHeader) -> Result<(), WriteError> {
        let line = header.render();
        self.write_header(line.as_bytes(), Some(header.declared_length()))
    }

    /// Write a complete version block: the header line, version lines and any further content.
    ///
    /// The archive length of `header` is replaced with the length of the content written.
    pub fn write_version_block(
        &mut self,
        header: &ArcHeader,
        version: &VersionHeader,
        content: &[u8],
    ) -> Result<bool, WriteError> {
        let lines = version.render();
        let length = (lines.len() + content.len()) as u64;

        let mut header = header.clone();
        header.archive_length = Field {
            raw: Some(length.to_string()),
            parsed: Some(length as i64),
        };
        self.write_header_line(&header)?;
        self.write_payload(lines.as_bytes())?;
        self.write_payload(content)?;
        self.close_record()
    }

    /// Copy up to `length` bytes of content from `input`, returning the number copied.
    pub fn stream_payload<R: Read>(&mut self, input: &mut R, length: u64) -> Result<u64, WriteError> {
        let record = self.open_record("write a payload")?;
        let copied = io::copy(&mut input.by_ref().take(length), record).map_err(|e| self.fail(e))?;
        if copied < length {
            debug!("payload input ended after {} of {} bytes", copied, length);
        }
        self.written += copied;
        self.state = WriterState::PayloadWritten;
        Ok(copied)
    }

    /// Write bytes of content.
    pub fn write_payload(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let record = self.open_record("write a payload")?;
        record.write_all(data).map_err(|e| self.fail(e))?;
        self.written += data.len() as u64;
        self.state = WriterState::PayloadWritten;
        Ok(())
    }

    /// Terminate the open record.
    ///
    /// Returns `true` if exactly as much content was written as was declared. A record with the
    /// wrong amount of content is still terminated, but it will not be readable as written.
    pub fn close_record(&mut self) -> Result<bool, WriteError> {
        if !self.is_record_open() {
            return Err(self.illegal_state("close a record"));
        }
        let mut record = match self.record.take() {
            Some(record) => record,
            None => return Err(self.illegal_state("close a record")),
        };
        self.state = WriterState::Init;

        let finished = match record.write_all(b"\n") {
            Ok(()) => record.finish(),
            Err(e) => Err(e),
        };
        match finished {
            Ok(output) => self.output = Some(output),
            Err(e) => return Err(self.fail(e)),
        }

        let complete = self.written == self.declared;
        if !complete {
            error!(
                "record content was {} bytes but {} were declared",
                self.written, self.declared
            );
            self.diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::InvalidExpected,
                "payload length",
                &[
                    self.written.to_string().as_str(),
                    self.declared.to_string().as_str(),
                ],
            ));
        }
        self.totals.fold(&self.diagnostics);
        self.last_diagnostics = std::mem::take(&mut self.diagnostics);
        Ok(complete)
    }

    /// Close any open record and return the output.
    pub fn finish(mut self) -> Result<W, WriteError> {
        if self.is_record_open() {
            self.close_record()?;
        }
        match self.output.take() {
            Some(output) => Ok(output),
            None => Err(self.illegal_state("finish")),
        }
    }

    fn is_record_open(&self) -> bool {
        matches!(self.state, WriterState::HeaderWritten | WriterState::PayloadWritten)
    }

    fn open_record(&mut self, operation: &'static str) -> Result<&mut compression::Writer<W>, WriteError> {
        match (self.state, self.record.as_mut()) {
            (WriterState::Init, _) | (WriterState::Failed, _) | (_, None) => Err(WriteError::IllegalState {
                operation,
                state: self.state,
            }),
            (_, Some(record)) => Ok(record),
        }
    }

    fn fail(&mut self, e: io::Error) -> WriteError {
        error!("writing ARC output failed: {}", e);
        self.state = WriterState::Failed;
        self.record = None;
        e.into()
    }

    fn illegal_state(&self, operation: &'static str) -> WriteError {
        WriteError::IllegalState {
            operation,
            state: self.state,
        }
    }

    fn length_from_header(&mut self, header: &[u8]) -> u64 {
        let line = String::from_utf8_lossy(header);
        let line = line.trim_end_matches(&['\n', '\r'][..]);
        let mut diagnostics = Diagnostics::new();
        match ArcHeader::parse_line(line, &mut diagnostics) {
            Some(parsed) if parsed.archive_length.parsed.is_some() => parsed.declared_length(),
            _ => {
                warn!("no archive length in written header line {:?}", line);
                self.diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::Invalid,
                    "header line",
                    &[line],
                ));
                0
            }
        }
    }
}

fn write_line<W: Write>(record: &mut compression::Writer<W>, line: &[u8]) -> io::Result<()> {
    record.write_all(line)?;
    if !line.ends_with(b"\n") {
        record.write_all(b"\n")?;
    }
    Ok(())
}

impl<W: Write> Drop for ArcWriter<W> {
    fn drop(&mut self) {
        if self.is_record_open() {
            if let Err(e) = self.close_record() {
                error!("failed to close record when dropping writer: {}", e);
            }
        }
    }
}

impl<W: Write> std::fmt::Debug for ArcWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ArcWriter")
            .field("compression", &self.compression)
            .field("state", &self.state)
            .field("declared", &self.declared)
            .field("written", &self.written)
            .field("totals", &self.totals)
            .finish()
    }
}

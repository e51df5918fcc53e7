//! HTTP message headers embedded in record content.
//!
//! Records of HTTP URLs normally begin with the response (or request) header that was exchanged
//! with the server. Only the start line and header block are parsed; everything following the
//! header is the HTTP payload and is left to the caller.

use std::io::{self, BufRead, Read};

use indexmap::IndexMap;
use regex::Regex;
use uncased::{Uncased, UncasedStr};

use crate::diagnosis::{Diagnosis, DiagnosisKind, Diagnostics};
use crate::field::ContentType;
use crate::source::ByteSource;

lazy_static! {
    static ref HTTP_VERSION: Regex =
        Regex::new(r"^HTTP/[0-9]+\.[0-9]+$").expect("HTTP version regex invalid");
}

/// The first line of an HTTP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    /// `HTTP/1.0 200 OK`
    Status {
        version: String,
        status_code: u16,
        reason: String,
    },
    /// `GET /index.html HTTP/1.0`
    Request {
        method: String,
        uri: String,
        version: String,
    },
}

/// One line of an HTTP header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    /// The field name, or `None` for a malformed line without a colon.
    pub name: Option<String>,
    /// The field value with surrounding whitespace removed and continuation lines joined, or
    /// the entire line if it is malformed.
    pub value: String,
}

/// A parsed HTTP message header.
///
/// Header lines are kept in the order they appeared. Lookups by name ignore case and see every
/// line with that name in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeader {
    pub start_line: StartLine,
    lines: Vec<HeaderLine>,
    index: IndexMap<Uncased<'static>, Vec<usize>>,
    header_length: u64,
    payload_length: u64,
}

enum Recorded {
    Line(Vec<u8>),
    /// The input ended before a line terminator; any bytes before the end are included.
    End(Vec<u8>),
    /// More bytes were read than can be pushed back.
    Overflow,
}

/// Reads from a source while recording every byte so that it can all be pushed back.
struct Recorder<'s, R: Read> {
    source: &'s mut ByteSource<R>,
    recorded: Vec<u8>,
    limit: usize,
}

impl<'s, R: Read> Recorder<'s, R> {
    fn read_line(&mut self) -> io::Result<Recorded> {
        let start = self.recorded.len();
        loop {
            if self.recorded.len() >= self.limit {
                // the limit is only exceeded if there is more to read
                if self.source.fill_buf()?.is_empty() {
                    return Ok(Recorded::End(self.recorded[start..].to_vec()));
                }
                return Ok(Recorded::Overflow);
            }
            match self.source.read_byte()? {
                None => return Ok(Recorded::End(self.recorded[start..].to_vec())),
                Some(b) => {
                    self.recorded.push(b);
                    if b == b'\n' {
                        let mut line = self.recorded[start..self.recorded.len() - 1].to_vec();
                        if line.last() == Some(&b'\r') {
                            line.pop();
                        }
                        return Ok(Recorded::Line(line));
                    }
                }
            }
        }
    }

    fn rewind(self) -> io::Result<()> {
        trace!("pushing back {} bytes of non-HTTP data", self.recorded.len());
        self.source.unread(&self.recorded)
    }
}

impl HttpHeader {
    /// Try to parse an HTTP header from the start of record content.
    ///
    /// No more bytes than the source's pushback size are read. If the content does not begin
    /// with a complete HTTP header within that limit, every byte read is pushed back and `None`
    /// is returned. The header may only be cut short by the end of the content if the content
    /// consists of nothing but the header, as determined by `declared_length`.
    ///
    /// Malformed header lines are accepted, adding warnings to `diagnostics`.
    pub fn parse<R: Read>(
        source: &mut ByteSource<R>,
        declared_length: u64,
        diagnostics: &mut Diagnostics,
    ) -> io::Result<Option<HttpHeader>> {
        let limit = source.pushback_size();
        let mut recorder = Recorder {
            source,
            recorded: Vec::new(),
            limit,
        };
        let mut warnings = Vec::new();

        let parsed = Self::parse_recorded(&mut recorder, declared_length, &mut warnings)?;
        match parsed {
            Some(header) => {
                for warning in warnings {
                    diagnostics.add_warning(warning);
                }
                Ok(Some(header))
            }
            None => {
                recorder.rewind()?;
                Ok(None)
            }
        }
    }

    fn parse_recorded<R: Read>(
        recorder: &mut Recorder<'_, R>,
        declared_length: u64,
        warnings: &mut Vec<Diagnosis>,
    ) -> io::Result<Option<HttpHeader>> {
        let start_line = match recorder.read_line()? {
            Recorded::Line(line) => match parse_start_line(&crate::decode_latin1(&line)) {
                Some(start_line) => start_line,
                None => return Ok(None),
            },
            Recorded::End(_) | Recorded::Overflow => return Ok(None),
        };

        let mut header = HttpHeader {
            start_line,
            lines: Vec::new(),
            index: IndexMap::new(),
            header_length: 0,
            payload_length: 0,
        };
        loop {
            match recorder.read_line()? {
                Recorded::Overflow => return Ok(None),
                Recorded::Line(line) if line.is_empty() => break,
                Recorded::Line(line) => header.add_line(&crate::decode_latin1(&line), warnings),
                Recorded::End(line) => {
                    if recorder.recorded.len() as u64 != declared_length {
                        return Ok(None);
                    }
                    if !line.is_empty() {
                        header.add_line(&crate::decode_latin1(&line), warnings);
                    }
                    break;
                }
            }
        }

        header.header_length = recorder.recorded.len() as u64;
        header.payload_length = declared_length.saturating_sub(header.header_length);
        Ok(Some(header))
    }

    fn add_line(&mut self, line: &str, warnings: &mut Vec<Diagnosis>) {
        if line.starts_with(|c: char| c == ' ' || c == '\t') {
            if let Some(last) = self.lines.last_mut() {
                let continuation = line.trim();
                if !continuation.is_empty() {
                    if !last.value.is_empty() {
                        last.value.push(' ');
                    }
                    last.value.push_str(continuation);
                }
                return;
            }
        }

        match line.find(':') {
            Some(colon) => {
                let name = line[..colon].trim().to_owned();
                let value = line[colon + 1..].trim().to_owned();
                self.index
                    .entry(Uncased::new(name.clone()))
                    .or_insert_with(Vec::new)
                    .push(self.lines.len());
                self.lines.push(HeaderLine {
                    name: Some(name),
                    value,
                });
            }
            None => {
                warnings.push(Diagnosis::new(
                    DiagnosisKind::Invalid,
                    "HTTP header line",
                    &[line],
                ));
                self.lines.push(HeaderLine {
                    name: None,
                    value: line.to_owned(),
                });
            }
        }
    }

    /// All header lines, in order.
    pub fn lines(&self) -> &[HeaderLine] {
        &self.lines
    }

    /// Get the value of the first header line with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    /// Iterate over the values of all header lines with the given name.
    pub fn get_all<'h>(&'h self, name: &str) -> impl Iterator<Item = &'h str> + 'h {
        let indices: &[usize] = self
            .index
            .get(UncasedStr::new(name))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        indices.iter().map(move |&i| self.lines[i].value.as_str())
    }

    /// The number of bytes in the header, including the terminating empty line.
    pub fn header_length(&self) -> u64 {
        self.header_length
    }

    /// The number of content bytes following the header.
    pub fn payload_length(&self) -> u64 {
        self.payload_length
    }

    pub fn is_response(&self) -> bool {
        matches!(self.start_line, StartLine::Status { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.start_line {
            StartLine::Status { status_code, .. } => Some(status_code),
            StartLine::Request { .. } => None,
        }
    }

    /// The parsed `Content-Type` of the HTTP payload.
    pub fn content_type(&self) -> Option<ContentType> {
        self.get("Content-Type").and_then(ContentType::parse)
    }
}

fn parse_start_line(line: &str) -> Option<StartLine> {
    if line.starts_with("HTTP/") {
        let mut parts = line.splitn(3, ' ');
        let version = parts.next()?;
        let status_code = parts.next()?;
        if !HTTP_VERSION.is_match(version)
            || status_code.len() != 3
            || !status_code.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        return Some(StartLine::Status {
            version: version.to_owned(),
            status_code: status_code.parse().ok()?,
            reason: parts.next().unwrap_or("").to_owned(),
        });
    }

    let (rest, version) = line.rsplit_once(' ')?;
    if !HTTP_VERSION.is_match(version) {
        return None;
    }
    let (method, uri) = rest.split_once(' ')?;
    if method.is_empty() || uri.is_empty() {
        return None;
    }
    Some(StartLine::Request {
        method: method.to_owned(),
        uri: uri.to_owned(),
        version: version.to_owned(),
    })
}

//! ARC record header lines.

use std::io::Read;
use std::net::IpAddr;
use std::ops::RangeBounds;

use chrono::{DateTime, Utc};
use url::Url;

pub use version::{ArcVersion, VersionHeader};

use crate::diagnosis::{Diagnosis, DiagnosisKind, Diagnostics};
use crate::field::{self, field_entity, ContentType, Field};
use crate::source::ByteSource;
use crate::{NO_TYPE, V1_FIELD_COUNT, V2_FIELD_COUNT};

pub mod version;

/// The parsed header line of an ARC record.
///
/// Every field keeps its raw text alongside the parsed value so that records can be reported on
/// and rewritten faithfully even when values are malformed. The fields only present in version 2
/// records are absent in version 1 records.
///
/// ```
/// # use arcio::{ArcHeader, Diagnostics};
/// let mut diagnostics = Diagnostics::new();
/// let header = ArcHeader::parse_line(
///     "http://www.archive.org/ 207.241.224.2 20111224193000 text/html 1024",
///     &mut diagnostics,
/// ).unwrap();
/// assert_eq!(header.record_field_version, 1);
/// assert_eq!(header.url_scheme.as_deref(), Some("http"));
/// assert_eq!(header.declared_length(), 1024);
/// assert!(diagnostics.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcHeader {
    pub url: Field<Url>,
    /// The lower-cased scheme of the URL, available even if the URL is otherwise invalid.
    pub url_scheme: Option<String>,
    pub ip_address: Field<IpAddr>,
    pub archive_date: Field<DateTime<Utc>>,
    /// The record content type; `no-type` is accepted but has no parsed value.
    pub content_type: Field<ContentType>,
    pub result_code: Field<i32>,
    pub checksum: Field<String>,
    pub location: Field<String>,
    pub offset: Field<i64>,
    pub filename: Field<String>,
    pub archive_length: Field<i64>,
    /// The header line layout, 1 or 2.
    pub record_field_version: u8,
    /// Offset of the record in the containing stream.
    ///
    /// For compressed streams, this is the offset of the compressed member holding the record.
    pub start_offset: u64,
    /// The length of the header line in bytes, including its terminator.
    pub header_length: u64,
}

impl ArcHeader {
    /// Read the next header line from a source.
    ///
    /// Lines that are not header lines are skipped, adding an error to `diagnostics` if any
    /// were found. Returns `None` if the input ended before a header line was found; the
    /// diagnostics then describe any data that was skipped.
    pub fn read_from<R: Read>(
        source: &mut ByteSource<R>,
        diagnostics: &mut Diagnostics,
    ) -> std::io::Result<Option<ArcHeader>> {
        let mut data_before = false;
        let mut empty_lines_before = false;

        let header = loop {
            let start = source.consumed();
            let bytes = match source.read_line_bytes()? {
                None => break None,
                Some(bytes) => bytes,
            };
            if bytes.is_empty() {
                trace!("skipping empty line at {}", start);
                empty_lines_before = true;
                continue;
            }

            let (line, latin1) = match String::from_utf8(bytes) {
                Ok(s) => (s, false),
                Err(e) => (crate::decode_latin1(e.as_bytes()), true),
            };
            let mut line_diagnostics = Diagnostics::new();
            match Self::parse_line(&line, &mut line_diagnostics) {
                None => {
                    trace!("skipping non-header line at {}: {:?}", start, line);
                    data_before = true;
                }
                Some(mut header) => {
                    header.start_offset = start;
                    header.header_length = source.consumed() - start;
                    if latin1 {
                        diagnostics.add_warning(Diagnosis::new(
                            DiagnosisKind::InvalidEncoding,
                            "header line",
                            &[line.as_str(), "UTF-8"],
                        ));
                    }
                    break Some((header, line_diagnostics));
                }
            }
        };

        if data_before {
            diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::Error,
                "ARC record",
                &["Data before ARC record"],
            ));
        }
        if empty_lines_before {
            diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::Error,
                "ARC record",
                &["Empty lines before ARC record"],
            ));
        }

        Ok(header.map(|(header, line_diagnostics)| {
            for d in line_diagnostics.errors() {
                diagnostics.add_error(d.clone());
            }
            for d in line_diagnostics.warnings() {
                diagnostics.add_warning(d.clone());
            }
            header
        }))
    }

    /// Parse a header line (without its terminator).
    ///
    /// Returns `None` if the line does not have the field count of either header layout, in
    /// which case it is not a header line at all. Otherwise every field is parsed, adding
    /// diagnoses for any that are missing or invalid.
    pub fn parse_line(line: &str, diagnostics: &mut Diagnostics) -> Option<ArcHeader> {
        let fields: Vec<&str> = line.split(' ').collect();
        let record_field_version = match fields.len() {
            V1_FIELD_COUNT => 1,
            V2_FIELD_COUNT => 2,
            _ => return None,
        };

        let mut header = ArcHeader {
            url: Field::parse_with(fields[0], |v| field::parse_uri(v, "URL", false, diagnostics)),
            url_scheme: field::uri_scheme(fields[0]),
            ip_address: Field::parse_with(fields[1], |v| {
                field::parse_ip_address(v, "IP-address", false, diagnostics)
            }),
            archive_date: Field::parse_with(fields[2], |v| {
                field::parse_date(v, "Archive-date", false, diagnostics)
            }),
            content_type: Field::parse_with(fields[3], |v| match v {
                Some(NO_TYPE) => None,
                v => field::parse_content_type(v, "Content-type", false, diagnostics),
            }),
            result_code: Field::absent(),
            checksum: Field::absent(),
            location: Field::absent(),
            offset: Field::absent(),
            filename: Field::absent(),
            archive_length: Field::absent(),
            record_field_version,
            start_offset: 0,
            header_length: line.len() as u64 + 1,
        };

        if record_field_version == 2 {
            header.result_code = Field::parse_with(fields[4], |v| {
                field::parse_integer(v, "Result-code", true, diagnostics)
            });
            header.checksum = Field::parse_with(fields[5], |v| {
                field::parse_string(v, "Checksum", true, diagnostics)
            });
            header.location = Field::parse_with(fields[6], |v| {
                field::parse_string(v, "Location", true, diagnostics)
            });
            header.offset = Field::parse_with(fields[7], |v| {
                field::parse_long(v, "Offset", true, diagnostics)
            });
            header.filename = Field::parse_with(fields[8], |v| {
                field::parse_string(v, "Filename", true, diagnostics)
            });
        }
        header.archive_length = Field::parse_with(fields[fields.len() - 1], |v| {
            field::parse_long(v, "Archive-length", false, diagnostics)
        });

        check_range(
            &mut header.result_code,
            "Result-code",
            100..=999,
            "A number between 100 and 999",
            diagnostics,
        );
        check_range(&mut header.offset, "Offset", 0.., NON_NEGATIVE, diagnostics);
        check_range(&mut header.archive_length, "Archive-length", 0.., NON_NEGATIVE, diagnostics);

        Some(header)
    }

    /// The number of content bytes following the header line.
    ///
    /// This is zero if the archive length is missing or invalid.
    pub fn declared_length(&self) -> u64 {
        self.archive_length.parsed.unwrap_or(0) as u64
    }

    /// Return `true` if this is the header of a version block.
    pub fn is_version_block(&self) -> bool {
        self.url_scheme.as_deref() == Some(crate::ARC_SCHEME)
    }

    /// Render the header line from the raw field values, including its terminating newline.
    ///
    /// Absent values are written as `-`.
    pub fn render(&self) -> String {
        fn raw<T>(field: &Field<T>) -> &str {
            match field.raw.as_deref() {
                None | Some("") => "-",
                Some(s) => s,
            }
        }

        let mut values = vec![
            raw(&self.url),
            raw(&self.ip_address),
            raw(&self.archive_date),
            raw(&self.content_type),
        ];
        if self.record_field_version == 2 {
            values.extend_from_slice(&[
                raw(&self.result_code),
                raw(&self.checksum),
                raw(&self.location),
                raw(&self.offset),
                raw(&self.filename),
            ]);
        }
        values.push(raw(&self.archive_length));

        let mut line = values.join(" ");
        line.push('\n');
        line
    }
}

const NON_NEGATIVE: &str = "A non-negative number";

/// Clear a parsed value that is outside its permitted range.
fn check_range<T, R>(
    field: &mut Field<T>,
    name: &str,
    range: R,
    expected: &str,
    diagnostics: &mut Diagnostics,
) where
    T: PartialOrd,
    R: RangeBounds<T>,
{
    match &field.parsed {
        Some(value) if !range.contains(value) => {}
        _ => return,
    }

    diagnostics.add_error(Diagnosis::new(
        DiagnosisKind::InvalidExpected,
        field_entity(name),
        &[field.raw.as_deref().unwrap_or(""), expected],
    ));
    field.parsed = None;
}

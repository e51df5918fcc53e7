use std::fmt;
use std::io::Read;

use crate::diagnosis::{Diagnosis, DiagnosisKind, Diagnostics};
use crate::field::{self, field_entity, Field};
use crate::header::ArcHeader;
use crate::source::ByteSource;
use crate::{FILEDESC_PREFIX, V1_DESCRIPTION, V2_DESCRIPTION};

/// A known ARC format version, as declared by a version block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcVersion {
    V1_0,
    V1_1,
    V2_0,
}

impl ArcVersion {
    /// Resolve a version number and reserved value to a known version.
    pub fn from_parts(major: i32, minor: i32) -> Option<ArcVersion> {
        match (major, minor) {
            (1, 0) => Some(ArcVersion::V1_0),
            (1, 1) => Some(ArcVersion::V1_1),
            (2, 0) => Some(ArcVersion::V2_0),
            _ => None,
        }
    }

    pub fn major(self) -> i32 {
        match self {
            ArcVersion::V1_0 | ArcVersion::V1_1 => 1,
            ArcVersion::V2_0 => 2,
        }
    }

    pub fn minor(self) -> i32 {
        match self {
            ArcVersion::V1_1 => 1,
            ArcVersion::V1_0 | ArcVersion::V2_0 => 0,
        }
    }

    /// The header line layout used by records in a file of this version (1 or 2).
    pub fn record_field_version(self) -> u8 {
        match self {
            ArcVersion::V2_0 => 2,
            _ => 1,
        }
    }

    /// The block description a file of this version is expected to carry.
    pub fn description(self) -> &'static str {
        description_for(self.record_field_version())
    }
}

impl fmt::Display for ArcVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

fn description_for(record_field_version: u8) -> &'static str {
    if record_field_version == 2 {
        V2_DESCRIPTION
    } else {
        V1_DESCRIPTION
    }
}

/// The two lines that open the content of a version block.
///
/// ```text
/// 1 0 Alexa Internet
/// URL IP-address Archive-date Content-type Archive-length
/// ```
///
/// The first line holds the version number, a reserved value (the minor version) and the name
/// of the organization that created the file. The second, the block description, names the
/// fields of the header lines in the rest of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionHeader {
    pub version_number: Field<i32>,
    pub reserved: Field<i32>,
    pub origin_code: Field<String>,
    /// The resolved version, if the version number and reserved value are a known pair.
    pub version: Option<ArcVersion>,
    /// The block description line as read.
    pub block_description: Option<String>,
    /// The header line layout described by the block description (1 or 2).
    ///
    /// If the block description is not recognized, this is 1.
    pub record_field_version: u8,
    /// The number of bytes of block content occupied by the version lines.
    pub lines_length: u64,
}

impl VersionHeader {
    /// Construct a version header declaring the given version.
    pub fn new(version: ArcVersion, origin_code: &str) -> Self {
        let mut header = VersionHeader {
            version_number: Field {
                raw: Some(version.major().to_string()),
                parsed: Some(version.major()),
            },
            reserved: Field {
                raw: Some(version.minor().to_string()),
                parsed: Some(version.minor()),
            },
            origin_code: Field {
                raw: Some(origin_code.to_owned()),
                parsed: Some(origin_code.to_owned()),
            },
            version: Some(version),
            block_description: Some(version.description().to_owned()),
            record_field_version: version.record_field_version(),
            lines_length: 0,
        };
        header.lines_length = header.render().len() as u64;
        header
    }

    /// Check the header line of a version block.
    ///
    /// The URL must be a file descriptor, and the content is expected to be plain text.
    pub fn validate_header(header: &ArcHeader, diagnostics: &mut Diagnostics) {
        match header.url.value_str() {
            Some(url) if url.starts_with(FILEDESC_PREFIX) => {}
            Some(url) => diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::InvalidExpected,
                field_entity("URL"),
                &[url, "filedesc://<filename>"],
            )),
            // absence was already flagged
            None => {}
        }

        if let (Some(raw), Some(content_type)) =
            (header.content_type.value_str(), &header.content_type.parsed)
        {
            if !content_type.is("text", "plain") {
                diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::InvalidExpected,
                    field_entity("Content-type"),
                    &[raw, "text/plain"],
                ));
            }
        }
    }

    /// Read the version and block description lines from the content of a version block.
    pub fn read_from<R: Read>(
        source: &mut ByteSource<R>,
        diagnostics: &mut Diagnostics,
    ) -> std::io::Result<VersionHeader> {
        let mut header = VersionHeader {
            version_number: Field::absent(),
            reserved: Field::absent(),
            origin_code: Field::absent(),
            version: None,
            block_description: None,
            record_field_version: 1,
            lines_length: 0,
        };
        source.set_counter(0);

        match source.read_line()? {
            None => {
                diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::ErrorExpected,
                    "version line",
                    &[],
                ));
                return Ok(header);
            }
            Some(line) => header.parse_version_line(&line, diagnostics),
        }

        match source.read_line()? {
            None => diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::ErrorExpected,
                "block description",
                &[],
            )),
            Some(line) => {
                header.parse_block_description(&line, diagnostics);
                header.block_description = Some(line);
            }
        }
        header.lines_length = source.counter();
        trace!("read version block header {:?}", header);

        Ok(header)
    }

    fn parse_version_line(&mut self, line: &str, diagnostics: &mut Diagnostics) {
        let parts: Vec<&str> = line.splitn(3, ' ').collect();
        if parts.len() != 3 {
            diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::InvalidExpected,
                "version line",
                &[line, "<version-number> <reserved> <origin-code>"],
            ));
        }
        let part = |i: usize| parts.get(i).copied().unwrap_or("");

        self.version_number = Field::parse_with(part(0), |v| {
            field::parse_integer(v, "version-number", false, diagnostics)
        });
        self.reserved = Field::parse_with(part(1), |v| {
            field::parse_integer(v, "reserved", false, diagnostics)
        });
        self.origin_code = Field::parse_with(part(2), |v| {
            field::parse_string(v, "origin-code", false, diagnostics)
        });

        if let (Some(major), Some(minor)) = (self.version_number.parsed, self.reserved.parsed) {
            self.version = ArcVersion::from_parts(major, minor);
            if self.version.is_none() {
                diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::Invalid,
                    "ARC version",
                    &[format!("{}.{}", major, minor).as_str()],
                ));
            }
        }
    }

    fn parse_block_description(&mut self, line: &str, diagnostics: &mut Diagnostics) {
        self.record_field_version = if line == V1_DESCRIPTION {
            1
        } else if line == V2_DESCRIPTION {
            2
        } else {
            diagnostics.add_error(Diagnosis::new(
                DiagnosisKind::Invalid,
                "block description",
                &[line],
            ));
            return;
        };

        if let Some(version) = self.version {
            if version.record_field_version() != self.record_field_version {
                diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::InvalidExpected,
                    "block description",
                    &[line, version.description()],
                ));
            }
        }
    }

    /// Render the version line and block description, each terminated by a newline.
    pub fn render(&self) -> String {
        let dash = |raw: &Option<String>| raw.clone().unwrap_or_else(|| "-".to_owned());
        format!(
            "{} {} {}\n{}\n",
            dash(&self.version_number.raw),
            dash(&self.reserved.raw),
            dash(&self.origin_code.raw),
            self.block_description
                .as_deref()
                .unwrap_or_else(|| description_for(self.record_field_version)),
        )
    }
}

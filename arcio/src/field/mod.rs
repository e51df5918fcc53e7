//! Parsers for individual header field values.
//!
//! Each parser takes the raw text of a field (or `None` if the field is absent), the name of the
//! field for use in diagnoses, and whether the field may be absent. Parsing never fails outright:
//! an absent mandatory value adds a [`Missing`](DiagnosisKind::Missing) diagnosis, a value that
//! doesn't match the expected grammar adds an [`InvalidExpected`](DiagnosisKind::InvalidExpected)
//! diagnosis echoing the value, and in both cases `None` is returned.
//!
//! | Input                   | `nullable == false`  | `nullable == true`   |
//! |-------------------------|----------------------|----------------------|
//! | absent or empty         | `Missing`, `None`    | `None`               |
//! | present but malformed   | `InvalidExpected`, `None` | `InvalidExpected`, `None` |
//! | present and well-formed | `Some(value)`        | `Some(value)`        |

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use url::Url;

use crate::diagnosis::{Diagnosis, DiagnosisKind, Diagnostics};

pub use content_type::ContentType;

mod content_type;
mod date;
mod ip;
mod uri;

/// A header field value, holding both its text and its parsed form.
///
/// `raw` is the text exactly as it appeared in the input (`None` if the field was not present at
/// all) and `parsed` is its interpretation, which is `None` if the raw value was absent,
/// a placeholder or invalid. Both are kept so that the original data remains available for
/// reporting and rewriting even when it could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<T> {
    pub raw: Option<String>,
    pub parsed: Option<T>,
}

impl<T> Field<T> {
    /// A field that did not appear in the input.
    pub fn absent() -> Self {
        Field {
            raw: None,
            parsed: None,
        }
    }

    /// Construct a field from its raw text by running a parser over it.
    ///
    /// The placeholder `-` is treated as an absent value before parsing.
    pub fn parse_with<F>(raw: &str, parse: F) -> Self
    where
        F: FnOnce(Option<&str>) -> Option<T>,
    {
        Field {
            parsed: parse(value_of(raw)),
            raw: Some(raw.to_owned()),
        }
    }

    /// The raw value, unless it is absent or a placeholder.
    pub fn value_str(&self) -> Option<&str> {
        self.raw.as_deref().and_then(value_of)
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::absent()
    }
}

/// Map the `-` placeholder and empty strings to `None`.
pub(crate) fn value_of(raw: &str) -> Option<&str> {
    match raw {
        "" | "-" => None,
        s => Some(s),
    }
}

pub(crate) fn field_entity(name: &str) -> String {
    format!("'{}' value", name)
}

/// Common policy for all field parsers.
fn parse_field<T, F>(
    raw: Option<&str>,
    name: &str,
    nullable: bool,
    expected: &str,
    diagnostics: &mut Diagnostics,
    parse: F,
) -> Option<T>
where
    F: FnOnce(&str) -> Option<T>,
{
    match raw {
        None | Some("") => {
            if !nullable {
                diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::Missing,
                    field_entity(name),
                    &[],
                ));
            }
            None
        }
        Some(s) => {
            let parsed = parse(s);
            if parsed.is_none() {
                diagnostics.add_error(Diagnosis::new(
                    DiagnosisKind::InvalidExpected,
                    field_entity(name),
                    &[s, expected],
                ));
            }
            parsed
        }
    }
}

/// Parse a base-10 32-bit integer.
pub fn parse_integer(
    raw: Option<&str>,
    name: &str,
    nullable: bool,
    diagnostics: &mut Diagnostics,
) -> Option<i32> {
    parse_field(raw, name, nullable, "Numeric format", diagnostics, |s| {
        s.parse().ok()
    })
}

/// Parse a base-10 64-bit integer.
pub fn parse_long(
    raw: Option<&str>,
    name: &str,
    nullable: bool,
    diagnostics: &mut Diagnostics,
) -> Option<i64> {
    parse_field(raw, name, nullable, "Numeric format", diagnostics, |s| {
        s.parse().ok()
    })
}

/// Accept any non-empty string.
pub fn parse_string(
    raw: Option<&str>,
    name: &str,
    nullable: bool,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    parse_field(raw, name, nullable, "", diagnostics, |s| Some(s.to_owned()))
}

/// Parse an archive date in the `yyyyMMddHHmmss` format, interpreted as UTC.
///
/// Dates at or before the Unix epoch are rejected.
pub fn parse_date(
    raw: Option<&str>,
    name: &str,
    nullable: bool,
    diagnostics: &mut Diagnostics,
) -> Option<DateTime<Utc>> {
    parse_field(raw, name, nullable, date::EXPECTED_FORMAT, diagnostics, date::parse)
}

/// Parse an IPv4 or IPv6 address.
pub fn parse_ip_address(
    raw: Option<&str>,
    name: &str,
    nullable: bool,
    diagnostics: &mut Diagnostics,
) -> Option<IpAddr> {
    parse_field(raw, name, nullable, "IPv4 or IPv6 address", diagnostics, ip::parse)
}

/// Parse a content type (`type/subtype` with optional parameters).
pub fn parse_content_type(
    raw: Option<&str>,
    name: &str,
    nullable: bool,
    diagnostics: &mut Diagnostics,
) -> Option<ContentType> {
    parse_field(raw, name, nullable, "Content-type format", diagnostics, ContentType::parse)
}

/// Parse an absolute URI; relative references are rejected.
pub fn parse_uri(
    raw: Option<&str>,
    name: &str,
    nullable: bool,
    diagnostics: &mut Diagnostics,
) -> Option<Url> {
    parse_field(raw, name, nullable, "Absolute URI", diagnostics, uri::parse)
}

/// Extract the scheme of a URI without otherwise validating it, lower-cased.
///
/// This allows a record to be classified by scheme even when its URL is not valid.
pub fn uri_scheme(raw: &str) -> Option<String> {
    uri::scheme(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_mandatory_value() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(parse_integer(None, "Result-code", false, &mut diagnostics), None);
        assert_eq!(
            diagnostics.errors(),
            &[Diagnosis::new(DiagnosisKind::Missing, "'Result-code' value", &[])]
        );
    }

    #[test]
    fn missing_nullable_value_is_fine() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(parse_long(Some(""), "Offset", true, &mut diagnostics), None);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn invalid_value_is_echoed() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(parse_long(Some("12a"), "Archive-length", true, &mut diagnostics), None);
        assert_eq!(
            diagnostics.errors(),
            &[Diagnosis::new(
                DiagnosisKind::InvalidExpected,
                "'Archive-length' value",
                &["12a", "Numeric format"]
            )]
        );
    }

    #[test]
    fn placeholder_is_same_as_empty() {
        let mut dash_diagnostics = Diagnostics::new();
        let dash = Field::parse_with("-", |v| {
            parse_ip_address(v, "IP-address", false, &mut dash_diagnostics)
        });
        let mut empty_diagnostics = Diagnostics::new();
        let empty = Field::parse_with("", |v| {
            parse_ip_address(v, "IP-address", false, &mut empty_diagnostics)
        });

        assert_eq!(dash.parsed, None);
        assert_eq!(dash.parsed, empty.parsed);
        assert_eq!(dash.raw.as_deref(), Some("-"));
        assert_eq!(dash.value_str(), None);
        assert_eq!(dash_diagnostics, empty_diagnostics);
        assert_eq!(dash_diagnostics.errors()[0].kind, DiagnosisKind::Missing);
    }

    #[test]
    fn parses_typed_values() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            parse_date(Some("20111224193000"), "Archive-date", false, &mut diagnostics),
            Some(Utc.with_ymd_and_hms(2011, 12, 24, 19, 30, 0).unwrap())
        );
        assert_eq!(
            parse_ip_address(Some("192.168.1.1"), "IP-address", false, &mut diagnostics),
            Some("192.168.1.1".parse().unwrap())
        );
        assert_eq!(
            parse_uri(Some("http://example.com/"), "URL", false, &mut diagnostics)
                .map(String::from),
            Some("http://example.com/".to_owned())
        );
        assert!(diagnostics.is_empty());
    }
}

//! Content types per RFC 2616 section 3.7:
//!
//! ```text
//! media-type = type "/" subtype *( ";" parameter )
//! type       = token
//! subtype    = token
//! parameter  = attribute "=" value
//! attribute  = token
//! value      = token | quoted-string
//! ```

use std::fmt;

use indexmap::IndexMap;

use crate::{CTL, SEPARATORS};

/// A parsed content type.
///
/// The type, subtype and parameter names are case-insensitive and normalized to lower case;
/// parameter values retain their case.
///
/// ```
/// # use arcio::field::ContentType;
/// let ct = ContentType::parse("Text/HTML; Charset=\"UTF-8\"").unwrap();
/// assert_eq!(ct.media_type, "text");
/// assert_eq!(ct.subtype, "html");
/// assert_eq!(ct.parameter("charset"), Some("UTF-8"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub media_type: String,
    pub subtype: String,
    pub parameters: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Type,
    Subtype,
    PostSubtypeWhitespace,
    PreParameter,
    ParameterName,
    PostEquals,
    ValueToken,
    ValueQuoted,
    QuotedPair,
    PostValueWhitespace,
}

fn is_token_char(c: char) -> bool {
    c.is_ascii() && !CTL.contains(&c) && !SEPARATORS.contains(&c)
}

fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

impl ContentType {
    pub fn parse(s: &str) -> Option<ContentType> {
        use State::*;

        let mut media_type = String::new();
        let mut subtype = String::new();
        let mut parameters = IndexMap::new();
        let mut name = String::new();
        let mut value = String::new();

        let mut state = Start;
        for c in s.chars() {
            state = match state {
                Start if is_whitespace(c) => Start,
                Start | Type if is_token_char(c) => {
                    media_type.push(c.to_ascii_lowercase());
                    Type
                }
                Type if c == '/' => Subtype,
                Subtype if is_token_char(c) => {
                    subtype.push(c.to_ascii_lowercase());
                    Subtype
                }
                Subtype | PostSubtypeWhitespace if subtype.is_empty() => return None,
                Subtype | PostSubtypeWhitespace if is_whitespace(c) => PostSubtypeWhitespace,
                Subtype | PostSubtypeWhitespace | PostValueWhitespace if c == ';' => PreParameter,
                PreParameter if is_whitespace(c) => PreParameter,
                PreParameter | ParameterName if is_token_char(c) => {
                    name.push(c.to_ascii_lowercase());
                    ParameterName
                }
                ParameterName if c == '=' => PostEquals,
                PostEquals if c == '"' => ValueQuoted,
                PostEquals | ValueToken if is_token_char(c) => {
                    value.push(c);
                    ValueToken
                }
                ValueToken if is_whitespace(c) || c == ';' => {
                    parameters.insert(std::mem::take(&mut name), std::mem::take(&mut value));
                    if c == ';' {
                        PreParameter
                    } else {
                        PostValueWhitespace
                    }
                }
                ValueQuoted if c == '\\' => QuotedPair,
                ValueQuoted if c == '"' => {
                    parameters.insert(std::mem::take(&mut name), std::mem::take(&mut value));
                    PostValueWhitespace
                }
                ValueQuoted if c != '\t' && CTL.contains(&c) => return None,
                ValueQuoted | QuotedPair => {
                    value.push(c);
                    ValueQuoted
                }
                PostValueWhitespace if is_whitespace(c) => PostValueWhitespace,
                _ => return None,
            };
        }

        match state {
            Subtype if !subtype.is_empty() => {}
            PostSubtypeWhitespace | PreParameter | PostValueWhitespace => {}
            ValueToken => {
                parameters.insert(name, value);
            }
            _ => return None,
        }

        Some(ContentType {
            media_type,
            subtype,
            parameters,
        })
    }

    /// Get the value of a parameter, by case-insensitive name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }

    /// Return `true` if this is the given `type/subtype`, compared case-insensitively.
    pub fn is(&self, media_type: &str, subtype: &str) -> bool {
        self.media_type.eq_ignore_ascii_case(media_type) && self.subtype.eq_ignore_ascii_case(subtype)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.subtype)?;
        for (name, value) in &self.parameters {
            if !value.is_empty() && value.chars().all(is_token_char) {
                write!(f, "; {}={}", name, value)?;
            } else {
                write!(f, "; {}=\"", name)?;
                for c in value.chars() {
                    if c == '"' || c == '\\' {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "\"")?;
            }
        }
        Ok(())
    }
}

//! Structured findings about the quality of parsed data.
//!
//! Malformed input never causes a record to be rejected outright. Instead every problem that is
//! noticed while parsing a record is described by a [`Diagnosis`] and appended to the record's
//! [`Diagnostics`], leaving it to the caller to decide whether a record is acceptable.

use std::fmt;

/// The kind of problem described by a [`Diagnosis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosisKind {
    /// A general error, described by the diagnosis info.
    Error,
    /// Something was expected but not found.
    ErrorExpected,
    /// A value is present but empty.
    Empty,
    /// A mandatory value is absent.
    Missing,
    /// A value is present but invalid.
    Invalid,
    /// Data of some structure is invalid.
    InvalidData,
    /// Bytes could not be decoded in the expected character encoding.
    InvalidEncoding,
    /// A value is invalid; the info holds the actual value followed by what was expected.
    InvalidExpected,
    /// Something appeared more than once where it may only appear once.
    Duplicate,
    /// Data is present where none should be.
    UndesiredData,
}

impl DiagnosisKind {
    fn description(self) -> &'static str {
        use DiagnosisKind::*;
        match self {
            Error => "error",
            ErrorExpected => "expected",
            Empty => "empty",
            Missing => "missing",
            Invalid => "invalid",
            InvalidData => "invalid data",
            InvalidEncoding => "invalid encoding",
            InvalidExpected => "invalid",
            Duplicate => "duplicate",
            UndesiredData => "undesired data",
        }
    }
}

/// A single finding about a record.
///
/// The `entity` names what the finding is about (a header field such as `'URL' value`, or a
/// structural part of a record like `payload`) and `info` carries any contextual values, such
/// as an invalid value followed by a description of what was expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnosis {
    pub kind: DiagnosisKind,
    pub entity: String,
    pub info: Vec<String>,
}

impl Diagnosis {
    pub fn new<E: Into<String>>(kind: DiagnosisKind, entity: E, info: &[&str]) -> Self {
        Diagnosis {
            kind,
            entity: entity.into(),
            info: info.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.entity)?;
        if !self.info.is_empty() {
            write!(f, " ({})", self.info.join(", "))?;
        }
        Ok(())
    }
}

/// An ordered, append-only collection of errors and warnings for one record.
///
/// Errors and warnings both make a record non-compliant; warnings are used for softer
/// irregularities like unexpected whitespace or character encodings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<Diagnosis>,
    warnings: Vec<Diagnosis>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_error(&mut self, diagnosis: Diagnosis) {
        trace!("error {}", diagnosis);
        self.errors.push(diagnosis);
    }

    pub fn add_warning(&mut self, diagnosis: Diagnosis) {
        trace!("warning {}", diagnosis);
        self.warnings.push(diagnosis);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Return `true` if there are neither errors nor warnings.
    pub fn is_empty(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }

    /// Errors, in the order they were added.
    pub fn errors(&self) -> &[Diagnosis] {
        &self.errors
    }

    /// Warnings, in the order they were added.
    pub fn warnings(&self) -> &[Diagnosis] {
        &self.warnings
    }

    /// Iterate over all errors followed by all warnings.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnosis> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

/// Running counts of diagnoses over many records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticTotals {
    /// Number of records folded into these totals.
    pub records: u64,
    /// Number of those records that had any errors or warnings.
    pub noncompliant: u64,
    pub errors: u64,
    pub warnings: u64,
}

impl DiagnosticTotals {
    /// Add the counts of a finished record's diagnostics.
    pub fn fold(&mut self, diagnostics: &Diagnostics) {
        self.records += 1;
        if !diagnostics.is_empty() {
            self.noncompliant += 1;
        }
        self.errors += diagnostics.errors.len() as u64;
        self.warnings += diagnostics.warnings.len() as u64;
    }
}

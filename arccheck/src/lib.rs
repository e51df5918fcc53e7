//! Validation of ARC files.
//!
//! [`check`] reads every record of a file and reports those that are not compliant, producing
//! a [`Summary`] of the whole file.

#[macro_use]
extern crate log;

use std::fmt;
use std::io::{self, BufRead, Read, Write};

use arcio::{ArcReader, ArcRecord, Compression, DiagnosticTotals, Diagnostics, ReadError, ReaderConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to read records: {0}")]
    Read(#[from] ReadError),
    #[error("failed to write report: {0}")]
    Report(#[source] io::Error),
}

impl From<io::Error> for CheckError {
    fn from(e: io::Error) -> Self {
        CheckError::Read(ReadError::Io(e))
    }
}

/// The outcome of checking one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub compression: Compression,
    pub totals: DiagnosticTotals,
    /// Diagnoses of data outside any record.
    pub stream_diagnostics: Diagnostics,
}

impl Summary {
    /// Whether every record, and the data between them, is free of errors and warnings.
    pub fn is_compliant(&self) -> bool {
        self.totals.noncompliant == 0 && self.stream_diagnostics.is_empty()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} records, {} non-compliant, {} errors, {} warnings",
            self.totals.records,
            self.totals.noncompliant,
            self.totals.errors + self.stream_diagnostics.errors().len() as u64,
            self.totals.warnings + self.stream_diagnostics.warnings().len() as u64,
        )
    }
}

/// Check every record of an ARC file, writing a line to `report` for each non-compliant record.
///
/// Compression is detected from the input. Each report line holds the record offset, its URL and
/// its diagnoses.
pub fn check<R: BufRead, W: Write>(
    input: R,
    config: ReaderConfig,
    report: &mut W,
) -> Result<Summary, CheckError> {
    let mut reader = ArcReader::sniffed(input, config)?;
    debug!("checking {:?} input", reader.compression());

    while let Some(mut record) = reader.next_record()? {
        drain(&mut record)?;
        record.close()?;
        if record.is_compliant() == Some(false) {
            report_record(&record, report).map_err(CheckError::Report)?;
        }
    }

    let stream_diagnostics = reader.diagnostics().clone();
    if !stream_diagnostics.is_empty() {
        let end = reader.position();
        let line = format_diagnostics(&stream_diagnostics);
        writeln!(report, "{}\t-\t{}", end, line).map_err(CheckError::Report)?;
    }

    Ok(Summary {
        compression: reader.compression(),
        totals: *reader.totals(),
        stream_diagnostics,
    })
}

/// Read the rest of a record's content, so that digests cover it.
fn drain<S: Read>(record: &mut ArcRecord<'_, S>) -> io::Result<u64> {
    io::copy(record, &mut io::sink())
}

fn report_record<S: Read, W: Write>(record: &ArcRecord<'_, S>, report: &mut W) -> io::Result<()> {
    let url = record.header().url.raw.as_deref().unwrap_or("-");
    writeln!(
        report,
        "{}\t{}\t{}",
        record.start_offset(),
        url,
        format_diagnostics(record.diagnostics())
    )
}

fn format_diagnostics(diagnostics: &Diagnostics) -> String {
    diagnostics
        .errors()
        .iter()
        .map(|d| format!("error: {}", d))
        .chain(diagnostics.warnings().iter().map(|d| format!("warning: {}", d)))
        .collect::<Vec<_>>()
        .join("; ")
}

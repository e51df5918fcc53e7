use super::{read_all, v1_lines};
use crate::{
    ArcHeader, ArcReader, ArcVersion, ArcWriter, Compression, Diagnosis, DiagnosisKind,
    Diagnostics, ReaderConfig, VersionHeader, WriteError, WriterState,
};
use pretty_assertions::assert_eq;
use std::io::{self, Read, Write};

fn header(line: &str) -> ArcHeader {
    let mut diagnostics = Diagnostics::new();
    let header = ArcHeader::parse_line(line, &mut diagnostics).expect("line should be a header");
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    header
}

#[test]
fn writes_well_formed_records() {
    let mut writer = ArcWriter::new(Vec::new(), Compression::None);
    let written = writer
        .write_version_block(
            &header("filedesc://test.arc 0.0.0.0 20110101000000 text/plain 0"),
            &VersionHeader::new(ArcVersion::V1_0, "test-origin"),
            b"",
        )
        .unwrap();
    assert!(written);

    writer
        .write_header_line(&header("dns:example.com 192.0.2.1 20110101000001 text/dns 6"))
        .unwrap();
    assert_eq!(writer.state(), WriterState::HeaderWritten);
    writer.write_payload(b"abc").unwrap();
    assert_eq!(writer.state(), WriterState::PayloadWritten);
    writer.write_payload(b"def").unwrap();
    assert!(writer.close_record().unwrap());
    assert_eq!(writer.state(), WriterState::Init);

    let out = writer.finish().unwrap();
    assert_eq!(
        String::from_utf8(out.clone()).unwrap(),
        format!(
            "filedesc://test.arc 0.0.0.0 20110101000000 text/plain {}\n{}\n\
             dns:example.com 192.0.2.1 20110101000001 text/dns 6\nabcdef\n",
            v1_lines().len(),
            v1_lines()
        )
    );

    let records = read_all(&out, Compression::None, ReaderConfig::default());
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.diagnostics.is_empty()), "{:#?}", records);
    assert_eq!(records[1].content, b"abcdef");
}

#[test]
fn streams_payload() {
    let mut writer = ArcWriter::new(Vec::new(), Compression::None);
    writer
        .write_header(b"dns:example.com 192.0.2.1 20110101000001 text/dns 4", None)
        .unwrap();
    let mut input = &b"0123456789"[..];
    assert_eq!(writer.stream_payload(&mut input, 4).unwrap(), 4);
    assert_eq!(input, b"456789");

    // a new header closes the open record
    writer
        .write_header(b"dns:example.org 192.0.2.2 20110101000002 text/dns 0\n", None)
        .unwrap();
    assert_eq!(writer.totals().records, 1);
    let out = writer.finish().unwrap();

    assert_eq!(
        &out[..],
        &b"dns:example.com 192.0.2.1 20110101000001 text/dns 4\n0123\n\
           dns:example.org 192.0.2.2 20110101000002 text/dns 0\n\n"[..]
    );
}

#[test]
fn short_record_is_reported() {
    let mut writer = ArcWriter::new(Vec::new(), Compression::None);
    writer
        .write_header(b"dns:example.com 192.0.2.1 20110101000001 text/dns 10\n", None)
        .unwrap();
    writer.write_payload(b"short").unwrap();
    assert!(!writer.close_record().unwrap());

    assert_eq!(
        writer.last_diagnostics().errors(),
        &[Diagnosis::new(
            DiagnosisKind::InvalidExpected,
            "payload length",
            &["5", "10"]
        )][..]
    );
    assert_eq!(writer.totals().noncompliant, 1);
}

#[test]
fn explicit_length_overrides_header() {
    let mut writer = ArcWriter::new(Vec::new(), Compression::None);
    writer.write_header(b"not a header line\n", Some(3)).unwrap();
    writer.write_payload(b"abc").unwrap();
    assert!(writer.close_record().unwrap());
    assert!(writer.last_diagnostics().is_empty());
}

#[test]
fn illegal_states() {
    let mut writer = ArcWriter::new(Vec::new(), Compression::None);

    match writer.write_payload(b"data") {
        Err(WriteError::IllegalState { state, .. }) => assert_eq!(state, WriterState::Init),
        other => panic!("expected an illegal state error, got {:?}", other),
    }
    match writer.close_record() {
        Err(WriteError::IllegalState { state, .. }) => assert_eq!(state, WriterState::Init),
        other => panic!("expected an illegal state error, got {:?}", other),
    }

    let out = writer.finish().unwrap();
    assert!(out.is_empty());
}

/// Output that accepts `capacity` bytes, then fails.
struct FullOutput {
    capacity: usize,
}

impl Write for FullOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.capacity == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "output is full"));
        }
        let n = std::cmp::min(buf.len(), self.capacity);
        self.capacity -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn output_errors_fail_the_writer() {
    let line = b"dns:example.com 192.0.2.1 20110101000001 text/dns 3\n";

    let mut writer = ArcWriter::new(FullOutput { capacity: 10 }, Compression::None);
    match writer.write_header(line, None) {
        Err(WriteError::Io(e)) => assert_eq!(e.to_string(), "output is full"),
        other => panic!("expected an I/O error, got {:?}", other),
    }
    assert_eq!(writer.state(), WriterState::Failed);
    match writer.write_payload(b"abc") {
        Err(WriteError::IllegalState { state, .. }) => assert_eq!(state, WriterState::Failed),
        other => panic!("expected an illegal state error, got {:?}", other),
    }
    match writer.write_header(line, None) {
        Err(WriteError::IllegalState { state, .. }) => assert_eq!(state, WriterState::Failed),
        other => panic!("expected an illegal state error, got {:?}", other),
    }
    assert!(writer.finish().is_err());

    // failing while writing content
    let mut writer = ArcWriter::new(FullOutput { capacity: line.len() }, Compression::None);
    writer.write_header(line, None).unwrap();
    assert!(matches!(writer.write_payload(b"abc"), Err(WriteError::Io(_))));
    assert_eq!(writer.state(), WriterState::Failed);
    assert!(matches!(
        writer.close_record(),
        Err(WriteError::IllegalState { state: WriterState::Failed, .. })
    ));
}

#[test]
fn writes_gzip_members() {
    let mut writer = ArcWriter::new(Vec::new(), Compression::Gzip);
    writer
        .write_version_block(
            &header("filedesc://test.arc 0.0.0.0 20110101000000 text/plain 0"),
            &VersionHeader::new(ArcVersion::V1_0, "test-origin"),
            b"",
        )
        .unwrap();
    writer
        .write_header(b"dns:example.com 192.0.2.1 20110101000001 text/dns 3\n", None)
        .unwrap();
    writer.write_payload(b"abc").unwrap();
    let out = writer.finish().unwrap();

    let mut reader = ArcReader::sniffed(&out[..], ReaderConfig::default()).unwrap();
    assert_eq!(reader.compression(), Compression::Gzip);
    let version_block = reader.next_record().unwrap().unwrap();
    assert!(version_block.is_version_block());
    drop(version_block);

    let mut record = reader.next_record().unwrap().unwrap();
    assert!(record.start_offset() > 0);
    let mut content = String::new();
    record.read_to_string(&mut content).unwrap();
    assert_eq!(content, "abc");
    record.close().unwrap();
    assert!(record.diagnostics().is_empty());
    drop(record);

    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(reader.totals().records, 2);
}

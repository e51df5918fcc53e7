use super::{data_record, read_all, version_block};
use crate::{
    ArcReader, ArcVersion, Compression, Diagnosis, DiagnosisKind, DigestAlgorithm, ReaderConfig,
};
use pretty_assertions::assert_eq;
use std::io::Read;

#[test]
fn minimal_version_block() {
    let data = b"filedesc://test.arc 0.0.0.0 20110101000000 text/plain 76\n\
                 1 0 test-origin\n\
                 URL IP-address Archive-date Content-type Archive-length\n\
                 abcd\n";

    let mut reader = ArcReader::new(&data[..], Compression::None);
    let mut record = reader.next_record().unwrap().expect("should find a record");
    assert!(record.is_version_block());
    assert!(record.http_header().is_none());
    assert_eq!(record.header().record_field_version, 1);
    assert_eq!(record.start_offset(), 0);

    let version = record.version_header().unwrap();
    assert_eq!(version.version, Some(ArcVersion::V1_0));
    assert_eq!(version.record_field_version, 1);
    assert_eq!(version.origin_code.parsed.as_deref(), Some("test-origin"));
    assert_eq!(record.payload_length(), 4);

    let mut content = String::new();
    record.read_to_string(&mut content).unwrap();
    assert_eq!(content, "abcd");
    record.close().unwrap();

    assert!(record.diagnostics().is_empty());
    assert_eq!(record.is_compliant(), Some(true));
    assert_eq!(record.consumed(), data.len() as u64);
    drop(record);

    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(reader.position(), data.len() as u64);
    assert_eq!(reader.totals().records, 1);
    assert_eq!(reader.totals().noncompliant, 0);
}

#[test]
fn truncated_payload() {
    let data = format!(
        "{}dns:example.com 192.0.2.1 20110101000001 text/dns 100\n{}",
        version_block(""),
        "x".repeat(50)
    );

    let mut reader = ArcReader::new(data.as_bytes(), Compression::None);
    drop(reader.next_record().unwrap());

    let mut record = reader.next_record().unwrap().unwrap();
    let mut content = Vec::new();
    record.read_to_end(&mut content).unwrap();
    assert_eq!(content.len(), 50);
    record.close().unwrap();

    assert_eq!(record.unavailable(), 50);
    assert_eq!(
        record.diagnostics().errors(),
        &[Diagnosis::new(
            DiagnosisKind::Invalid,
            "payload",
            &["Payload truncated", "50"]
        )][..]
    );
    assert!(!record.diagnostics().has_warnings());
    drop(record);

    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(reader.totals().noncompliant, 1);
}

#[test]
fn close_frames_exactly() {
    let block = version_block("");
    let first = data_record("dns:a.example", "text/dns", "0123456789");
    let second = data_record("dns:b.example", "text/dns", "second");
    let data = format!("{}{}{}", block, first, second);

    for &read_len in &[0usize, 1, 5, 10] {
        let mut reader = ArcReader::new(data.as_bytes(), Compression::None);
        drop(reader.next_record().unwrap());

        let mut record = reader.next_record().unwrap().unwrap();
        let mut buf = vec![0u8; read_len];
        record.read_exact(&mut buf).unwrap();
        assert_eq!(&buf[..], &b"0123456789"[..read_len]);
        record.close().unwrap();
        record.close().unwrap();
        assert!(record.diagnostics().is_empty(), "{:?}", record.diagnostics());
        assert_eq!(record.consumed(), first.len() as u64);
        drop(record);

        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.header().url.raw.as_deref(), Some("dns:b.example"));
        assert_eq!(record.start_offset(), (block.len() + first.len()) as u64);
    }
}

#[test]
fn trailing_newlines() {
    let next = data_record("dns:b.example", "text/dns", "b");
    let cases: Vec<(&str, Vec<Diagnosis>, Vec<Diagnosis>)> = vec![
        ("abc\n", vec![], vec![]),
        (
            "abc\n\n",
            vec![Diagnosis::new(
                DiagnosisKind::InvalidExpected,
                "trailing newlines",
                &["2", "1"],
            )],
            vec![],
        ),
        (
            "abc\r\n",
            vec![],
            vec![Diagnosis::new(
                DiagnosisKind::InvalidData,
                "trailing newlines",
                &["carriage return"],
            )],
        ),
        (
            "abc",
            vec![Diagnosis::new(
                DiagnosisKind::InvalidExpected,
                "trailing newlines",
                &["0", "1"],
            )],
            vec![],
        ),
    ];

    for (content, errors, warnings) in cases {
        let data = format!(
            "{}dns:a.example 192.0.2.1 20110101000001 text/dns 3\n{}{}",
            version_block(""),
            content,
            next
        );
        let records = read_all(data.as_bytes(), Compression::None, ReaderConfig::default());
        assert_eq!(records.len(), 3, "with content {:?}", content);
        assert_eq!(records[1].content, b"abc");
        assert_eq!(records[1].diagnostics.errors(), &errors[..], "with content {:?}", content);
        assert_eq!(records[1].diagnostics.warnings(), &warnings[..], "with content {:?}", content);
        assert_eq!(records[2].url.as_deref(), Some("dns:b.example"));
        assert!(records[2].diagnostics.is_empty());
    }
}

#[test]
fn missing_version_block() {
    let data = data_record("dns:example.com", "text/dns", "abc");

    let records = read_all(data.as_bytes(), Compression::None, ReaderConfig::default());
    assert_eq!(
        records[0].diagnostics.errors(),
        &[Diagnosis::new(DiagnosisKind::ErrorExpected, "version block", &[])][..]
    );

    // Reading from the middle of a file does not expect one
    let mut reader = ArcReader::at_offset(data.as_bytes(), Compression::None, 500, ReaderConfig::default());
    let mut record = reader.next_record().unwrap().unwrap();
    assert_eq!(record.start_offset(), 500);
    record.close().unwrap();
    assert!(record.diagnostics().is_empty());
    drop(record);
    assert_eq!(reader.position(), 500 + data.len() as u64);
}

#[test]
fn duplicate_version_block() {
    let data = format!("{}{}", version_block(""), version_block(""));

    let records = read_all(data.as_bytes(), Compression::None, ReaderConfig::default());
    assert_eq!(records.len(), 2);
    assert!(records[0].diagnostics.is_empty());
    assert_eq!(
        records[1].diagnostics.errors(),
        &[Diagnosis::new(DiagnosisKind::Duplicate, "version block", &[])][..]
    );
}

#[test]
fn layout_differs_from_version_block() {
    let data = format!(
        "{}dns:example.com 192.0.2.1 20110101000001 text/dns 200 - - - - 3\nabc\n",
        version_block("")
    );

    let records = read_all(data.as_bytes(), Compression::None, ReaderConfig::default());
    assert_eq!(records[1].content, b"abc");
    assert_eq!(
        records[1].diagnostics.errors(),
        &[Diagnosis::new(
            DiagnosisKind::InvalidExpected,
            "record field version",
            &["2", "1"]
        )][..]
    );
}

#[test]
fn skips_data_between_records() {
    let data = format!(
        "{}junk line\n{}",
        version_block(""),
        data_record("dns:example.com", "text/dns", "abc")
    );

    let records = read_all(data.as_bytes(), Compression::None, ReaderConfig::default());
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].content, b"abc");
    assert_eq!(
        records[1].diagnostics.errors(),
        &[Diagnosis::new(
            DiagnosisKind::Error,
            "ARC record",
            &["Data before ARC record"]
        )][..]
    );
}

#[test]
fn empty_lines_before_first_record() {
    let data = format!("\n\n{}", version_block(""));

    let records = read_all(data.as_bytes(), Compression::None, ReaderConfig::default());
    assert_eq!(records[0].start_offset, 2);
    assert_eq!(
        records[0].diagnostics.errors(),
        &[Diagnosis::new(
            DiagnosisKind::Error,
            "ARC record",
            &["Empty lines before ARC record"]
        )][..]
    );
}

#[test]
fn garbage_after_last_record() {
    let data = format!("{}trailing junk\n", version_block(""));

    let mut reader = ArcReader::new(data.as_bytes(), Compression::None);
    drop(reader.next_record().unwrap());
    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(reader.totals().noncompliant, 0);
    assert_eq!(
        reader.diagnostics().errors(),
        &[Diagnosis::new(
            DiagnosisKind::Error,
            "ARC record",
            &["Data before ARC record"]
        )][..]
    );
}

#[test]
fn invalid_fields_are_diagnosed() {
    let data = format!(
        "{}dns:example.com 999.1.1.1 2011-01-01 text/dns 3\nabc\n",
        version_block("")
    );

    let records = read_all(data.as_bytes(), Compression::None, ReaderConfig::default());
    assert_eq!(records[1].content, b"abc");
    assert_eq!(
        records[1].diagnostics.errors(),
        &[
            Diagnosis::new(
                DiagnosisKind::InvalidExpected,
                "'IP-address' value",
                &["999.1.1.1", "IPv4 or IPv6 address"]
            ),
            Diagnosis::new(
                DiagnosisKind::InvalidExpected,
                "'Archive-date' value",
                &["2011-01-01", "yyyyMMddHHmmss"]
            ),
        ][..]
    );
}

#[test]
fn block_digest() {
    let data = format!(
        "{}{}",
        version_block(""),
        data_record("dns:example.com", "text/dns", "abc")
    );
    let config = ReaderConfig::default()
        .with_block_digest(Some(DigestAlgorithm::Sha1))
        .with_payload_digest(Some(DigestAlgorithm::Sha1))
        .with_digest_encoding("base16");

    let mut reader = ArcReader::with_config(data.as_bytes(), Compression::None, config);
    drop(reader.next_record().unwrap());
    let mut record = reader.next_record().unwrap().unwrap();
    // read only part of the content; the digest still covers all of it
    let mut first = [0u8; 1];
    record.read_exact(&mut first).unwrap();
    record.close().unwrap();

    assert!(record.diagnostics().is_empty());
    let digest = record.block_digest().expect("block digest should be computed");
    assert_eq!(
        digest.labelled().as_deref(),
        Some("sha1:a9993e364706816aba3e25717850c26c9cd0d89d")
    );
    // payload digests are only computed for content with an HTTP header
    assert!(record.payload_digest().is_none());
}

#[test]
fn unknown_digest_encoding() {
    let data = format!(
        "{}{}",
        version_block(""),
        data_record("dns:example.com", "text/dns", "abc")
    );
    let config = ReaderConfig::default()
        .with_block_digest(Some(DigestAlgorithm::Md5))
        .with_digest_encoding("base99");

    let records = read_all(data.as_bytes(), Compression::None, config);
    assert_eq!(
        records[1].diagnostics.errors(),
        &[Diagnosis::new(DiagnosisKind::Invalid, "digest encoding", &["base99"])][..]
    );
}

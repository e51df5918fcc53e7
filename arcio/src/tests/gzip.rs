use super::{data_record, read_all, version_block};
use crate::{ArcReader, Compression, Diagnosis, DiagnosisKind, ReadError, ReaderConfig};
use flate2::write::GzEncoder;
use pretty_assertions::assert_eq;
use std::io::{BufReader, Read, Write};

fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Compress each record as its own member, returning the data and the offset of each member.
fn members(records: &[String]) -> (Vec<u8>, Vec<u64>) {
    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for record in records {
        offsets.push(data.len() as u64);
        data.extend(gzip(record));
    }
    (data, offsets)
}

fn sample_records() -> Vec<String> {
    vec![
        version_block(""),
        data_record("dns:www.archive.org", "text/dns", "207.241.224.2\n"),
        data_record("ftp://ftp.example.com/README", "text/plain", "read me"),
    ]
}

#[test]
fn reads_members_with_offsets() {
    let (data, offsets) = members(&sample_records());

    let mut reader = ArcReader::sniffed(&data[..], ReaderConfig::default()).unwrap();
    assert_eq!(reader.compression(), Compression::Gzip);
    drop(reader.next_record().unwrap());
    let mut record = reader.next_record().unwrap().unwrap();
    let mut content = String::new();
    record.read_to_string(&mut content).unwrap();
    assert_eq!(content, "207.241.224.2\n");
    drop(record);
    assert_eq!(reader.position(), offsets[2]);

    let records = read_all(&data, Compression::Gzip, ReaderConfig::default());
    assert_eq!(
        records.iter().map(|r| r.start_offset).collect::<Vec<_>>(),
        offsets
    );
    assert!(records.iter().all(|r| r.diagnostics.is_empty()), "{:#?}", records);
    assert_eq!(records[2].content, b"read me");
}

#[test]
fn sniffs_through_small_buffers() {
    let (data, offsets) = members(&sample_records());

    for &capacity in &[1usize, 2, 3] {
        let input = BufReader::with_capacity(capacity, &data[..]);
        let mut reader = ArcReader::sniffed(input, ReaderConfig::default()).unwrap();
        assert_eq!(reader.compression(), Compression::Gzip, "capacity {}", capacity);

        let mut starts = Vec::new();
        while let Some(mut record) = reader.next_record().unwrap() {
            record.close().unwrap();
            assert!(record.diagnostics().is_empty(), "{:?}", record.diagnostics());
            starts.push(record.start_offset());
        }
        assert_eq!(starts, offsets);
    }

    let plain = sample_records().concat();
    let input = BufReader::with_capacity(1, plain.as_bytes());
    let reader = ArcReader::sniffed(input, ReaderConfig::default()).unwrap();
    assert_eq!(reader.compression(), Compression::None);
}

#[test]
fn trailing_partial_magic() {
    let (mut data, _) = members(&sample_records()[..1]);
    let end = data.len() as u64;
    data.push(0x1f);

    let mut reader = ArcReader::new(&data[..], Compression::Gzip);
    drop(reader.next_record().unwrap());
    match reader.next_record() {
        Err(ReadError::NotGzip { offset }) => assert_eq!(offset, end),
        other => panic!("expected a NotGzip error, got {:?}", other),
    };
}

#[test]
fn random_access() {
    let (data, offsets) = members(&sample_records());
    let offset = offsets[2];

    let mut reader = ArcReader::at_offset(
        &data[offset as usize..],
        Compression::Gzip,
        offset,
        ReaderConfig::default(),
    );
    let mut record = reader.next_record().unwrap().unwrap();
    assert_eq!(record.start_offset(), offset);
    assert_eq!(
        record.header().url.raw.as_deref(),
        Some("ftp://ftp.example.com/README")
    );
    record.close().unwrap();
    assert!(record.diagnostics().is_empty());
    drop(record);

    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(reader.position(), data.len() as u64);
}

#[test]
fn extra_data_in_member() {
    let records = vec![
        version_block(""),
        format!(
            "{}extra bytes",
            data_record("dns:example.com", "text/dns", "abc")
        ),
    ];
    let (data, _) = members(&records);

    let records = read_all(&data, Compression::Gzip, ReaderConfig::default());
    assert_eq!(records[1].content, b"abc");
    assert_eq!(
        records[1].diagnostics.errors(),
        &[Diagnosis::new(DiagnosisKind::UndesiredData, "gzip member", &["11"])][..]
    );
}

#[test]
fn uncompressed_data_after_members() {
    let (mut data, _) = members(&sample_records()[..1]);
    let end = data.len() as u64;
    data.extend_from_slice(b"not compressed\n");

    let mut reader = ArcReader::new(&data[..], Compression::Gzip);
    drop(reader.next_record().unwrap());
    match reader.next_record() {
        Err(ReadError::NotGzip { offset }) => assert_eq!(offset, end),
        other => panic!("expected a NotGzip error, got {:?}", other),
    };
}

use crate::{ArcReader, Compression, Diagnostics, ReaderConfig, V1_DESCRIPTION};
use std::io::Read;

mod gzip;
mod read;
mod write;

/// The version lines of a version 1 file.
fn v1_lines() -> String {
    format!("1 0 test-origin\n{}\n", V1_DESCRIPTION)
}

/// A version 1 version block with `extra` content after the version lines.
fn version_block(extra: &str) -> String {
    let lines = v1_lines();
    format!(
        "filedesc://test.arc 0.0.0.0 20110101000000 text/plain {}\n{}{}\n",
        lines.len() + extra.len(),
        lines,
        extra
    )
}

/// A version 1 data record.
fn data_record(url: &str, content_type: &str, content: &str) -> String {
    format!(
        "{} 192.0.2.1 20110101000001 {} {}\n{}\n",
        url,
        content_type,
        content.len(),
        content
    )
}

/// Content and diagnostics of a closed record.
#[derive(Debug)]
struct Summary {
    start_offset: u64,
    url: Option<String>,
    content: Vec<u8>,
    diagnostics: Diagnostics,
}

/// Read every record from `data`, returning a summary of each.
fn read_all(data: &[u8], compression: Compression, config: ReaderConfig) -> Vec<Summary> {
    let mut reader = ArcReader::with_config(data, compression, config);
    let mut out = Vec::new();
    while let Some(mut record) = reader.next_record().expect("reading should not fail") {
        let mut content = Vec::new();
        record.read_to_end(&mut content).unwrap();
        record.close().unwrap();
        out.push(Summary {
            start_offset: record.start_offset(),
            url: record.header().url.raw.clone(),
            content,
            diagnostics: record.diagnostics().clone(),
        });
    }
    out
}

#[test]
fn reads_mixed_stream() {
    let data = format!(
        "{}{}{}",
        version_block(""),
        data_record("dns:www.archive.org", "text/dns", "207.241.224.2\n"),
        data_record("ftp://ftp.example.com/README", "text/plain", "read me"),
    );

    let records = read_all(data.as_bytes(), Compression::None, ReaderConfig::default());
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.diagnostics.is_empty()), "{:#?}", records);
    assert_eq!(records[1].content, b"207.241.224.2\n");
    assert_eq!(records[2].url.as_deref(), Some("ftp://ftp.example.com/README"));
    assert_eq!(records[2].content, b"read me");
}

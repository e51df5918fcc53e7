#[macro_use]
extern crate log;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;
use std::process;

use arccheck::{check, CheckError, Summary};
use arcio::{DigestAlgorithm, ReaderConfig};
use clap::{command, Arg, ArgMatches};
use indicatif::{ProgressBar, ProgressStyle};

/// Exit status when any record is not compliant.
const EXIT_NONCOMPLIANT: i32 = 1;
/// Exit status when a file could not be read.
const EXIT_FAILURE: i32 = 2;

fn parse_digest(matches: &ArgMatches, name: &str) -> Option<DigestAlgorithm> {
    let value = matches.value_of(name)?;
    match value.parse() {
        Ok(algorithm) => Some(algorithm),
        Err(e) => {
            eprintln!("error: --{}: {}", name, e);
            process::exit(EXIT_FAILURE);
        }
    }
}

fn config_from_args(matches: &ArgMatches) -> ReaderConfig {
    let encoding = matches.value_of("digest-encoding").unwrap_or("base32");
    if arcio::digest::encode(&[], encoding).is_none() {
        eprintln!("error: unknown digest encoding \"{}\"", encoding);
        process::exit(EXIT_FAILURE);
    }

    ReaderConfig::default()
        .with_block_digest(parse_digest(matches, "block-digest"))
        .with_payload_digest(parse_digest(matches, "payload-digest"))
        .with_digest_encoding(encoding)
        .with_parse_http(!matches.is_present("no-http"))
}

fn check_file(path: &Path, config: ReaderConfig, progress: bool) -> Result<Summary, CheckError> {
    let file = File::open(path)?;
    let stdout = io::stdout();
    let mut report = stdout.lock();

    if progress {
        let bar = ProgressBar::new(file.metadata()?.len()).with_style(
            ProgressStyle::with_template("{wide_bar} {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let summary = check(BufReader::new(bar.wrap_read(file)), config, &mut report);
        bar.finish_and_clear();
        summary
    } else {
        check(BufReader::new(file), config, &mut report)
    }
}

fn main() {
    let matches = command!()
        .about("Validates ARC files, reporting records that do not comply with the format")
        .arg(
            Arg::new("block-digest")
                .long("block-digest")
                .takes_value(true)
                .value_name("ALGORITHM")
                .help("Compute a digest of each record's content (md5, sha1, sha256, sha512)"),
        )
        .arg(
            Arg::new("payload-digest")
                .long("payload-digest")
                .takes_value(true)
                .value_name("ALGORITHM")
                .help("Compute a digest of each record's content following its HTTP header"),
        )
        .arg(
            Arg::new("digest-encoding")
                .long("digest-encoding")
                .takes_value(true)
                .value_name("NAME")
                .default_value("base32")
                .help("Encoding of computed digests (base16, base32, base64)"),
        )
        .arg(
            Arg::new("no-http")
                .long("no-http")
                .help("Do not parse HTTP headers in record content"),
        )
        .arg(
            Arg::new("progress")
                .long("progress")
                .help("Show progress while reading each file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log progress details and print a summary for compliant files"),
        )
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .required(true)
                .multiple_values(true)
                .help("ARC files to check, optionally gzip-compressed"),
        )
        .get_matches();

    let verbose = matches.is_present("verbose");
    let mut logger = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            logger.parse_filters(&filters);
        }
        Err(_) if verbose => {
            logger.filter_level(log::LevelFilter::Debug);
        }
        Err(_) => {
            logger.filter_level(log::LevelFilter::Warn);
        }
    }
    logger.init();

    let config = config_from_args(&matches);
    let progress = matches.is_present("progress");
    let mut status = 0;

    for path in matches.values_of("files").into_iter().flatten() {
        let path = Path::new(path);
        info!("checking {}", path.display());
        match check_file(path, config.clone(), progress) {
            Ok(summary) => {
                if !summary.is_compliant() {
                    status = std::cmp::max(status, EXIT_NONCOMPLIANT);
                }
                if verbose || !summary.is_compliant() {
                    println!("{}: {}", path.display(), summary);
                }
            }
            Err(e) => {
                error!("failed to check {}: {}", path.display(), e);
                eprintln!("{}: {}", path.display(), e);
                status = EXIT_FAILURE;
            }
        }
    }

    if let Err(e) = io::stdout().flush() {
        warn!("failed to flush report output: {}", e);
    }
    process::exit(status);
}

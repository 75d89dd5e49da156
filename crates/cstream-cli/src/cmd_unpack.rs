/// Implementation of `cstream unpack`.
///
/// Streams a file through [`StreamDecoder`] into a [`FilesystemSink`] and
/// reports every file written.
///
/// # Example output
///
/// ```text
/// out/job42/sub/b.bin                      3  crc32:eb8eba67
/// out/job42/a.bin                          7  crc32:5003699f
///
/// 2 files, 10 data bytes from 472 stream bytes
/// read 0.1 ms, write 0.0 ms, checksum 0.0 ms
/// ```
use std::fs::{self, File};
use std::time::Duration;

use anyhow::{Context, Result};
use cstream_decoder::{DecoderConfig, FilesystemSink, FilesystemSinkConfig, StreamDecoder};
use serde::Serialize;

use crate::UnpackArgs;

#[derive(Serialize)]
struct Report {
    bytes_read: u64,
    files: Vec<FileReport>,
    read_ms: f64,
    write_ms: f64,
    checksum_ms: f64,
}

#[derive(Serialize)]
struct FileReport {
    container: String,
    path: String,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// # Errors
///
/// Fails if the input cannot be read, the destination cannot be written,
/// or the stream is malformed or truncated. Files written before the
/// failure are left in place.
pub fn run(args: &UnpackArgs) -> Result<()> {
    let input =
        File::open(&args.file).with_context(|| format!("cannot open {}", args.file.display()))?;
    let len = input.metadata()?.len();
    fs::create_dir_all(&args.dest)
        .with_context(|| format!("cannot create {}", args.dest.display()))?;

    let sink = FilesystemSink::with_config(
        &args.dest,
        FilesystemSinkConfig {
            write_block_size: args.write_block_size,
            checksum: args.checksum,
        },
    );
    let mut decoder = StreamDecoder::new(input, len, sink).with_config(DecoderConfig {
        read_block_size: args.read_block_size,
        ..DecoderConfig::default()
    });
    let stats = decoder
        .decode()
        .with_context(|| format!("failed to decode {}", args.file.display()))?;
    let sink = decoder.into_sink();

    let report = Report {
        bytes_read: stats.bytes_read,
        files: sink
            .written_files()
            .iter()
            .map(|f| FileReport {
                container: f.container.clone(),
                path: f.path.display().to_string(),
                size: f.size,
                checksum: f.checksum.clone(),
            })
            .collect(),
        read_ms: millis(stats.read_time),
        write_ms: millis(sink.write_time()),
        checksum_ms: millis(sink.checksum_time()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let checksum_label = args.checksum.map(|kind| format!("{kind:?}").to_ascii_lowercase());
    for file in &report.files {
        match (&file.checksum, &checksum_label) {
            (Some(sum), Some(label)) => {
                println!("{:<40} {:>8}  {label}:{sum}", file.path, file.size);
            }
            _ => println!("{:<40} {:>8}", file.path, file.size),
        }
    }
    println!();
    println!(
        "{} files, {} data bytes from {} stream bytes",
        report.files.len(),
        report.files.iter().map(|f| f.size).sum::<u64>(),
        report.bytes_read
    );
    println!(
        "read {:.1} ms, write {:.1} ms, checksum {:.1} ms",
        report.read_ms, report.write_ms, report.checksum_ms
    );
    Ok(())
}

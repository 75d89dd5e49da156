/// Implementation of `cstream inspect`.
///
/// Decodes a stream without keeping file contents and prints its outline:
///
/// ```text
/// job42/
///   sub/
///     b.bin (application/octet-stream, 3 bytes)
///   a.bin (application/octet-stream, 7 bytes)
/// ```
///
/// With `--json` the same tree is printed as nested objects.
use std::fs::File;

use anyhow::{Context, Result};
use cstream_decoder::{DecoderConfig, decode_tree};
use cstream_types::Container;
use serde::Serialize;

use crate::InspectArgs;

#[derive(Serialize)]
struct ContainerReport<'a> {
    name: &'a str,
    containers: Vec<ContainerReport<'a>>,
    files: Vec<FileReport<'a>>,
}

#[derive(Serialize)]
struct FileReport<'a> {
    name: &'a str,
    mime_type: &'a str,
    size: u64,
}

impl<'a> From<&'a Container> for ContainerReport<'a> {
    fn from(c: &'a Container) -> Self {
        Self {
            name: c.name(),
            containers: c.containers().iter().map(ContainerReport::from).collect(),
            files: c
                .files()
                .iter()
                .map(|f| FileReport {
                    name: f.name(),
                    mime_type: f.mime_type(),
                    size: f.size(),
                })
                .collect(),
        }
    }
}

/// # Errors
///
/// Fails if the file cannot be opened or does not hold a complete,
/// well-formed stream.
pub fn run(args: &InspectArgs) -> Result<()> {
    let file =
        File::open(&args.file).with_context(|| format!("cannot open {}", args.file.display()))?;
    let len = file.metadata()?.len();

    let root = decode_tree(file, len, DecoderConfig::default())
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ContainerReport::from(&root))?);
    } else {
        println!("{}", root.outline());
    }
    Ok(())
}

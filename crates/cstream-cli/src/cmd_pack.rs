/// Implementation of `cstream pack`.
///
/// Walks a directory (sorted, so output only depends on the tree), encodes
/// it, and prints a one-line summary:
///
/// ```text
/// out.cs: 472 bytes (1 nested containers, 2 files, 10 data bytes)
/// ```
use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use cstream_encoder::{StreamEncoder, write_tar};
use cstream_types::Container;
use log::info;

use crate::{Format, PackArgs};

/// # Errors
///
/// Fails if the directory cannot be walked, the output cannot be created,
/// a name cannot be encoded, or a file changes size while being read.
pub fn run(args: &PackArgs) -> Result<()> {
    let root = Container::from_directory(&args.dir, &args.mime_type)
        .with_context(|| format!("cannot read {}", args.dir.display()))?;
    info!(
        "{}: {} containers, {} files",
        args.dir.display(),
        root.container_count() + 1,
        root.file_count()
    );

    let out = File::create(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;
    let out = BufWriter::new(out);

    let written = match args.format {
        Format::Multipart => {
            let mut encoder = StreamEncoder::new(&root, out)?;
            if let Some(seed) = args.seed {
                encoder = encoder.with_seed(seed);
            }
            encoder.encode_all()
        }
        Format::Tar => write_tar(&root, out),
    }
    .with_context(|| format!("failed to encode {}", args.dir.display()))?
    .1;

    println!(
        "{}: {written} bytes ({} nested containers, {} files, {} data bytes)",
        args.output.display(),
        root.container_count(),
        root.file_count(),
        root.data_size()
    );
    Ok(())
}

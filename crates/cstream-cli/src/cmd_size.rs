/// Implementation of `cstream size`.
///
/// Prints the byte count `pack` would produce for a directory, computed
/// from names and file sizes alone.
use anyhow::{Context, Result};
use cstream_encoder::{compute_total_size, tar_size};
use cstream_types::Container;

use crate::{Format, SizeArgs};

pub fn run(args: &SizeArgs) -> Result<()> {
    let root = Container::from_directory(&args.dir, &args.mime_type)
        .with_context(|| format!("cannot read {}", args.dir.display()))?;

    let size = match args.format {
        Format::Multipart => compute_total_size(&root),
        Format::Tar => tar_size(&root),
    };
    println!("{size}");
    Ok(())
}

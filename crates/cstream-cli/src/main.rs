/// cstream command-line tool: pack directory trees into container streams,
/// unpack them again, and look inside without unpacking.
///
/// # Command overview
///
/// ```text
/// cstream <COMMAND> [OPTIONS]
///
/// Commands:
///   pack       Encode a directory tree into a stream (or a tar archive)
///   unpack     Decode a stream into a directory
///   inspect    Print the structure carried by a stream
///   size       Predict the encoded size of a directory tree
///   help       Print help information
///
/// Global options:
///   -v, --verbose    More log output (repeat for more; RUST_LOG also works)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                       |
/// |------|-----------------------------------------------|
/// | 0    | Success                                       |
/// | 1    | Error (I/O failure, malformed stream, etc.)   |
///
/// Errors and log output go to stderr so stdout can be piped.
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use cstream_decoder::ChecksumKind;

mod cmd_inspect;
mod cmd_pack;
mod cmd_size;
mod cmd_unpack;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Container stream tool.
#[derive(Parser)]
#[command(name = "cstream", version, about = "Streaming multipart container codec")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Encode a directory tree.
    Pack(PackArgs),
    /// Decode a stream into a directory.
    Unpack(UnpackArgs),
    /// Print the structure of a stream.
    Inspect(InspectArgs),
    /// Predict the encoded size of a directory tree.
    Size(SizeArgs),
}

/// Output format for `pack` and `size`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Nested multipart/mixed container stream.
    #[default]
    Multipart,
    /// ustar archive.
    Tar,
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `cstream pack`.
///
/// ```text
/// ┌─────────────┬──────────────────────────────────────────────────────┐
/// │ Flag        │ Effect                                               │
/// ├─────────────┼──────────────────────────────────────────────────────┤
/// │ --mime-type │ Mime type recorded for every file                    │
/// │ --format    │ multipart (default) | tar                            │
/// │ --seed      │ Deterministic boundaries (reproducible output)       │
/// └─────────────┴──────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct PackArgs {
    /// Directory to encode; it becomes the root container.
    pub dir: PathBuf,

    /// Output file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Mime type recorded for every file.
    #[arg(long, default_value = "application/octet-stream")]
    pub mime_type: String,

    #[arg(long, value_enum, default_value_t = Format::Multipart)]
    pub format: Format,

    /// Seed for boundary generation.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `cstream unpack`.
///
/// The stream's length is taken from the file size, the way a transport
/// would announce it ahead of the body.
///
/// ```text
/// ┌────────────────────┬─────────────────────────────────────────────┐
/// │ Flag               │ Values / default                            │
/// ├────────────────────┼─────────────────────────────────────────────┤
/// │ --read-block-size  │ bytes per read() on the input (65536)       │
/// │ --write-block-size │ bytes per write() on output files (65536)   │
/// │ --checksum         │ crc32 | blake3 (none)                       │
/// │ --json             │ machine-readable report on stdout           │
/// └────────────────────┴─────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct UnpackArgs {
    /// Stream to decode.
    pub file: PathBuf,

    /// Directory the root container is created in.
    #[arg(short = 'd', long = "dest")]
    pub dest: PathBuf,

    #[arg(long, default_value_t = cstream_decoder::config::DEFAULT_READ_BLOCK_SIZE)]
    pub read_block_size: usize,

    #[arg(long, default_value_t = cstream_decoder::config::DEFAULT_WRITE_BLOCK_SIZE)]
    pub write_block_size: usize,

    /// Checksum every written file.
    #[arg(long)]
    pub checksum: Option<ChecksumKind>,

    #[arg(long)]
    pub json: bool,
}

/// Arguments for `cstream inspect`.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Stream to inspect.
    pub file: PathBuf,

    /// Print the tree as JSON instead of an outline.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `cstream size`.
#[derive(clap::Args)]
pub struct SizeArgs {
    /// Directory whose encoded size is computed.
    pub dir: PathBuf,

    #[arg(long, default_value = "application/octet-stream")]
    pub mime_type: String,

    #[arg(long, value_enum, default_value_t = Format::Multipart)]
    pub format: Format,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Pack(args) => cmd_pack::run(&args),
        Commands::Unpack(args) => cmd_unpack::run(&args),
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Size(args) => cmd_size::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

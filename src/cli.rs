// Idiomatic Rust CLI for Oxiqoi.
//
// Converts between raw interleaved pixel files and QOI streams, and prints
// header and chunk information for existing QOI files.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::io::{self as qio, RawLayout};
use crate::qoi::chunk::{Chunk, ChunkIterator, MAX_RUN};
use crate::qoi::decoder::ChunkDecoder;
use crate::qoi::encoder::ChunkStats;
use crate::qoi::header::{self, Descriptor, HEADER_LEN, MAX_PIXELS};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default colorspace flag for `encode` (all channels linear).
const DEFAULT_COLORSPACE: u8 = 1;
const DEFAULT_CHANNELS: u8 = 4;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// QOI (Quite OK Image) encoder/decoder.
#[derive(Parser, Debug)]
#[command(
    name = "oxiqoi",
    version,
    about = "QOI image encoder/decoder",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode a raw interleaved RGB/RGBA file to QOI.
    Encode(EncodeArgs),
    /// Decode a QOI file to raw interleaved pixels.
    Decode(DecodeArgs),
    /// Print the QOI header.
    Header(PrintArgs),
    /// Print every chunk of a QOI file.
    Chunks(PrintArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Image width in pixels.
    #[arg(long, short = 'W')]
    width: u32,

    /// Image height in pixels.
    #[arg(long, short = 'H')]
    height: u32,

    /// Channels per pixel in the raw input (3 or 4).
    #[arg(long, short = 'C', value_parser = clap::value_parser!(u8).range(3..=4), default_value_t = DEFAULT_CHANNELS)]
    channels: u8,

    /// Colorspace flag (0 = sRGB with linear alpha, 1 = all linear).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1), default_value_t = DEFAULT_COLORSPACE)]
    colorspace: u8,

    /// Raw input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// QOI output file.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Validate only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    /// QOI input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Raw output file.
    #[arg(value_hint = ValueHint::FilePath, required_unless_present = "no_output")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PrintArgs {
    /// QOI input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Encode,
    Decode,
    PrintHeader,
    PrintChunks,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    no_output: bool,
    layout: RawLayout,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Config,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        no_output: false,
        layout: RawLayout {
            width: 0,
            height: 0,
            channels: DEFAULT_CHANNELS,
            colorspace: DEFAULT_COLORSPACE,
        },
        input_file: None,
        output_file: None,
    };

    match cli.command {
        Cmd::Encode(args) => {
            opts.command = Command::Encode;
            opts.layout = RawLayout {
                width: args.width,
                height: args.height,
                channels: args.channels,
                colorspace: args.colorspace,
            };
            opts.input_file = Some(args.input);
            opts.output_file = Some(args.output);
        }
        Cmd::Decode(args) => {
            opts.command = Command::Decode;
            opts.no_output = args.no_output;
            opts.input_file = Some(args.input);
            opts.output_file = args.output;
        }
        Cmd::Header(args) => {
            opts.command = Command::PrintHeader;
            opts.input_file = Some(args.input);
        }
        Cmd::Chunks(args) => {
            opts.command = Command::PrintChunks;
            opts.input_file = Some(args.input);
        }
        Cmd::Config => {}
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxiqoi".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn refuse_overwrite(path: &Path, force: bool) -> bool {
    if path.exists() && !force {
        eprintln!(
            "oxiqoi: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return true;
    }
    false
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn stats_json(stats: &ChunkStats) -> serde_json::Value {
    serde_json::json!({
        "rgb": stats.rgb,
        "rgba": stats.rgba,
        "index": stats.index,
        "diff": stats.diff,
        "luma": stats.luma,
        "run": stats.run,
        "run_pixels": stats.run_pixels,
    })
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => eprintln!("{text}"),
        Err(e) => log::warn!("json serialization failed: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("oxiqoi version {version} (Rust), Copyright (C) oxiqoi contributors");
    eprintln!("Licensed under the MIT License");

    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("QOI_HEADER_LEN={HEADER_LEN}");
    eprintln!("QOI_MAX_PIXELS={MAX_PIXELS}");
    eprintln!("QOI_MAX_RUN={MAX_RUN}");
    eprintln!("DEFAULT_COLORSPACE={DEFAULT_COLORSPACE}");
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Encode command
// ---------------------------------------------------------------------------

fn cmd_encode(opts: &Options) -> i32 {
    let (Some(input), Some(output)) = (&opts.input_file, &opts.output_file) else {
        eprintln!("oxiqoi: encode needs an input and an output file");
        return 1;
    };
    if refuse_overwrite(output, opts.force) {
        return 1;
    }

    let stats = match qio::encode_file(input, output, opts.layout) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("oxiqoi: {}: {e}", input.display());
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        let ratio = stats.qoi_size as f64 / stats.raw_size.max(1) as f64;
        eprintln!(
            "oxiqoi: encoder: raw size: {}, qoi size: {} ({:.1}%), chunks: {}",
            stats.raw_size,
            stats.qoi_size,
            ratio * 100.0,
            stats.chunks.chunks()
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "encode",
            "width": opts.layout.width,
            "height": opts.layout.height,
            "channels": opts.layout.channels,
            "colorspace": opts.layout.colorspace,
            "raw_size": stats.raw_size,
            "qoi_size": stats.qoi_size,
            "chunks": stats_json(&stats.chunks),
            "raw_sha256": stats.raw_sha256.map(|d| hex(&d)),
        });
        print_json(&json);
    }

    0
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(opts: &Options) -> i32 {
    let Some(input) = &opts.input_file else {
        eprintln!("oxiqoi: decode needs an input file");
        return 1;
    };

    if opts.no_output {
        let bytes = match std::fs::read(input) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("oxiqoi: input file: {}: {e}", input.display());
                return 1;
            }
        };
        return match crate::engine::decode(&bytes) {
            Ok(raster) => {
                if !opts.quiet {
                    eprintln!(
                        "oxiqoi: {}: ok, {}x{} pixels",
                        input.display(),
                        raster.width,
                        raster.height
                    );
                }
                0
            }
            Err(e) => {
                eprintln!("oxiqoi: decode error: {e}");
                1
            }
        };
    }

    let Some(output) = &opts.output_file else {
        eprintln!("oxiqoi: decode needs an output file");
        return 1;
    };
    if refuse_overwrite(output, opts.force) {
        return 1;
    }

    let stats = match qio::decode_file(input, output) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("oxiqoi: {}: {e}", input.display());
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        let d = &stats.descriptor;
        eprintln!(
            "oxiqoi: decoder: {}x{} channels={} qoi size: {}, raw size: {}",
            d.width, d.height, d.channels, stats.qoi_size, stats.raw_size
        );
    }

    if opts.json_output {
        let d = &stats.descriptor;
        let json = serde_json::json!({
            "command": "decode",
            "width": d.width,
            "height": d.height,
            "channels": d.channels,
            "colorspace": u8::from(d.colorspace),
            "qoi_size": stats.qoi_size,
            "raw_size": stats.raw_size,
            "raw_sha256": stats.raw_sha256.map(|d| hex(&d)),
        });
        print_json(&json);
    }

    0
}

// ---------------------------------------------------------------------------
// Print commands (header, chunks)
// ---------------------------------------------------------------------------

fn print_descriptor(input: &Path, descriptor: &Descriptor) {
    println!("QOI file:              {}", input.display());
    println!("Width:                 {}", descriptor.width);
    println!("Height:                {}", descriptor.height);
    println!("Channels:              {}", descriptor.channels);
    println!(
        "Colorspace:            {} ({:?})",
        u8::from(descriptor.colorspace),
        descriptor.colorspace
    );
}

/// Only the 14-byte header is read; the rest of the file is not checked.
fn cmd_header(opts: &Options) -> i32 {
    let Some(input) = &opts.input_file else {
        eprintln!("oxiqoi: no input file");
        return 1;
    };

    let descriptor = match qio::read_descriptor_file(input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("oxiqoi: {}: {e}", input.display());
            return 1;
        }
    };
    print_descriptor(input, &descriptor);

    if opts.json_output {
        let json = serde_json::json!({
            "command": "header",
            "width": descriptor.width,
            "height": descriptor.height,
            "channels": descriptor.channels,
            "colorspace": u8::from(descriptor.colorspace),
        });
        print_json(&json);
    }
    0
}

fn cmd_chunks(opts: &Options) -> i32 {
    let Some(input) = &opts.input_file else {
        eprintln!("oxiqoi: no input file");
        return 1;
    };

    let bytes = match std::fs::read(input) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("oxiqoi: input file: {}: {e}", input.display());
            return 1;
        }
    };

    let (descriptor, payload) = match header::split_frame(&bytes) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("oxiqoi: {}: {e}", input.display());
            return 1;
        }
    };

    print_descriptor(input, &descriptor);
    println!("Payload length:        {}", payload.len());
    println!();
    println!("  Offset  Pixel   Chunk");

    let mut state = ChunkDecoder::new();
    let mut stats = ChunkStats::default();
    let mut pixel_pos = 0u64;
    for item in ChunkIterator::new(payload, HEADER_LEN) {
        let (offset, chunk) = match item {
            Ok(c) => c,
            Err(e) => {
                eprintln!("oxiqoi: {}: {e}", input.display());
                return 1;
            }
        };
        let pixel = state.apply(chunk);
        stats.record(&chunk);
        let text = chunk.to_string();
        match chunk {
            Chunk::Index { .. } | Chunk::Diff { .. } | Chunk::Luma { .. } => println!(
                "  {offset:06}  {pixel_pos:06}  {text:<32} -> ({}, {}, {}, {})",
                pixel.r, pixel.g, pixel.b, pixel.a
            ),
            _ => println!("  {offset:06}  {pixel_pos:06}  {text}"),
        }
        pixel_pos += u64::from(chunk.pixel_count());
    }

    let expected = descriptor.pixel_count();
    println!();
    println!("Chunks:                {}", stats.chunks());
    println!("Pixels:                {pixel_pos} (declared {expected})");

    if opts.json_output {
        let json = serde_json::json!({
            "command": "chunks",
            "pixels": pixel_pos,
            "declared_pixels": expected,
            "chunks": stats_json(&stats),
        });
        print_json(&json);
    }

    if pixel_pos != expected {
        eprintln!("oxiqoi: {}: pixel count mismatch", input.display());
        return 1;
    }
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let default_filter = match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    log::debug!("resolved options: {opts:?}");

    let exit_code = match opts.command {
        Command::Encode => cmd_encode(&opts),
        Command::Decode => cmd_decode(&opts),
        Command::PrintHeader => cmd_header(&opts),
        Command::PrintChunks => cmd_chunks(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

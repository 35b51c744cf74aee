//! whiplace command-line tool
//!
//! Replaces every key of a key file found in a stream with its value.
//!
//! Usage:
//!   whiplace keys.tsv input.txt > output.txt
//!   cat input.txt | whiplace --separator '~' keys.txt
//!   whiplace --check keys.tsv

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use whiplace::{loader, Config, Engine};

#[derive(Parser, Debug)]
#[command(name = "whiplace")]
#[command(about = "Replace every key of KEYFILE found in INPUT with its value")]
struct Args {
    /// Key file, one `key<SEP>value` record per line
    keyfile: PathBuf,

    /// Input file (stdin when omitted)
    input: Option<PathBuf>,

    /// Byte separating key from value in the key file
    #[arg(short, long, default_value = "\\t", value_parser = parse_separator)]
    separator: u8,

    /// Keep keys that have a shorter key as prefix, and match the longest key
    #[arg(long)]
    keep_masked: bool,

    /// Print masked keys to stderr and exit (status 1 if any) without substituting
    #[arg(long)]
    check: bool,

    /// Look-ahead buffer size in bytes (at least twice the longest key)
    #[arg(long)]
    buffer_size: Option<usize>,
}

fn parse_separator(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        "space" => Ok(b' '),
        _ => match s.as_bytes() {
            [b] => Ok(*b),
            _ => Err(format!("separator must be a single byte, got '{s}'")),
        },
    }
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let pairs = loader::load_file(&args.keyfile, args.separator)
        .with_context(|| format!("failed to read key file {}", args.keyfile.display()))?;

    let config = Config {
        prune_masked: !args.keep_masked,
        buffer_capacity: args.buffer_size,
    };
    let engine = Engine::with_config(pairs, config)?;

    tracing::info!(
        keys = engine.keys().count(),
        live_keys = engine.tree().live_keys(),
        masked = engine.masking_report().len(),
        buffer = engine.buffer_capacity(),
        "Engine ready"
    );

    if args.check {
        let report = engine.masking_report();
        let mut err = io::stderr().lock();
        for (masked, masking) in report.pairs(engine.keys()) {
            writeln!(
                err,
                "key '{}' is masked by '{}'",
                String::from_utf8_lossy(masked),
                String::from_utf8_lossy(masking)
            )?;
        }
        return Ok(if report.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let output = BufWriter::new(io::stdout().lock());
    let stats = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input {}", path.display()))?;
            engine.run_with_stats(file, output)?
        }
        None => engine.run_with_stats(io::stdin().lock(), output)?,
    };

    tracing::info!(
        bytes_read = stats.bytes_read,
        bytes_written = stats.bytes_written,
        replacements = stats.replacements,
        "Done"
    );

    Ok(ExitCode::SUCCESS)
}

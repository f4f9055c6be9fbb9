//! OEM Digest Tool
//!
//! Reads every OEM file in a directory, extracts the state-vector rows and
//! writes them as one JSON array of `{"epoch", "position"}` objects.
//!
//! Usage:
//!   cargo run --bin oem_digest -- [--input-dir DIR] [--output FILE] [--strict]
//!   cargo run --bin oem_digest -- --list

use clap::{ArgAction, Parser};
use oemfield::batch::{
    list_oem_file_names, DEFAULT_EXTENSION, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_PATH,
};
use oemfield::oem::RowLayout;
use oemfield::{Aggregator, BatchConfig, SkipPolicy};
use tracing_subscriber::EnvFilter;

/// Type alias for the error type used throughout this module
type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// OEM Digest Tool
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Extracts OEM state vectors from a directory into a JSON telemetry file",
    long_about = None
)]
struct Args {
    /// Directory containing the ephemeris files
    #[arg(short, long, default_value = DEFAULT_INPUT_DIR)]
    input_dir: String,

    /// JSON file to write
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    output: String,

    /// File name suffix of ephemeris files
    #[arg(short, long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Fail on malformed data lines instead of skipping them
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,

    /// Accept data rows with velocity columns after the position
    #[arg(long, action = ArgAction::SetTrue)]
    with_velocity_columns: bool,

    /// Print the matching file names as JSON and exit
    #[arg(short, long, action = ArgAction::SetTrue)]
    list: bool,

    /// Log every skipped line (overrides RUST_LOG)
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> BatchConfig {
        let skip_policy = if self.strict {
            SkipPolicy::Strict
        } else {
            SkipPolicy::Lenient
        };
        let row_layout = if self.with_velocity_columns {
            RowLayout::PositionPrefix
        } else {
            RowLayout::PositionOnly
        };

        BatchConfig::new(&self.input_dir, &self.output)
            .with_extension(self.extension.as_str())
            .with_skip_policy(skip_policy)
            .with_row_layout(row_layout)
    }
}

/// Filter directive: `--verbose` wins over `RUST_LOG`, which wins over `info`
fn filter_directive(verbose: bool, env_value: Option<String>) -> String {
    if verbose {
        return "debug".to_string();
    }
    env_value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

fn init_logging(verbose: bool) {
    let env_value = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::new(filter_directive(verbose, env_value));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = args.config();

    if args.list {
        let names = list_oem_file_names(&config.input_dir, &config.extension)?;
        println!("{}", serde_json::to_string(&names)?);
        return Ok(());
    }

    let summary = Aggregator::new(config).run()?;

    if let (Some(first), Some(last)) = (summary.first_epoch, summary.last_epoch) {
        println!("Epochs covered: {} .. {}", first, last);
    }
    if let Some((lo, hi)) = summary.radius_range {
        println!("Radius range: {:.3} .. {:.3}", lo, hi);
    }
    println!(
        "Wrote {} records from {} files to '{}'",
        summary.total_records,
        summary.files.len(),
        summary.output_path.display()
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

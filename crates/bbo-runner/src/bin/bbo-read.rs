//! # bbo-read
//!
//! Reader process: maps a capture log read-only, prints the first records
//! as a table and the price statistics over every valid record. Safe to run
//! while `bbo-capture` is still writing.
//!
//! ```bash
//! bbo-read market_data.bin --limit 20
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use bbo_core::config::DEFAULT_LOG_FILE;
use bbo_core::reader::{LogReader, format_table, summary};
use clap::Parser;
use tracing::debug;

#[derive(Parser)]
#[command(name = "bbo-read", about = "Inspect a memory-mapped BBO capture log")]
struct Cli {
    /// Log file to read.
    #[arg(default_value = DEFAULT_LOG_FILE)]
    path: PathBuf,

    /// Number of records to print.
    #[arg(short = 'n', long, default_value_t = 10)]
    limit: usize,

    /// Log level for diagnostics (stderr).
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    bbo_core::logging::init_logging(&cli.log_level, None, "bbo_read");

    // Nothing is printed unless the open succeeds.
    let reader = LogReader::open(&cli.path).with_context(|| format!("cannot read log {}", cli.path.display()))?;
    let counts = reader.scan();
    debug!("scanned {}: {counts:?}", reader.path().display());

    println!("File: {}", reader.path().display());
    println!("File size: {} bytes", reader.file_size());
    println!("Slots: {}", reader.slot_count());
    println!("Valid records: {}", counts.filled);
    if counts.malformed > 0 {
        println!("Malformed slots: {}", counts.malformed);
    }
    println!();

    print!("{}", format_table(reader.records(), cli.limit));
    if counts.filled > cli.limit {
        println!("... ({} more records)", counts.filled - cli.limit);
    }
    println!();

    println!("{}", summary(reader.records()));
    Ok(())
}

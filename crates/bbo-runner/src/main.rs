//! # bbo-capture
//!
//! Writer process: connects to the Binance `bookTicker` stream (or replays a
//! file of recorded messages) and appends one record per update into a
//! pre-allocated memory-mapped log.
//!
//! # Usage
//!
//! ```bash
//! bbo-capture --config capture.json --out market_data.bin --capacity 1000000
//! bbo-capture --replay recorded.jsonl --out replay.bin
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use bbo_core::Side;
use bbo_core::config::{AppConfig, load_config};
use bbo_core::error::StoreError;
use bbo_core::store::AppendLog;
use bbo_md::{IngestLoop, IngestOptions, IngestReport, LineSource, MessageSource, StopReason, TickDecoder, WsFeed};
use clap::Parser;
use tracing::{error, info, warn};

/// BBO capture: feed → memory-mapped append log.
#[derive(Parser)]
#[command(name = "bbo-capture", about = "Capture best bid/offer updates into a memory-mapped log")]
struct Cli {
    /// Configuration file path (JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output log file (overrides `store.path`).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Log capacity in records (overrides `store.capacity_*`).
    #[arg(long)]
    capacity: Option<u64>,

    /// Symbol to capture, e.g. BTCUSDT.
    #[arg(long)]
    symbol: Option<String>,

    /// Book side to capture (bid or ask).
    #[arg(long)]
    side: Option<Side>,

    /// Replay newline-delimited messages from a file instead of connecting.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    /// CPU core to pin the ingestion thread to.
    #[arg(long)]
    cpu: Option<i32>,
}

impl Cli {
    /// Load the config file (if any) and apply CLI overrides.
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AppConfig::default(),
        };
        if let Some(out) = &self.out {
            config.store.path = out.clone();
        }
        if let Some(capacity) = self.capacity {
            config.store.capacity_slots = Some(capacity);
        }
        if let Some(symbol) = &self.symbol {
            config.feed.symbol = symbol.clone();
        }
        if let Some(side) = self.side {
            config.feed.side = side;
        }
        if let Some(level) = &self.log_level {
            config.logging.log_level = Some(level.clone());
        }
        if let Some(dir) = &self.log_dir {
            config.logging.log_path = Some(dir.clone());
        }
        if self.cpu.is_some() {
            config.cpu_affinity = self.cpu;
        }
        Ok(config)
    }
}

type IngestOutcome = (Result<IngestReport, StoreError>, AppendLog);

/// Run the ingestion loop on a blocking thread; the store comes back with
/// the outcome so it can be closed.
fn spawn_ingest(
    source: Box<dyn MessageSource + Send>,
    decoder: TickDecoder,
    store: AppendLog,
    options: IngestOptions,
    cancel: Arc<AtomicBool>,
    cpu_core: Option<i32>,
) -> tokio::task::JoinHandle<IngestOutcome> {
    tokio::task::spawn_blocking(move || {
        bbo_core::cpu_affinity::maybe_bind(cpu_core);
        let mut ingest = IngestLoop::new("capture", source, decoder, store).with_options(options).with_cancel(cancel);
        let result = ingest.run();
        (result, ingest.into_store())
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    // 1. Initialize logging
    let log_level = config.logging.log_level.clone().unwrap_or_else(|| "info".to_string());
    bbo_core::logging::init_logging(&log_level, config.logging.log_path.as_deref(), &config.logging.module_name());

    // 2. Create the backing log
    let capacity = config.store.effective_capacity()?;
    let store = AppendLog::open_or_create(&config.store.path, capacity)
        .with_context(|| format!("cannot create log {}", config.store.path.display()))?;

    let (url, decoder) = bbo_md::binance::build(&config.feed)?;
    let options = IngestOptions { progress_every: config.store.progress_every, flush_every: config.store.flush_every };
    let cancel = Arc::new(AtomicBool::new(false));

    // 3. Pick the message source
    let mut feed = None;
    let source: Box<dyn MessageSource + Send> = match &cli.replay {
        Some(path) => {
            info!("replaying {} into {}", path.display(), config.store.path.display());
            let file = File::open(path).with_context(|| format!("cannot open replay file {}", path.display()))?;
            Box::new(LineSource::new(BufReader::new(file)))
        }
        None => {
            let mut ws = WsFeed::new(url);
            info!("capturing {} ({:?}) into {}", ws.url(), config.feed.side, config.store.path.display());
            let source = ws.start();
            feed = Some(ws);
            Box::new(source)
        }
    };

    // 4. Run until the stream ends or Ctrl+C
    let mut handle = spawn_ingest(source, decoder, store, options, cancel.clone(), config.cpu_affinity);
    let joined = tokio::select! {
        joined = &mut handle => joined,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            cancel.store(true, Ordering::Release);
            if let Some(ws) = feed.as_mut() {
                ws.stop().await;
            }
            handle.await
        }
    };
    if let Some(mut ws) = feed {
        ws.stop().await;
    }

    // 5. Close the log, then report
    let (result, store) = joined.context("ingestion thread panicked")?;
    let log_path = store.path().map(|p| p.display().to_string()).unwrap_or_default();
    let used = store.close().with_context(|| format!("closing log {log_path}"))?;

    match result {
        Ok(report) => {
            info!(
                "capture finished: {used} records written to {log_path} (received={}, skipped={})",
                report.received, report.skipped
            );
            match report.stop {
                StopReason::EndOfStream | StopReason::Cancelled => Ok(()),
                StopReason::TransportFailed(e) => {
                    warn!("capture stopped by transport failure: {e}");
                    bail!("transport failed: {e}")
                }
            }
        }
        Err(e) => {
            error!("capture aborted: {e} ({used} records kept)");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("capture.json");
        let json = r#"{
            "logging": { "log_level": "debug" },
            "feed": { "symbol": "ETHUSDT", "side": "bid" },
            "store": { "path": "from_file.bin", "capacity_slots": 10, "progress_every": 5 }
        }"#;
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn cli_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path());
        let cli = Cli::try_parse_from([
            "bbo-capture",
            "--config",
            config_path.to_str().unwrap(),
            "--out",
            "from_cli.bin",
            "--capacity",
            "42",
            "--symbol",
            "SOLUSDT",
            "--side",
            "ask",
            "--log-level",
            "warn",
            "--cpu",
            "2",
        ])
        .unwrap();

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.store.path, PathBuf::from("from_cli.bin"));
        assert_eq!(config.store.effective_capacity().unwrap(), 42);
        assert_eq!(config.feed.symbol, "SOLUSDT");
        assert_eq!(config.feed.side, Side::Ask);
        assert_eq!(config.logging.log_level.as_deref(), Some("warn"));
        assert_eq!(config.cpu_affinity, Some(2));
        // Not overridden on the command line.
        assert_eq!(config.store.progress_every, 5);
    }

    #[test]
    fn config_file_values_kept_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path());
        let cli = Cli::try_parse_from(["bbo-capture", "-c", config_path.to_str().unwrap()]).unwrap();

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.store.path, PathBuf::from("from_file.bin"));
        assert_eq!(config.store.effective_capacity().unwrap(), 10);
        assert_eq!(config.feed.symbol, "ETHUSDT");
        assert_eq!(config.feed.side, Side::Bid);
        assert_eq!(config.logging.log_level.as_deref(), Some("debug"));
        assert_eq!(config.cpu_affinity, None);
    }

    #[test]
    fn defaults_without_config_file() {
        let cli = Cli::try_parse_from(["bbo-capture", "--side", "ask"]).unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.store.path, PathBuf::from(bbo_core::config::DEFAULT_LOG_FILE));
        assert_eq!(config.feed.side, Side::Ask);
    }

    #[test]
    fn unknown_side_is_rejected() {
        assert!(Cli::try_parse_from(["bbo-capture", "--side", "mid"]).is_err());
    }
}

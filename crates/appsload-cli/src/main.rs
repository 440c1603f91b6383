//! appsload - bulk loader for installed-app event records into memcached

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use appsload_core::{self_test, DeviceRouting, PipelineConfig, RetryPolicy};
use config::ConfigFile;

const DEFAULT_PATTERN: &str = "data/appsinstalled/*.tsv.gz";
const DEFAULT_IDFA: &str = "127.0.0.1:33013";
const DEFAULT_GAID: &str = "127.0.0.1:33014";
const DEFAULT_ADID: &str = "127.0.0.1:33015";
const DEFAULT_DVID: &str = "127.0.0.1:33016";
const DEFAULT_BATCH_SIZE: usize = 500;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_BACKOFF_MS: u64 = 100;

#[derive(Parser)]
#[command(name = "appsload")]
#[command(about = "Loads installed-app event records into memcached, sharded by device type")]
#[command(version)]
struct Cli {
    /// Glob pattern for input files
    #[arg(long)]
    pattern: Option<String>,

    /// idfa memcached endpoint (host:port)
    #[arg(long)]
    idfa: Option<String>,

    /// gaid memcached endpoint (host:port)
    #[arg(long)]
    gaid: Option<String>,

    /// adid memcached endpoint (host:port)
    #[arg(long)]
    adid: Option<String>,

    /// dvid memcached endpoint (host:port)
    #[arg(long)]
    dvid: Option<String>,

    /// Log would-be writes instead of dispatching them
    #[arg(long)]
    dry: bool,

    /// Run the codec self-test and exit
    #[arg(short = 't', long = "test")]
    test: bool,

    /// Write logs to this file instead of stderr
    #[arg(short = 'l', long = "log")]
    log: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Optional TOML config file (default: ./appsload.toml or OS config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Shard writer batch size before a bulk write is issued
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum write attempts per batch
    #[arg(long)]
    max_retries: Option<u32>,

    /// Base backoff between retries, in milliseconds
    #[arg(long)]
    base_backoff_ms: Option<u64>,
}

fn init_logging(log_path: Option<&PathBuf>, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if let Some(path) = log_path {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        builder.format_timestamp_secs();
    } else {
        builder.format_timestamp(None);
    }

    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_ref(), cli.verbose)?;

    if cli.test {
        return match self_test() {
            Ok(()) => {
                log::info!("codec self-test passed");
                Ok(())
            }
            Err(e) => {
                log::error!("codec self-test failed: {e}");
                anyhow::bail!("codec self-test failed: {e}");
            }
        };
    }

    let file_config = if let Some(path) = &cli.config {
        ConfigFile::from_file(path)?
    } else {
        ConfigFile::load()?
    };

    let pattern = cli
        .pattern
        .or(file_config.pattern)
        .unwrap_or_else(|| DEFAULT_PATTERN.to_string());

    let routing = DeviceRouting::new(
        cli.idfa.or(file_config.idfa).unwrap_or_else(|| DEFAULT_IDFA.to_string()),
        cli.gaid.or(file_config.gaid).unwrap_or_else(|| DEFAULT_GAID.to_string()),
        cli.adid.or(file_config.adid).unwrap_or_else(|| DEFAULT_ADID.to_string()),
        cli.dvid.or(file_config.dvid).unwrap_or_else(|| DEFAULT_DVID.to_string()),
    )
    .context("invalid memcached endpoint")?;

    let batch_size = cli
        .batch_size
        .or(file_config.batch_size)
        .unwrap_or(DEFAULT_BATCH_SIZE);
    let max_retries = cli
        .max_retries
        .or(file_config.max_retries)
        .unwrap_or(DEFAULT_MAX_RETRIES);
    let base_backoff_ms = cli
        .base_backoff_ms
        .or(file_config.base_backoff_ms)
        .unwrap_or(DEFAULT_BASE_BACKOFF_MS);

    let pipeline_config = PipelineConfig {
        batch_size,
        retry_policy: RetryPolicy::new(max_retries, Duration::from_millis(base_backoff_ms)),
        dry_run: cli.dry,
        ..PipelineConfig::default()
    };

    let summary = appsload_core::run(&pattern, &routing, &pipeline_config, None)
        .map_err(|e| anyhow::anyhow!("pipeline run failed: {e}"))?;

    println!(
        "files: {} seen, {} accepted, {} rejected, {} unopenable",
        summary.files_seen, summary.files_accepted, summary.files_rejected, summary.files_unopenable
    );
    println!(
        "records: {} processed, {} errors",
        summary.total_processed, summary.total_errors
    );

    Ok(())
}

//! Top-level run: enumerate input files, fan them out across a thread pool,
//! rename accepted files, and aggregate a run summary

use std::path::PathBuf;

use rayon::prelude::*;

use crate::file_processor::{process_file, unopenable_outcome, FileOutcome, PipelineConfig};
use crate::memcached::RealMemcachedClient;
use crate::routing::DeviceRouting;

/// Aggregate counters across every file seen in a run, for CLI reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub files_seen: u64,
    pub files_accepted: u64,
    pub files_rejected: u64,
    pub files_unopenable: u64,
    pub total_processed: u64,
    pub total_errors: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &FileOutcome, opened: bool) {
        self.files_seen += 1;
        self.total_processed += outcome.processed;
        self.total_errors += outcome.errors;
        if !opened {
            self.files_unopenable += 1;
        } else if outcome.accepted {
            self.files_accepted += 1;
        } else {
            self.files_rejected += 1;
        }
    }
}

/// Enumerate files matching `pattern`, sorted lexicographically by path.
pub fn discover_files(pattern: &str) -> Result<Vec<PathBuf>, glob::PatternError> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)?.filter_map(Result::ok).collect();
    paths.sort();
    Ok(paths)
}

/// Rename an accepted file in place with a leading "." marker, excluding it
/// from future glob matches.
fn mark_processed(path: &std::path::Path) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let base = path
        .file_name()
        .expect("glob-discovered paths always have a file name");
    let marked = dir.join(format!(".{}", base.to_string_lossy()));
    std::fs::rename(path, marked)
}

/// Run the whole pipeline: discover files, process each on a sized thread
/// pool, rename accepted files, and return the aggregate summary.
pub fn run(
    pattern: &str,
    routing: &DeviceRouting,
    config: &PipelineConfig,
    worker_threads: Option<usize>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let files = discover_files(pattern)?;
    log::info!("discovered {} input file(s) matching `{pattern}`", files.len());

    let threads = worker_threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;

    let routing = routing.clone();
    let config = *config;
    let socket_timeout = config.socket_timeout;

    let outcomes: Vec<(FileOutcome, bool)> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let routing = routing.clone();
                match process_file(path, &routing, &config, |device_type| {
                    RealMemcachedClient::connect(routing.endpoint(device_type), socket_timeout)
                        .map_err(|e| crate::error::OpenError::Connect(e.to_string()))
                }) {
                    Ok(outcome) => (outcome, true),
                    Err(e) => {
                        log::error!("{}: could not open: {e}", path.display());
                        (unopenable_outcome(path), false)
                    }
                }
            })
            .collect()
    });

    let mut summary = RunSummary::default();
    for (outcome, opened) in &outcomes {
        summary.record(outcome, *opened);
        if *opened && outcome.accepted {
            if let Err(e) = mark_processed(&outcome.path) {
                log::error!("{}: failed to mark processed: {e}", outcome.path.display());
            }
        }
    }

    log::info!(
        "run complete: seen={} accepted={} rejected={} unopenable={} processed={} errors={}",
        summary.files_seen,
        summary.files_accepted,
        summary.files_rejected,
        summary.files_unopenable,
        summary.total_processed,
        summary.total_errors
    );

    Ok(summary)
}

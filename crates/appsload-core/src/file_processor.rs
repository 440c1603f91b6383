//! Per-file pipeline stage: Opening -> Dispatching -> Draining -> Deciding -> Done

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use flate2::read::GzDecoder;

use crate::codec::encode;
use crate::error::OpenError;
use crate::memcached::MemcachedClient;
use crate::record::{parse_line, resolve_device_type, ParseOutcome};
use crate::retry::RetryPolicy;
use crate::routing::{DeviceRouting, DeviceType};
use crate::shard_writer::{run_shard_writer, ShardResult, ShardTask};

/// Fraction of errors to processed records above which a file is rejected.
pub const ERROR_RATE_THRESHOLD: f64 = 0.01;

/// Tuning knobs shared by every file processor and shard writer in a run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub retry_policy: RetryPolicy,
    pub drain_timeout: Duration,
    pub socket_timeout: Duration,
    pub channel_capacity: usize,
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::shard_writer::DEFAULT_BATCH_SIZE,
            retry_policy: RetryPolicy::default(),
            drain_timeout: crate::shard_writer::QUEUE_DRAIN_TIMEOUT,
            socket_timeout: Duration::from_secs(1),
            channel_capacity: 100_000,
            dry_run: false,
        }
    }
}

/// The outcome of processing one input file to completion (or failing to open it).
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub processed: u64,
    pub errors: u64,
    pub accepted: bool,
}

impl FileOutcome {
    fn unopened(path: PathBuf) -> Self {
        Self {
            path,
            processed: 0,
            errors: 0,
            accepted: false,
        }
    }

    fn err_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        self.errors as f64 / self.processed as f64
    }
}

/// Construct one memcached client per device type, via the given factory.
///
/// Abstracted out so tests can inject [`crate::memcached::MockMemcachedClient`]
/// instances instead of connecting to a real endpoint.
pub fn process_file<C, F>(
    path: &Path,
    routing: &DeviceRouting,
    config: &PipelineConfig,
    mut connect: F,
) -> Result<FileOutcome, OpenError>
where
    C: MemcachedClient + Send + 'static,
    F: FnMut(DeviceType) -> Result<C, OpenError>,
{
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(GzDecoder::new(file));

    let mut senders = Vec::with_capacity(DeviceType::ALL.len());
    let mut handles = Vec::with_capacity(DeviceType::ALL.len());

    for device_type in DeviceType::ALL {
        let (tx, rx) = mpsc::sync_channel::<ShardTask>(config.channel_capacity);
        let mut client = connect(device_type)?;
        let label = format!("{}:{}", path.display(), device_type.as_str());
        let batch_size = config.batch_size;
        let retry_policy = config.retry_policy;
        let drain_timeout = config.drain_timeout;

        let handle = thread::Builder::new()
            .name(label.clone())
            .spawn(move || {
                run_shard_writer(&label, &rx, &mut client, batch_size, retry_policy, drain_timeout)
            })
            .expect("failed to spawn shard writer thread");

        senders.push((device_type, tx));
        handles.push(handle);
    }

    let mut errors: u64 = 0;
    for line in reader.lines() {
        let line = line?;
        match parse_line(&line) {
            ParseOutcome::Empty => {}
            ParseOutcome::Malformed => {
                errors += 1;
            }
            ParseOutcome::Record(record) => match resolve_device_type(&record) {
                None => {
                    log::error!("unknown device_type `{}` in {}", record.device_type, path.display());
                    errors += 1;
                }
                Some(device_type) => {
                    let encoded = encode(&record);
                    if config.dry_run {
                        log::debug!("dry-run: would send {}", encoded.debug_form);
                    } else {
                        let (_, tx) = senders
                            .iter()
                            .find(|(dt, _)| *dt == device_type)
                            .expect("every DeviceType has a sender");
                        if tx.send(encoded).is_err() {
                            log::error!("shard writer for {device_type:?} hung up early");
                            errors += 1;
                        }
                    }
                }
            },
        }
    }

    // Dropping the senders signals each shard writer to wind down.
    drop(senders);

    let mut processed: u64 = 0;
    for handle in handles {
        let ShardResult {
            processed: p,
            errors: e,
        } = handle.join().expect("shard writer thread panicked");
        processed += p;
        errors += e;
    }

    let mut outcome = FileOutcome {
        path: path.to_path_buf(),
        processed,
        errors,
        accepted: false,
    };
    outcome.accepted = outcome.processed > 0 && outcome.err_rate() < ERROR_RATE_THRESHOLD;

    if outcome.accepted {
        log::info!(
            "{}: accepted (processed={}, errors={}, err_rate={:.4})",
            path.display(),
            outcome.processed,
            outcome.errors,
            outcome.err_rate()
        );
    } else {
        log::error!(
            "{}: rejected (processed={}, errors={}, err_rate={:.4})",
            path.display(),
            outcome.processed,
            outcome.errors,
            outcome.err_rate()
        );
    }

    Ok(outcome)
}

/// Convenience for the dispatcher: an `Unopenable` short-circuit that never
/// spawned any shard writers. Kept separate from [`process_file`]'s own
/// `Err` path so callers can log the path even on an I/O failure.
pub fn unopenable_outcome(path: &Path) -> FileOutcome {
    FileOutcome::unopened(path.to_path_buf())
}

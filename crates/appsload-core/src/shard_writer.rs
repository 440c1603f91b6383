//! One shard writer: drains a file's per-device-type channel, batches,
//! writes to memcached, retries, and reports counters

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::codec::EncodedRecord;
use crate::memcached::MemcachedClient;
use crate::retry::RetryPolicy;

/// Default batch size before a bulk write is issued.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// How long a shard writer waits on an empty channel before checking again.
pub const QUEUE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// An encoded record bound for exactly one shard writer.
pub type ShardTask = EncodedRecord;

/// Per-worker counters, summed into the file's totals once all shards finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardResult {
    pub processed: u64,
    pub errors: u64,
}

impl ShardResult {
    fn add_batch(&mut self, batch_len: usize, failures_len: usize) {
        // Always use the real batch size here — never a hardcoded constant.
        self.processed += (batch_len - failures_len) as u64;
        self.errors += failures_len as u64;
    }
}

/// Run one shard writer to completion, returning its final counters.
///
/// Blocks the calling thread; callers spawn one of these per (file,
/// device_type) and join all four before aggregating.
pub fn run_shard_writer<C: MemcachedClient>(
    shard_label: &str,
    receiver: &Receiver<ShardTask>,
    client: &mut C,
    batch_size: usize,
    retry_policy: RetryPolicy,
    drain_timeout: Duration,
) -> ShardResult {
    let mut result = ShardResult::default();
    let mut pending: HashMap<String, Vec<u8>> = HashMap::new();

    loop {
        match receiver.recv_timeout(drain_timeout) {
            Ok(task) => {
                pending.insert(task.key, task.payload);
                if pending.len() >= batch_size {
                    flush(shard_label, client, &mut pending, retry_policy, &mut result);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !pending.is_empty() {
                    flush(shard_label, client, &mut pending, retry_policy, &mut result);
                }
                // Keep polling: the producer may simply be slow. Termination
                // is driven by the channel disconnecting, below.
            }
            Err(RecvTimeoutError::Disconnected) => {
                if !pending.is_empty() {
                    flush(shard_label, client, &mut pending, retry_policy, &mut result);
                }
                break;
            }
        }
    }

    result
}

/// Issue a bulk write for `pending`, retrying failed keys with backoff,
/// then fold the outcome into `result` and clear `pending`.
fn flush<C: MemcachedClient>(
    shard_label: &str,
    client: &mut C,
    pending: &mut HashMap<String, Vec<u8>>,
    retry_policy: RetryPolicy,
    result: &mut ShardResult,
) {
    let batch_len = pending.len();
    let mut attempt_items = std::mem::take(pending);
    let mut failed_keys: Vec<String> = Vec::new();

    for attempt in 0..retry_policy.max_attempts {
        match client.set_multi(&attempt_items) {
            Ok(failures) if failures.is_empty() => {
                failed_keys = Vec::new();
                break;
            }
            Ok(failures) => {
                failed_keys = failures;
            }
            Err(e) => {
                log::error!("{shard_label}: write failed: {e}");
                failed_keys = attempt_items.keys().cloned().collect();
                break;
            }
        }

        let is_last_attempt = attempt + 1 == retry_policy.max_attempts;
        if is_last_attempt {
            break;
        }

        std::thread::sleep(retry_policy.backoff(attempt + 1));
        attempt_items.retain(|k, _| failed_keys.contains(k));
    }

    if !failed_keys.is_empty() {
        log::error!(
            "{shard_label}: cannot write {} key(s) after {} attempt(s)",
            failed_keys.len(),
            retry_policy.max_attempts
        );
    }

    result.add_batch(batch_len, failed_keys.len());
}

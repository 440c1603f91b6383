//! Memcached client contract and two implementations: a production adapter
//! over the real `memcache` crate, and an in-memory mock used by the test
//! suite.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::WriteError;

/// Minimal memcached transport the shard writer depends on.
///
/// One instance is owned and used sequentially by exactly one shard writer
/// thread — implementations need not be `Sync`.
pub trait MemcachedClient {
    /// Write every (key, payload) pair, returning the keys that failed.
    ///
    /// A `WriteError` means the call could not be attempted at all (e.g. no
    /// connection); the caller treats every key in `items` as failed.
    fn set_multi(&mut self, items: &HashMap<String, Vec<u8>>) -> Result<Vec<String>, WriteError>;
}

/// Production client adapting the `memcache` crate's sync [`memcache::Client`].
pub struct RealMemcachedClient {
    inner: memcache::Client,
}

impl RealMemcachedClient {
    /// Connect to a single memcached endpoint with the given socket timeout.
    pub fn connect(address: &str, socket_timeout: Duration) -> Result<Self, WriteError> {
        let url = format!("memcache://{address}?timeout={}", socket_timeout.as_secs());
        let inner = memcache::Client::connect(url.as_str())
            .map_err(|e| WriteError::Connect(format!("{address}: {e}")))?;
        Ok(Self { inner })
    }
}

impl MemcachedClient for RealMemcachedClient {
    fn set_multi(&mut self, items: &HashMap<String, Vec<u8>>) -> Result<Vec<String>, WriteError> {
        // The `memcache` crate has no native multi-set; adapt it by issuing
        // one `set` per key and collecting the ones that errored.
        let mut failed = Vec::new();
        for (key, payload) in items {
            match self.inner.set(key.as_str(), payload.as_slice(), 0) {
                Ok(()) => {}
                Err(e) => {
                    log::debug!("set_multi: key `{key}` failed: {e}");
                    failed.push(key.clone());
                }
            }
        }
        Ok(failed)
    }
}

/// In-memory test double, scriptable with canned per-call failure lists.
///
/// Each call to [`set_multi`](MemcachedClient::set_multi) consumes the next
/// scripted failure set (or none, once the script is exhausted), letting
/// tests model "fails once then succeeds" and "permanently fails" shards.
pub struct MockMemcachedClient {
    store: HashMap<String, Vec<u8>>,
    /// Keys to report as failed on each successive call, in order.
    script: Vec<Vec<String>>,
    call: usize,
}

impl MockMemcachedClient {
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            script: Vec::new(),
            call: 0,
        }
    }

    /// Always report these keys as failed, every call (permanent failure).
    pub fn always_fail(keys: Vec<String>) -> Self {
        Self {
            store: HashMap::new(),
            script: vec![keys],
            call: usize::MAX, // never advances past index 0
        }
    }

    /// Fail with the given key lists on the first calls, then succeed.
    pub fn fail_then_succeed(script: Vec<Vec<String>>) -> Self {
        Self {
            store: HashMap::new(),
            script,
            call: 0,
        }
    }

    pub fn stored(&self, key: &str) -> Option<&[u8]> {
        self.store.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
}

impl Default for MockMemcachedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemcachedClient for MockMemcachedClient {
    fn set_multi(&mut self, items: &HashMap<String, Vec<u8>>) -> Result<Vec<String>, WriteError> {
        let failing: Vec<String> = if self.call == usize::MAX {
            self.script[0].clone()
        } else {
            let failing = self.script.get(self.call).cloned().unwrap_or_default();
            self.call += 1;
            failing
        };

        for (key, payload) in items {
            if !failing.contains(key) {
                self.store.insert(key.clone(), payload.clone());
            }
        }

        Ok(items
            .keys()
            .filter(|k| failing.contains(*k))
            .cloned()
            .collect())
    }
}

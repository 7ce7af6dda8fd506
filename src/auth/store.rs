//! Replay/lockout store abstraction and the in-memory backend
//!
//! The guard keeps all of its mutable state behind [`AttemptStore`]: failed
//! attempt counters per client and the global used-code marker. Every value
//! carries a TTL; an expired key reads as absent.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failure of the backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value store with per-key expiry
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Current value, `None` when absent or expired
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key` for `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Atomically add one to the counter at `key` and reset its expiry to `ttl`
    ///
    /// An absent or expired key counts from zero. Returns the new count.
    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<u64>;

    /// Atomically store `value` under `key` for `ttl` unless `key` already
    /// holds `value`, returning what was there before
    ///
    /// When the value is unchanged the entry, expiry included, is left
    /// untouched.
    async fn replace_if_changed(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> StoreResult<Option<String>>;
}

/// How often writes sweep expired entries out of a [`MemoryStore`]
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug)]
struct Entries {
    map: HashMap<String, Entry>,
    next_sweep: Instant,
}

impl Entries {
    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Insert, first dropping expired entries once per sweep interval
    fn insert(&mut self, key: &str, entry: Entry, sweep_interval: Duration) {
        let now = Instant::now();
        if now >= self.next_sweep {
            self.map.retain(|_, entry| entry.is_live(now));
            self.next_sweep = now + sweep_interval;
        }
        self.map.insert(key.to_string(), entry);
    }
}

/// Process-local store; state is lost on restart
///
/// Expired entries read as absent right away and are physically removed by
/// the first write after each sweep interval, so the map stays bounded by
/// the keys written within roughly one TTL plus one interval.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
    sweep_interval: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                next_sweep: Instant::now() + sweep_interval,
            }),
            sweep_interval,
        }
    }

    /// Number of stored entries, expired ones not yet swept included
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.lock().live_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.entries
            .lock()
            .insert(key, Entry::new(value.to_string(), ttl), self.sweep_interval);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().map.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        let mut entries = self.entries.lock();
        // A non-numeric value counts as zero
        let current = entries
            .live_value(key)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);
        let next = current + 1;
        entries.insert(key, Entry::new(next.to_string(), ttl), self.sweep_interval);
        Ok(next)
    }

    async fn replace_if_changed(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock();
        let previous = entries.live_value(key);
        if previous.as_deref() != Some(value) {
            entries.insert(key, Entry::new(value.to_string(), ttl), self.sweep_interval);
        }
        Ok(previous)
    }
}

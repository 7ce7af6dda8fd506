//! Redis-backed attempt store
//!
//! Counters and the used-code marker survive proxy restarts and are shared
//! by every proxy instance pointed at the same database.

use crate::auth::store::{AttemptStore, StoreError, StoreResult};
use crate::config::RedisSettings;
use crate::infrastructure::log_messages::application as messages;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Upper bound on a single store round-trip
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

/// Attempt store on a Redis server
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    operation_timeout: Duration,
}

impl RedisStore {
    /// Connect using the configured host, port, password and database
    pub async fn connect(settings: &RedisSettings) -> StoreResult<Self> {
        let url = settings.connection_url();
        let client = redis::Client::open(url.as_str()).map_err(backend)?;

        let connection = tokio::time::timeout(
            DEFAULT_OPERATION_TIMEOUT,
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| StoreError::Backend(format!("timed out connecting to {}", settings.host)))?
        .map_err(backend)?;

        info!(host = %settings.host, port = settings.port, db = settings.db, "{}", messages::REDIS_CONNECTED);

        Ok(Self {
            connection,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        })
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, operation: F) -> StoreResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.operation_timeout, operation)
            .await
            .map_err(|_| {
                StoreError::Backend(format!(
                    "no reply within {:?}",
                    self.operation_timeout
                ))
            })?
            .map_err(backend)
    }
}

/// INCR that counts a non-numeric value as zero instead of failing
const INCREMENT_SCRIPT: &str = r"
local count = (tonumber(redis.call('GET', KEYS[1])) or 0) + 1
redis.call('SET', KEYS[1], count, 'EX', ARGV[1])
return count
";

/// GETSET that leaves the key, expiry included, alone when unchanged
const REPLACE_IF_CHANGED_SCRIPT: &str = r"
local previous = redis.call('GET', KEYS[1])
if previous ~= ARGV[1] then
  redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
end
return previous
";

/// Redis rejects a zero expiry
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn backend(err: redis::RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl AttemptStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection.clone();
        self.bounded(async move {
            let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        self.bounded(async move {
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs(ttl))
                .query_async(&mut conn)
                .await?;
            Ok::<_, redis::RedisError>(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        self.bounded(async move {
            let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(())
        })
        .await
    }

    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        let mut conn = self.connection.clone();
        self.bounded(async move {
            let count: u64 = redis::Script::new(INCREMENT_SCRIPT)
                .key(key)
                .arg(ttl_secs(ttl))
                .invoke_async(&mut conn)
                .await?;
            Ok::<_, redis::RedisError>(count)
        })
        .await
    }

    async fn replace_if_changed(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> StoreResult<Option<String>> {
        let mut conn = self.connection.clone();
        self.bounded(async move {
            let previous: Option<String> = redis::Script::new(REPLACE_IF_CHANGED_SCRIPT)
                .key(key)
                .arg(value)
                .arg(ttl_secs(ttl))
                .invoke_async(&mut conn)
                .await?;
            Ok::<_, redis::RedisError>(previous)
        })
        .await
    }
}

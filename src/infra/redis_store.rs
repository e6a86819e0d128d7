//! Redis-backed translation store.

use std::time::Duration;

use async_trait::async_trait;
use redis::{Client, RedisError, aio::ConnectionManager};
use tracing::debug;

use crate::cache::{CacheError, CacheKey, CacheStore};

/// Shared multiplexed connection; cloned per command.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Open a managed connection to `url`. Fails when the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|err| CacheError::Unavailable(err.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|err| CacheError::Unavailable(err.to_string()))?;
        debug!(target = "transgate::cache::redis", "redis connection established");
        Ok(Self { connection })
    }
}

fn operation_error(err: RedisError) -> CacheError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        CacheError::Unavailable(err.to_string())
    } else {
        CacheError::operation(err)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn bulk_get(&self, keys: &[CacheKey]) -> Result<Vec<Option<String>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<&str> = keys.iter().map(CacheKey::as_str).collect();
        let mut connection = self.connection.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&names)
            .query_async(&mut connection)
            .await
            .map_err(operation_error)?;
        Ok(values)
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheError> {
        // EX rejects zero; one second is the shortest expiry Redis accepts.
        let seconds = ttl.as_secs().max(1);
        let mut connection = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(key.as_str())
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut connection)
            .await
            .map_err(operation_error)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(operation_error)?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}

//! Redis-backed [`CacheBackend`](super::backend::CacheBackend): the networked default.

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::backend::CacheBackend;
use super::error::CacheError;

/// Talks to a single Redis (or Redis-compatible) instance over a managed connection.
pub struct RedisBackend {
    manager: ConnectionManager,
}

impl RedisBackend {
    /// Connects to `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Unreachable {
            message: e.to_string(),
        })?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Unreachable {
                message: e.to_string(),
            })?;
        Ok(Self { manager })
    }
}

impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.manager.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|e| CacheError::OperationFailed {
                message: e.to_string(),
            })
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|e| CacheError::OperationFailed {
                message: e.to_string(),
            })
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| CacheError::Unreachable {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

//! No-op [`CacheBackend`](super::backend::CacheBackend): used when no backend URL is configured.
//! Every `get` misses, every `put` is a no-op, `ping` always succeeds.

use std::time::Duration;

use super::backend::CacheBackend;
use super::error::CacheError;

/// Absent-backend stand-in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

impl CacheBackend for NoopBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

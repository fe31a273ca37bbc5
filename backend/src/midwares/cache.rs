use std::{collections::HashMap, sync::Arc, time::Duration};
use async_trait::async_trait;
use futures::lock::Mutex;
use redis::{aio::MultiplexedConnection, AsyncCommands, AsyncConnectionConfig, Client as RedisClient};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("redis error: {0}")]
  Redis(#[from] redis::RedisError),
  #[error("encode error: {0}")]
  Encode(#[from] rmp_serde::encode::Error),
  #[error("decode error: {0}")]
  Decode(#[from] rmp_serde::decode::Error),
  #[error("cache did not answer within {0:?}")]
  Timeout(Duration),
}

/// Byte store with per-entry expiry. Entries are never invalidated early;
/// a read after the deadline is a miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
  async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

/// Cache key for a security's series. Names are free text, so they are
/// hashed rather than embedded.
pub fn series_key(security_name: &str) -> String {
  let digest = Sha256::digest(security_name.as_bytes());
  format!("sbl:series:{}", hex::encode(digest))
}

/// Redis-backed store. One multiplexed connection is shared by all requests
/// and rebuilt after a failure; every call is bounded by `op_timeout`.
#[derive(Clone)]
pub struct RedisCache {
  redis: Arc<RedisClient>,
  conn: Arc<Mutex<Option<MultiplexedConnection>>>,
  op_timeout: Duration,
}

impl RedisCache {
  pub fn new(redis_url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
    info!(?op_timeout, "redis instance initializing for result cache");
    let client = RedisClient::open(redis_url)?;
    Ok(Self { redis: Arc::new(client), conn: Arc::new(Mutex::new(None)), op_timeout })
  }

  async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
    let mut slot = self.conn.lock().await;
    if let Some(conn) = slot.as_ref() {
      return Ok(conn.clone());
    }

    let config = AsyncConnectionConfig::new()
      .set_connection_timeout(self.op_timeout)
      .set_response_timeout(self.op_timeout);
    let conn = self.redis.get_multiplexed_async_connection_with_config(&config).await?;
    *slot = Some(conn.clone());
    Ok(conn)
  }

  async fn reset(&self) {
    self.conn.lock().await.take();
  }

  /// Runs `op` under the deadline; any failure drops the shared connection
  /// so the next call reconnects.
  async fn bounded<T, F, Fut>(&self, op: F) -> Result<T, CacheError>
  where
    F: FnOnce(MultiplexedConnection) -> Fut,
    Fut: std::future::Future<Output = Result<T, CacheError>>,
  {
    let attempt = async {
      let conn = self.connection().await?;
      op(conn).await
    };

    let result = match tokio::time::timeout(self.op_timeout, attempt).await {
      Ok(result) => result,
      Err(_) => Err(CacheError::Timeout(self.op_timeout)),
    };
    if let Err(e) = &result {
      warn!("redis call failed, dropping connection: {}", e);
      self.reset().await;
    }
    result
  }
}

#[async_trait]
impl CacheStore for RedisCache {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
    self.bounded(|mut conn| async move {
      let value: Option<Vec<u8>> = conn.get(key).await?;
      Ok(value)
    }).await
  }

  async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
    self.bounded(|mut conn| async move {
      // SET with EX, redis drops the key on its own
      let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
      Ok(())
    }).await
  }
}

struct CacheEntry {
  value: Vec<u8>,
  expires_at: Instant,
}

/// In-process fallback used when no redis url is configured.
#[derive(Clone, Default)]
pub struct MemoryCache {
  entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn len(&self) -> usize {
    self.entries.lock().await.len()
  }
}

#[async_trait]
impl CacheStore for MemoryCache {
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
    let mut entries = self.entries.lock().await;

    match entries.get(key) {
      Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
      Some(_) => {
        entries.remove(key);
        Ok(None)
      },
      None => Ok(None),
    }
  }

  async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
    let mut entries = self.entries.lock().await;
    let now = Instant::now();
    entries.retain(|_, e| e.expires_at > now);
    entries.insert(key.to_string(), CacheEntry { value, expires_at: now + ttl });
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keys_are_hashed_and_stable() {
    let key = series_key("O'Reilly \"Corp\"; DROP TABLE x;--");
    assert!(key.starts_with("sbl:series:"));
    assert_eq!(key.len(), "sbl:series:".len() + 64);
    assert!(!key.contains('\''));
    assert_eq!(key, series_key("O'Reilly \"Corp\"; DROP TABLE x;--"));
    assert_ne!(series_key("A"), series_key("B"));
  }

  #[tokio::test(start_paused = true)]
  async fn memory_entries_expire_after_ttl() {
    let cache = MemoryCache::new();
    cache.set("k", vec![1, 2, 3], Duration::from_secs(60)).await.unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    assert_eq!(cache.get("k").await.unwrap(), Some(vec![1, 2, 3]));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.get("k").await.unwrap(), None);
    assert_eq!(cache.len().await, 0);
  }

  #[tokio::test(start_paused = true)]
  async fn set_sweeps_stale_entries() {
    let cache = MemoryCache::new();
    cache.set("old", vec![0], Duration::from_secs(1)).await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    cache.set("new", vec![1], Duration::from_secs(10)).await.unwrap();
    assert_eq!(cache.len().await, 1);
  }
}

//! Redis key-value service.

use async_trait::async_trait;
use parking_lot::{RwLock, RwLockWriteGuard};
use redis::Value;
use sessiondb_core::{Expiry, KeyValueService, KvResult};
use std::future::Future;
use tracing::debug;

use crate::{
    RedisConfig, RedisError, Result,
    pool::{RedisPool, RedisPoolBuilder},
};

/// Redis client exposing the narrow [`KeyValueService`] surface used by
/// session databases.
///
/// The service starts disconnected. [`KeyValueService::connect`] builds the
/// connection pool from the configuration as it is at that moment, and
/// [`KeyValueService::close`] drops it again.
pub struct RedisService {
    config: RwLock<RedisConfig>,
    pool: RwLock<Option<RedisPool>>,
}

impl RedisService {
    /// Create a disconnected service.
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config: RwLock::new(config),
            pool: RwLock::new(None),
        }
    }

    /// Snapshot of the configuration.
    pub fn config(&self) -> RedisConfig {
        self.config.read().clone()
    }

    /// Mutable access to the configuration.
    ///
    /// Changes are picked up by the next `connect`. A pool that is already
    /// established keeps its address, credentials and limits until `close`;
    /// the key prefix applies to the next command either way.
    pub fn config_mut(&self) -> RwLockWriteGuard<'_, RedisConfig> {
        self.config.write()
    }

    fn pool(&self) -> Result<RedisPool> {
        self.pool.read().clone().ok_or(RedisError::NotConnected)
    }

    fn key(&self, key: &str) -> String {
        self.config.read().prefixed_key(key)
    }

    async fn timed<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.config.read().command_timeout;
        tokio::time::timeout(timeout, op)
            .await
            .map_err(|_| RedisError::Timeout)?
    }

    async fn query<T: redis::FromRedisValue>(&self, cmd: redis::Cmd) -> Result<T> {
        let pool = self.pool()?;
        self.timed(async move {
            let mut conn = pool.get().await?;
            let value = cmd.query_async(&mut *conn).await?;
            Ok(value)
        })
        .await
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = self.key(key);
        let value: Value = match self.query(redis::cmd("GET").arg(&key).clone()).await {
            Ok(value) => value,
            Err(RedisError::Redis(err)) if err.code() == Some("WRONGTYPE") => {
                return Err(RedisError::WrongType(err.to_string()));
            }
            Err(err) => return Err(err),
        };

        match value {
            Value::Nil => Ok(None),
            Value::BulkString(bytes) => Ok(Some(bytes)),
            other => Err(RedisError::WrongType(format!("{:?}", other))),
        }
    }

    async fn store(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<()> {
        let key = self.key(key);
        let _: Value = self.query(write_command(&key, value, expiry)).await?;
        debug!(key = %key, expiry = %expiry, "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let key = self.key(key);
        let deleted: u32 = self.query(redis::cmd("DEL").arg(&key).clone()).await?;
        Ok(deleted > 0)
    }
}

/// Command persisting `value` under `key`. An elapsed expiry removes the key.
fn write_command(key: &str, value: Vec<u8>, expiry: Expiry) -> redis::Cmd {
    match expiry.ttl_seconds() {
        None => redis::cmd("DEL").arg(key).clone(),
        Some(0) => redis::cmd("SET").arg(key).arg(value).clone(),
        Some(secs) => redis::cmd("SET").arg(key).arg(value).arg("EX").arg(secs).clone(),
    }
}

#[async_trait]
impl KeyValueService for RedisService {
    async fn connect(&self) -> KvResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        let pool = RedisPoolBuilder::new(self.config()).build().await?;
        *self.pool.write() = Some(pool);
        Ok(())
    }

    async fn ping(&self) -> KvResult<()> {
        let _: String = self.query(redis::cmd("PING")).await.map_err(|e| match e {
            RedisError::Redis(err) => RedisError::Connection(err.to_string()),
            other => other,
        })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        Ok(self.fetch(key).await?)
    }

    async fn set(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> KvResult<()> {
        Ok(self.store(key, value, expiry).await?)
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        Ok(self.remove(key).await?)
    }

    async fn close(&self) -> KvResult<()> {
        if self.pool.write().take().is_some() {
            debug!("Redis connection pool closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.read().is_some()
    }
}

//! Redis connection pool.

use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use tracing::info;

use crate::{RedisConfig, RedisError, Result};

/// Type alias for the connection pool.
pub type RedisPool = Pool<RedisConnectionManager>;

/// Builder for creating Redis connection pools.
pub struct RedisPoolBuilder {
    config: RedisConfig,
}

impl RedisPoolBuilder {
    /// Create a new pool builder.
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    /// Build the connection pool.
    ///
    /// Waits for `min_idle` connections to be established, so an unreachable
    /// server fails here rather than on first use.
    pub async fn build(self) -> Result<RedisPool> {
        let url = self.config.connection_url()?;

        let manager =
            RedisConnectionManager::new(url).map_err(|e| RedisError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(self.config.pool_size.max(1))
            .min_idle(self.config.min_idle)
            .connection_timeout(self.config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| RedisError::Connection(e.to_string()))?;

        info!(
            pool_size = self.config.pool_size,
            url = %self.config.url,
            "Redis connection pool created"
        );

        Ok(pool)
    }
}

//! # sessiondb Redis
//!
//! Redis session database for sessiondb.
//!
//! ## Features
//!
//! - **Lazy connection**: the first `load` connects and pings; a failed
//!   attempt is retried by the next call
//! - **Connection pooling**: bb8 pool sized from [`RedisConfig`]
//! - **TTL propagation**: store lifetimes become Redis expirations
//! - **Async writes**: optional detached writes with bounded concurrency and
//!   [`RedisDatabase::flush`]
//! - **Layered configuration**: ordered [`RedisConfigOverlay`]s over defaults
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sessiondb_core::{Database, SyncPayload};
//! use sessiondb_redis::{RedisConfigOverlay, RedisDatabase};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = RedisDatabase::new([RedisConfigOverlay::default()
//!         .url("redis://localhost:6379")
//!         .key_prefix("myapp:session:")])
//!     .with_async(true);
//!
//!     let mut store = db.load("abc123").await;
//!     store.set("user_id", 42)?;
//!     db.sync(SyncPayload::update("abc123", store)).await;
//!
//!     // Drain detached writes, then release the pool.
//!     db.flush().await;
//!     db.close().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod database;
mod dispatch;
mod error;
mod pool;
mod service;

pub use config::{RedisConfig, RedisConfigBuilder, RedisConfigOverlay};
pub use database::RedisDatabase;
pub use dispatch::{DEFAULT_MAX_IN_FLIGHT, WriteDispatcher};
pub use error::{RedisError, Result};
pub use pool::{RedisPool, RedisPoolBuilder};
pub use service::RedisService;

// Re-export redis crate for convenience
pub use redis;

/// Prelude for common imports.
///
/// ```
/// use sessiondb_redis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RedisConfig, RedisConfigBuilder, RedisConfigOverlay};
    pub use crate::database::RedisDatabase;
    pub use crate::error::{RedisError, Result};
    pub use crate::service::RedisService;
    pub use sessiondb_core::prelude::*;
}

// sessiondb - session databases for session runtimes
//
// The session runtime keeps sessions in memory and hands persistence to a
// `Database`. This crate bundles the contract and the Redis backend.

// Re-export the contract
pub use sessiondb_core::*;

// Re-export optional crates
#[cfg(feature = "redis")]
pub use sessiondb_redis;

#[cfg(feature = "redis")]
pub use sessiondb_redis::{RedisConfig, RedisConfigOverlay, RedisDatabase, RedisService};

#[cfg(feature = "testing")]
pub use sessiondb_testing;

/// Prelude for common imports.
pub mod prelude {
    pub use sessiondb_core::prelude::*;

    #[cfg(feature = "redis")]
    pub use sessiondb_redis::{RedisConfig, RedisConfigOverlay, RedisDatabase, RedisService};
}

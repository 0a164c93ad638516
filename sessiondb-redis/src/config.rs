//! Redis configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{RedisError, Result};

/// Redis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://host:port or rediss://host:port for TLS).
    pub url: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// Minimum idle connections.
    pub min_idle: Option<u32>,
    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_connection_timeout")]
    pub connection_timeout: Duration,
    /// Command timeout.
    #[serde(with = "humantime_serde", default = "default_command_timeout")]
    pub command_timeout: Duration,
    /// Database number (0-15).
    pub database: Option<u8>,
    /// Username for Redis 6+ ACL.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Prefix prepended to every key.
    #[serde(default)]
    pub key_prefix: Option<String>,
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
            min_idle: None,
            connection_timeout: default_connection_timeout(),
            command_timeout: default_command_timeout(),
            database: None,
            username: None,
            password: None,
            key_prefix: None,
        }
    }
}

impl RedisConfig {
    /// Create a new configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> RedisConfigBuilder {
        RedisConfigBuilder::new()
    }

    /// Build a configuration by applying `overlays` in order on top of the
    /// defaults. Later overlays win.
    pub fn merged<I>(overlays: I) -> Self
    where
        I: IntoIterator<Item = RedisConfigOverlay>,
    {
        let mut config = Self::default();
        for overlay in overlays {
            config.apply(overlay);
        }
        config
    }

    /// Override every field the overlay sets.
    pub fn apply(&mut self, overlay: RedisConfigOverlay) {
        if let Some(url) = overlay.url {
            self.url = url;
        }
        if let Some(pool_size) = overlay.pool_size {
            self.pool_size = pool_size;
        }
        if let Some(min_idle) = overlay.min_idle {
            self.min_idle = Some(min_idle);
        }
        if let Some(timeout) = overlay.connection_timeout {
            self.connection_timeout = timeout;
        }
        if let Some(timeout) = overlay.command_timeout {
            self.command_timeout = timeout;
        }
        if let Some(database) = overlay.database {
            self.database = Some(database);
        }
        if let Some(username) = overlay.username {
            self.username = Some(username);
        }
        if let Some(password) = overlay.password {
            self.password = Some(password);
        }
        if let Some(prefix) = overlay.key_prefix {
            self.key_prefix = Some(prefix);
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `REDIS_URL`, `REDIS_POOL_SIZE`, `REDIS_DATABASE`,
    /// `REDIS_USERNAME`, `REDIS_PASSWORD` and `REDIS_KEY_PREFIX`. Unset or
    /// unparsable values keep their defaults.
    pub fn from_env() -> RedisConfigBuilder {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RedisConfigBuilder {
        let mut builder = RedisConfigBuilder::new();

        if let Some(url) = lookup("REDIS_URL") {
            builder = builder.url(url);
        }
        if let Some(size) = lookup("REDIS_POOL_SIZE").and_then(|v| v.parse().ok()) {
            builder = builder.pool_size(size);
        }
        if let Some(db) = lookup("REDIS_DATABASE").and_then(|v| v.parse().ok()) {
            builder = builder.database(db);
        }
        if let Some(username) = lookup("REDIS_USERNAME") {
            builder = builder.username(username);
        }
        if let Some(password) = lookup("REDIS_PASSWORD") {
            builder = builder.password(password);
        }
        if let Some(prefix) = lookup("REDIS_KEY_PREFIX") {
            builder = builder.key_prefix(prefix);
        }

        builder
    }

    /// Get the full Redis URL with auth and database.
    pub fn connection_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| RedisError::Config(format!("invalid url {:?}: {}", self.url, e)))?;

        if url.scheme() != "redis" && url.scheme() != "rediss" {
            return Err(RedisError::Config(
                "Redis URL must start with redis:// or rediss://".to_string(),
            ));
        }

        if let Some(password) = &self.password {
            // Redis 6+ ACL format is user:password@host, legacy is :password@host
            if let Some(username) = &self.username {
                url.set_username(username)
                    .map_err(|_| RedisError::Config("url cannot carry a username".to_string()))?;
            }
            url.set_password(Some(password))
                .map_err(|_| RedisError::Config("url cannot carry a password".to_string()))?;
        }

        if let Some(db) = self.database {
            url.set_path(&format!("/{}", db));
        }

        Ok(url.to_string())
    }

    /// Apply the key prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}{}", prefix, key),
            None => key.to_string(),
        }
    }
}

/// Partial configuration layered over [`RedisConfig`] defaults.
///
/// ```
/// use sessiondb_redis::{RedisConfig, RedisConfigOverlay};
///
/// let config = RedisConfig::merged([
///     RedisConfigOverlay::default().url("redis://cache:6379"),
///     RedisConfigOverlay::default().key_prefix("myapp:session:"),
/// ]);
/// assert_eq!(config.url, "redis://cache:6379");
/// assert_eq!(config.key_prefix.as_deref(), Some("myapp:session:"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedisConfigOverlay {
    /// Redis URL.
    pub url: Option<String>,
    /// Connection pool size.
    pub pool_size: Option<u32>,
    /// Minimum idle connections.
    pub min_idle: Option<u32>,
    /// Connection timeout.
    pub connection_timeout: Option<Duration>,
    /// Command timeout.
    pub command_timeout: Option<Duration>,
    /// Database number.
    pub database: Option<u8>,
    /// ACL username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Key prefix.
    pub key_prefix: Option<String>,
}

impl RedisConfigOverlay {
    /// Set the Redis URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the pool size.
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// Set the database number.
    pub fn database(mut self, db: u8) -> Self {
        self.database = Some(db);
        self
    }

    /// Set the credentials.
    pub fn auth(mut self, username: Option<String>, password: impl Into<String>) -> Self {
        self.username = username;
        self.password = Some(password.into());
        self
    }

    /// Set the key prefix.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

impl From<RedisConfig> for RedisConfigOverlay {
    fn from(config: RedisConfig) -> Self {
        Self {
            url: Some(config.url),
            pool_size: Some(config.pool_size),
            min_idle: config.min_idle,
            connection_timeout: Some(config.connection_timeout),
            command_timeout: Some(config.command_timeout),
            database: config.database,
            username: config.username,
            password: config.password,
            key_prefix: config.key_prefix,
        }
    }
}

/// Builder for Redis configuration.
#[derive(Default)]
pub struct RedisConfigBuilder {
    config: RedisConfig,
}

impl RedisConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RedisConfig::default(),
        }
    }

    /// Set the Redis URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Set the pool size.
    pub fn pool_size(mut self, size: u32) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Set the minimum idle connections.
    pub fn min_idle(mut self, min_idle: u32) -> Self {
        self.config.min_idle = Some(min_idle);
        self
    }

    /// Set the connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Set the command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Set the database number.
    pub fn database(mut self, db: u8) -> Self {
        self.config.database = Some(db);
        self
    }

    /// Set the username (Redis 6+ ACL).
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the key prefix.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = Some(prefix.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RedisConfig {
        self.config
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

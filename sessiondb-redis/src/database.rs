//! Redis-backed session database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLockWriteGuard;
use sessiondb_core::{
    Action, Clock, Database, Expiry, KeyValueService, KvResult, RemoteStore, SessionResult,
    SyncPayload, SystemClock,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace};

use crate::dispatch::WriteDispatcher;
use crate::{RedisConfig, RedisConfigOverlay, RedisService};

/// Session database persisting remote stores in Redis.
///
/// The connection is established lazily by the first `load` (or `sync`) and
/// reused afterwards. Reads fail open and writes are best-effort, see
/// [`Database`].
///
/// Nothing closes the connection implicitly: call [`Database::close`] on every
/// shutdown path, after [`RedisDatabase::flush`] if async writes are enabled.
///
/// # Examples
///
/// ```no_run
/// use sessiondb_core::{Database, RemoteStore, SyncPayload};
/// use sessiondb_redis::{RedisConfigOverlay, RedisDatabase};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = RedisDatabase::new([RedisConfigOverlay::default()
///         .url("redis://localhost:6379")
///         .key_prefix("myapp:session:")]);
///
///     let mut store = db.load("session-id").await;
///     store.set("user_id", 123)?;
///     store.expire_in(Duration::from_secs(3600));
///     db.sync(SyncPayload::update("session-id", store)).await;
///
///     db.close().await?;
///     Ok(())
/// }
/// ```
pub struct RedisDatabase<S: KeyValueService = RedisService> {
    shared: Arc<Shared<S>>,
    clock: Arc<dyn Clock>,
    async_writes: AtomicBool,
    dispatcher: WriteDispatcher,
}

struct Shared<S> {
    service: S,
    connect_gate: Mutex<()>,
}

impl RedisDatabase<RedisService> {
    /// Create a database over a Redis service configured by `overlays`,
    /// applied in order over the defaults.
    pub fn new<I>(overlays: I) -> Self
    where
        I: IntoIterator<Item = RedisConfigOverlay>,
    {
        Self::with_service(RedisService::new(RedisConfig::merged(overlays)))
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> RedisConfig {
        self.shared.service.config()
    }

    /// Mutable access to the active configuration.
    ///
    /// Intended for adjustments before first use. The configuration is read
    /// when the connection is established, so once connected, changes to the
    /// address, credentials or pool limits only take effect after
    /// [`Database::close`] and the reconnect triggered by the next `load`.
    pub fn config_mut(&self) -> RwLockWriteGuard<'_, RedisConfig> {
        self.shared.service.config_mut()
    }
}

impl<S: KeyValueService> RedisDatabase<S> {
    /// Create a database over any key-value service.
    pub fn with_service(service: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                service,
                connect_gate: Mutex::new(()),
            }),
            clock: Arc::new(SystemClock),
            async_writes: AtomicBool::new(false),
            dispatcher: WriteDispatcher::default(),
        }
    }

    /// Use `clock` to turn lifetimes into TTLs.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Enable or disable async writes (builder form of [`Self::set_async`]).
    pub fn with_async(self, enabled: bool) -> Self {
        self.set_async(enabled);
        self
    }

    /// Cap the number of async writes running at once.
    pub fn with_max_async_writes(mut self, limit: u32) -> Self {
        self.dispatcher = WriteDispatcher::new(limit);
        self
    }

    /// Switch between blocking and detached writes for subsequent `sync` calls.
    ///
    /// With async writes a `load` right after a `sync` of the same session
    /// may still see the previous value; call [`Self::flush`] first when that
    /// matters.
    pub fn set_async(&self, enabled: bool) {
        self.async_writes.store(enabled, Ordering::SeqCst);
    }

    /// Whether `sync` writes run detached.
    pub fn is_async(&self) -> bool {
        self.async_writes.load(Ordering::SeqCst)
    }

    /// Number of async writes still running.
    pub fn pending_writes(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Wait for every async write dispatched so far to finish.
    pub async fn flush(&self) {
        self.dispatcher.flush().await;
    }

    /// The underlying key-value service.
    pub fn service(&self) -> &S {
        &self.shared.service
    }
}

impl<S: KeyValueService> Shared<S> {
    async fn ensure_connected(&self) -> KvResult<()> {
        if self.service.is_connected() {
            return Ok(());
        }

        let _gate = self.connect_gate.lock().await;
        if self.service.is_connected() {
            return Ok(());
        }

        self.service.connect().await?;
        if let Err(err) = self.service.ping().await {
            // Leave the service disconnected so the next call retries.
            let _ = self.service.close().await;
            return Err(err);
        }

        info!("Session database connected");
        Ok(())
    }

    /// Apply `payload`, with TTLs measured from `now`.
    async fn write(&self, payload: SyncPayload, now: DateTime<Utc>) {
        let SyncPayload { session_id, action } = payload;

        if let Err(err) = self.ensure_connected().await {
            error!(session_id = %session_id, error = %err, "Session database error on connect");
            return;
        }

        match action {
            Action::Destroy => match self.service.delete(&session_id).await {
                Ok(existed) => debug!(session_id = %session_id, existed, "Session destroyed"),
                Err(err) => {
                    error!(session_id = %session_id, error = %err, "Failed to destroy session")
                }
            },
            Action::Update(store) => self.update(&session_id, &store, now).await,
        }
    }

    async fn update(&self, session_id: &str, store: &RemoteStore, now: DateTime<Utc>) {
        let expiry = Expiry::from_lifetime(store.lifetime, now);
        if expiry.is_elapsed() {
            debug!(session_id, "Session lifetime already elapsed, removing it");
            if let Err(err) = self.service.delete(session_id).await {
                error!(session_id, error = %err, "Failed to remove expired session");
            }
            return;
        }

        let bytes = match store.serialize() {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(session_id, error = %err, "Error while encoding the remote session store");
                return;
            }
        };

        match self.service.set(session_id, bytes, expiry).await {
            Ok(()) => trace!(session_id, expiry = %expiry, "Session stored"),
            Err(err) => error!(session_id, error = %err, "Failed to store session"),
        }
    }
}

#[async_trait]
impl<S: KeyValueService> Database for RedisDatabase<S> {
    async fn try_load(&self, session_id: &str) -> SessionResult<Option<RemoteStore>> {
        self.shared.ensure_connected().await?;

        let Some(bytes) = self.shared.service.get(session_id).await? else {
            trace!(session_id, "No stored session");
            return Ok(None);
        };

        Ok(Some(RemoteStore::decode(&bytes)?))
    }

    async fn sync(&self, payload: SyncPayload) {
        let now = self.clock.now();
        if self.is_async() {
            let shared = Arc::clone(&self.shared);
            self.dispatcher
                .dispatch(async move { shared.write(payload, now).await })
                .await;
        } else {
            self.shared.write(payload, now).await;
        }
    }

    async fn close(&self) -> SessionResult<()> {
        self.shared.service.close().await?;
        Ok(())
    }
}

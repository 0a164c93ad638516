//! Backend contracts: the session runtime's view of a database, and the
//! database's view of a key-value service.

use crate::error::{KvError, KvResult, SessionError, SessionResult};
use crate::expiry::Expiry;
use crate::store::{RemoteStore, SyncPayload};
use async_trait::async_trait;
use tracing::{error, warn};

/// Session database capability set expected by the session runtime.
///
/// Reads fail open: [`Database::load`] never surfaces an error and degrades
/// to an empty store, so a broken backend turns sessions anonymous instead
/// of failing requests. Writes are best-effort: [`Database::sync`] logs and
/// drops failures.
///
/// # Examples
///
/// ```ignore
/// use sessiondb_core::{Database, SyncPayload};
///
/// async fn logout(db: &dyn Database, session_id: &str) {
///     db.sync(SyncPayload::destroy(session_id)).await;
///     assert!(db.load(session_id).await.is_empty());
/// }
/// ```
#[async_trait]
pub trait Database: Send + Sync {
    /// Load a session, reporting failures.
    ///
    /// Returns `Ok(None)` when the session has never been stored (or was
    /// destroyed), and an error when the backend could not answer. Use this
    /// instead of [`Database::load`] when a transport failure should be
    /// retried rather than treated as "no session".
    async fn try_load(&self, session_id: &str) -> SessionResult<Option<RemoteStore>>;

    /// Load a session, degrading every failure to an empty store.
    async fn load(&self, session_id: &str) -> RemoteStore {
        match self.try_load(session_id).await {
            Ok(Some(store)) => store,
            Ok(None) => RemoteStore::default(),
            Err(SessionError::KeyValue(KvError::UnexpectedType(kind))) => {
                warn!(
                    session_id,
                    kind = %kind,
                    "Session should be stored as bytes, ignoring stored value"
                );
                RemoteStore::default()
            }
            Err(SessionError::Deserialization(err)) => {
                error!(
                    session_id,
                    error = %err,
                    "Stored value is not a valid remote store, ignoring it"
                );
                RemoteStore::default()
            }
            Err(err) => {
                error!(session_id, error = %err, "Failed to load session");
                RemoteStore::default()
            }
        }
    }

    /// Apply one state change. Failures are logged, never returned.
    async fn sync(&self, payload: SyncPayload);

    /// Shut down the connection to the backend.
    async fn close(&self) -> SessionResult<()>;
}

/// Minimal key-value client surface a database backend is built on.
///
/// Keys are passed verbatim; any namespacing is the service's concern.
#[async_trait]
pub trait KeyValueService: Send + Sync + 'static {
    /// Establish the connection.
    async fn connect(&self) -> KvResult<()>;

    /// Liveness check against the server.
    async fn ping(&self) -> KvResult<()>;

    /// Fetch raw bytes. A missing key yields `Ok(None)`.
    ///
    /// A value that is not a byte string yields [`KvError::UnexpectedType`].
    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>>;

    /// Store raw bytes with the given expiry.
    async fn set(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> KvResult<()>;

    /// Delete a key. Returns whether it existed; a missing key is not an error.
    async fn delete(&self, key: &str) -> KvResult<bool>;

    /// Close the connection.
    async fn close(&self) -> KvResult<()>;

    /// Whether a connection is currently established.
    fn is_connected(&self) -> bool;
}

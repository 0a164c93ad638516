//! Remote store snapshot and sync payloads exchanged with the session runtime.

use crate::error::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Serializable snapshot of one session, as persisted by a database backend.
///
/// `lifetime` is the absolute expiration time. `None` means the session never
/// expires.
///
/// # Examples
///
/// ```
/// use sessiondb_core::RemoteStore;
///
/// let mut store = RemoteStore::new();
/// store.set("user_id", 123).unwrap();
///
/// let bytes = store.serialize().unwrap();
/// let decoded = RemoteStore::decode(&bytes).unwrap();
/// assert_eq!(decoded.get::<i32>("user_id"), Some(123));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteStore {
    /// Session data as key-value pairs
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    /// Session expiration timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<DateTime<Utc>>,
}

impl RemoteStore {
    /// Create an empty store with no expiration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an absolute expiration time.
    pub fn with_lifetime(mut self, lifetime: DateTime<Utc>) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Expire `ttl` from now.
    ///
    /// A `ttl` too large to represent saturates at the latest representable
    /// time, so the store stays alive rather than expiring immediately.
    pub fn expire_in(&mut self, ttl: Duration) {
        let now = Utc::now();
        let lifetime = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.lifetime = Some(lifetime);
    }

    /// Check whether the store carries neither data nor an expiration.
    ///
    /// This is what a backend returns for a session it knows nothing about.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.lifetime.is_none()
    }

    /// Check if the store has expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.lifetime.is_some_and(|lifetime| lifetime <= now)
    }

    /// Get a value from the session data.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the session data.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value =
            serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.data.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove a value from the session data.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Check if a key exists in the session data.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Get all keys in the session data.
    pub fn keys(&self) -> Vec<&String> {
        self.data.keys().collect()
    }

    /// Clear all session data. The lifetime is kept.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Encode the store into the byte form shared by every backend.
    pub fn serialize(&self) -> SessionResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    /// Decode a store previously produced by [`RemoteStore::serialize`].
    ///
    /// Either the whole store decodes or an error is returned; a partially
    /// decoded store is never produced.
    pub fn decode(bytes: &[u8]) -> SessionResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| SessionError::Deserialization(e.to_string()))
    }
}

/// What the runtime wants done with a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Persist the given snapshot.
    Update(RemoteStore),
    /// Remove the session.
    Destroy,
}

/// A single state change emitted by the session runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPayload {
    /// Session the change applies to
    pub session_id: String,
    /// The change itself
    pub action: Action,
}

impl SyncPayload {
    /// Payload that stores `store` under `session_id`.
    pub fn update(session_id: impl Into<String>, store: RemoteStore) -> Self {
        Self {
            session_id: session_id.into(),
            action: Action::Update(store),
        }
    }

    /// Payload that removes `session_id`.
    pub fn destroy(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            action: Action::Destroy,
        }
    }

    /// Check if this payload destroys its session.
    pub fn is_destroy(&self) -> bool {
        matches!(self.action, Action::Destroy)
    }
}

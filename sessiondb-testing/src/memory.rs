//! In-memory key-value service for exercising session databases.

use async_trait::async_trait;
use sessiondb_core::{Expiry, KeyValueService, KvError, KvResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A call received by [`MemoryService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `connect`
    Connect,
    /// `ping`
    Ping,
    /// `get(key)`
    Get(String),
    /// `set(key, _, expiry)`
    Set {
        /// Key written
        key: String,
        /// Expiry requested
        expiry: Expiry,
    },
    /// `delete(key)`
    Delete(String),
    /// `close`
    Close,
}

#[derive(Debug, Clone)]
enum Entry {
    Bytes { value: Vec<u8>, expiry: Expiry },
    Foreign(String),
}

#[derive(Debug, Default)]
struct Faults {
    connect: bool,
    ping: bool,
    reads: bool,
    writes: bool,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    calls: Vec<Call>,
    faults: Faults,
    connect_delay: Option<Duration>,
    write_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    connected: AtomicBool,
    connects: AtomicUsize,
    completed_writes: AtomicUsize,
}

/// Fake key-value service keeping everything in a `HashMap`.
///
/// Clones share state, so a test can hand one clone to the database under
/// test and inspect the other. Expirations are recorded, not enforced.
///
/// # Examples
///
/// ```
/// use sessiondb_core::{Expiry, KeyValueService};
/// use sessiondb_testing::MemoryService;
///
/// # tokio_test::block_on(async {
/// let service = MemoryService::new();
/// service.connect().await.unwrap();
/// service.set("k", b"v".to_vec(), Expiry::Never).await.unwrap();
/// assert_eq!(service.raw("k"), Some(b"v".to_vec()));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryService {
    inner: Arc<Inner>,
}

impl MemoryService {
    /// Create an empty, disconnected service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay `connect` by `delay` before it reports success, so concurrent
    /// callers overlap while the connection is being established.
    pub fn with_connect_delay(self, delay: Duration) -> Self {
        self.state().connect_delay = Some(delay);
        self
    }

    /// Delay every write (`set` and `delete`) by `delay`.
    pub fn with_write_delay(self, delay: Duration) -> Self {
        self.set_write_delay(Some(delay));
        self
    }

    /// Change or remove the write delay.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        self.state().write_delay = delay;
    }

    /// Make `connect` fail.
    pub fn fail_connect(&self, fail: bool) {
        self.state().faults.connect = fail;
    }

    /// Make `ping` fail.
    pub fn fail_ping(&self, fail: bool) {
        self.state().faults.ping = fail;
    }

    /// Make `get` fail with a connection error.
    pub fn fail_reads(&self, fail: bool) {
        self.state().faults.reads = fail;
    }

    /// Make `set` and `delete` fail with a connection error.
    pub fn fail_writes(&self, fail: bool) {
        self.state().faults.writes = fail;
    }

    /// Store bytes directly, bypassing the call log.
    pub fn insert_raw(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.state().entries.insert(
            key.to_string(),
            Entry::Bytes {
                value: value.into(),
                expiry: Expiry::Never,
            },
        );
    }

    /// Store a value that is not a byte string (a hash, a list...).
    pub fn insert_foreign(&self, key: &str, kind: &str) {
        self.state()
            .entries
            .insert(key.to_string(), Entry::Foreign(kind.to_string()));
    }

    /// Bytes stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        match self.state().entries.get(key) {
            Some(Entry::Bytes { value, .. }) => Some(value.clone()),
            _ => None,
        }
    }

    /// Expiry recorded for `key` by the last write.
    pub fn expiry(&self, key: &str) -> Option<Expiry> {
        match self.state().entries.get(key) {
            Some(Entry::Bytes { expiry, .. }) => Some(*expiry),
            _ => None,
        }
    }

    /// Check if `key` holds anything.
    pub fn contains(&self, key: &str) -> bool {
        self.state().entries.contains_key(key)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `connect` calls.
    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Number of writes that ran to completion.
    pub fn completed_writes(&self) -> usize {
        self.inner.completed_writes.load(Ordering::SeqCst)
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().unwrap()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }

    fn check_connected(&self) -> KvResult<()> {
        if self.inner.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(KvError::Closed)
        }
    }

    /// Runs the shared prologue of `set` and `delete`.
    async fn begin_write(&self) -> KvResult<()> {
        self.check_connected()?;
        let (fail, delay) = {
            let state = self.state();
            (state.faults.writes, state.write_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(KvError::Connection("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueService for MemoryService {
    async fn connect(&self) -> KvResult<()> {
        self.record(Call::Connect);
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        let delay = self.state().connect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state().faults.connect {
            return Err(KvError::Connection("injected connect failure".to_string()));
        }
        self.inner.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> KvResult<()> {
        self.record(Call::Ping);
        self.check_connected()?;
        if self.state().faults.ping {
            return Err(KvError::Connection("injected ping failure".to_string()));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        self.record(Call::Get(key.to_string()));
        self.check_connected()?;
        let state = self.state();
        if state.faults.reads {
            return Err(KvError::Connection("injected read failure".to_string()));
        }
        match state.entries.get(key) {
            Some(Entry::Bytes { value, .. }) => Ok(Some(value.clone())),
            Some(Entry::Foreign(kind)) => Err(KvError::UnexpectedType(kind.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> KvResult<()> {
        self.record(Call::Set {
            key: key.to_string(),
            expiry,
        });
        self.begin_write().await?;
        {
            let mut state = self.state();
            if expiry.is_elapsed() {
                state.entries.remove(key);
            } else {
                state
                    .entries
                    .insert(key.to_string(), Entry::Bytes { value, expiry });
            }
        }
        self.inner.completed_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        self.record(Call::Delete(key.to_string()));
        self.begin_write().await?;
        let existed = self.state().entries.remove(key).is_some();
        self.inner.completed_writes.fetch_add(1, Ordering::SeqCst);
        Ok(existed)
    }

    async fn close(&self) -> KvResult<()> {
        self.record(Call::Close);
        self.inner.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}

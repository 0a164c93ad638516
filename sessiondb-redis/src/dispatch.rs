//! Bounded executor for fire-and-forget writes.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::trace;

/// Default cap on concurrently running detached writes.
pub const DEFAULT_MAX_IN_FLIGHT: u32 = 64;

/// Runs writes on detached tasks, at most `limit` at a time.
///
/// [`WriteDispatcher::dispatch`] returns as soon as the write is spawned. It
/// only waits when `limit` writes are already running, which keeps bursts
/// from piling up unbounded tasks.
#[derive(Debug, Clone)]
pub struct WriteDispatcher {
    semaphore: Arc<Semaphore>,
    limit: u32,
}

impl Default for WriteDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT)
    }
}

impl WriteDispatcher {
    /// Create a dispatcher allowing `limit` concurrent writes (at least one).
    pub fn new(limit: u32) -> Self {
        let limit = limit.clamp(1, Semaphore::MAX_PERMITS as u32);
        Self {
            semaphore: Arc::new(Semaphore::new(limit as usize)),
            limit,
        }
    }

    /// Maximum number of concurrent writes.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of writes currently running.
    pub fn in_flight(&self) -> usize {
        self.limit as usize - self.semaphore.available_permits()
    }

    /// Spawn `write` on the current tokio runtime.
    pub async fn dispatch<F>(&self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => {
                tokio::spawn(async move {
                    write.await;
                    drop(permit);
                });
                trace!(in_flight = self.in_flight(), "Write dispatched");
            }
            // The semaphore is never closed; run inline rather than lose the write.
            Err(_) => write.await,
        }
    }

    /// Wait until every dispatched write has finished.
    pub async fn flush(&self) {
        if let Ok(permits) = self.semaphore.acquire_many(self.limit).await {
            drop(permits);
        }
    }
}

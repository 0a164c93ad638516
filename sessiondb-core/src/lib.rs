//! Session database contract for sessiondb.
//!
//! A session runtime keeps session data in memory and hands persistence to a
//! [`Database`] backend. It calls [`Database::load`] to hydrate a session and
//! [`Database::sync`] with a [`SyncPayload`] whenever the session changes or
//! is destroyed. Backends persist a serialized [`RemoteStore`] through a
//! [`KeyValueService`].
//!
//! # Failure policy
//!
//! Backends favour availability over consistency:
//!
//! - `load` never fails. Missing, unreadable and undecodable sessions all come
//!   back as an empty store, and the cause is logged.
//! - `sync` never fails. An update that cannot be encoded or written is
//!   logged and dropped.
//! - Only `close` (and the opt-in `try_load`) return errors.
//!
//! # Example
//!
//! ```ignore
//! use sessiondb_core::{Database, RemoteStore, SyncPayload};
//!
//! async fn visit(db: &dyn Database, session_id: &str) {
//!     let mut store = db.load(session_id).await;
//!     let visits: u32 = store.get("visits").unwrap_or(0);
//!     store.set("visits", visits + 1).unwrap();
//!     db.sync(SyncPayload::update(session_id, store)).await;
//! }
//! ```

pub mod error;
pub mod expiry;
pub mod logging;
pub mod store;
pub mod traits;

pub use error::{KvError, KvResult, SessionError, SessionResult};
pub use expiry::{Clock, Expiry, SystemClock};
pub use store::{Action, RemoteStore, SyncPayload};
pub use traits::{Database, KeyValueService};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{KvError, KvResult, SessionError, SessionResult};
    pub use crate::expiry::{Clock, Expiry, SystemClock};
    pub use crate::store::{Action, RemoteStore, SyncPayload};
    pub use crate::traits::{Database, KeyValueService};
}

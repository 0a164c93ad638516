//! Testing utilities for sessiondb.
//!
//! - [`MemoryService`]: a [`KeyValueService`](sessiondb_core::KeyValueService)
//!   backed by a `HashMap`, with connect/ping/read/write fault injection,
//!   write latency and a call log
//! - [`ManualClock`]: a [`Clock`](sessiondb_core::Clock) that only moves when
//!   told to, for exact TTL assertions

pub mod clock;
pub mod memory;

pub use clock::ManualClock;
pub use memory::{Call, MemoryService};

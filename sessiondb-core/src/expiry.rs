//! Lifetime to TTL conversion.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Source of the current time.
///
/// Backends compute TTLs against a clock so tests can pin "now".
pub trait Clock: Send + Sync + 'static {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// How long a key should live in the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// No expiration.
    Never,
    /// Expire after the given duration. Sent to the service as whole seconds,
    /// rounded up and never less than one.
    After(Duration),
    /// The lifetime is already over.
    Elapsed,
}

impl Expiry {
    /// Convert an absolute lifetime into a relative expiry as of `now`.
    ///
    /// Partial seconds round up, so a store with any time left never maps to
    /// a zero TTL.
    pub fn from_lifetime(lifetime: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(lifetime) = lifetime else {
            return Self::Never;
        };

        match (lifetime - now).to_std() {
            Ok(remaining) if !remaining.is_zero() => {
                Self::After(Duration::from_secs(whole_seconds(remaining)))
            }
            _ => Self::Elapsed,
        }
    }

    /// TTL in whole seconds, with `0` meaning "no expiration".
    ///
    /// Returns `None` for [`Expiry::Elapsed`], which has no valid TTL.
    pub fn ttl_seconds(&self) -> Option<u64> {
        match self {
            Self::Never => Some(0),
            Self::After(ttl) => Some(whole_seconds(*ttl)),
            Self::Elapsed => None,
        }
    }

    /// Check if the lifetime is already over.
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Self::Elapsed)
    }
}

/// Round up to whole seconds, with a floor of one so a live key never gets
/// the "no expiration" TTL.
fn whole_seconds(ttl: Duration) -> u64 {
    (ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)).max(1)
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::After(ttl) => write!(f, "{}s", whole_seconds(*ttl)),
            Self::Elapsed => write!(f, "elapsed"),
        }
    }
}

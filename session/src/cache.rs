//! Persisted session cache.
//!
//! DESIGN
//! ======
//! One JSON [`CacheEnvelope`] under [`SESSION_KEY`]. Reads enforce the
//! envelope invariants and clear storage whenever an envelope is rejected:
//! - older than the configured TTL
//! - unparseable
//! - owned by a uid other than the one the caller expects
//!
//! ERROR HANDLING
//! ==============
//! Storage errors never propagate out of the cache. A failed read is a cache
//! miss and a failed write is logged; the session keeps running from memory.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::storage::Storage;
use crate::types::{CacheEnvelope, SessionRecord};

pub const SESSION_KEY: &str = "flexrent.session";

#[derive(Clone)]
pub struct SessionCache {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
}

impl SessionCache {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self { storage, clock, ttl_ms }
    }

    /// Load the cached record if the envelope is present, parseable and fresh.
    #[must_use]
    pub fn load(&self) -> Option<SessionRecord> {
        let raw = match self.storage.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "session cache read failed");
                return None;
            }
        };
        let envelope = match serde_json::from_str::<CacheEnvelope>(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "discarding unparseable session cache");
                self.clear();
                return None;
            }
        };
        if envelope.is_expired(self.clock.now_ms(), self.ttl_ms) {
            debug!(uid = %envelope.user.uid, "discarding expired session cache");
            self.clear();
            return None;
        }
        Some(envelope.user)
    }

    /// Load the cached record only if it belongs to `uid`. A record owned by
    /// another uid is purged.
    #[must_use]
    pub fn load_for(&self, uid: &str) -> Option<SessionRecord> {
        let record = self.load()?;
        if record.uid != uid {
            debug!(cached = %record.uid, current = %uid, "purging session cache of another user");
            self.clear();
            return None;
        }
        Some(record)
    }

    /// Persist `record` stamped with the current time.
    pub fn store(&self, record: &SessionRecord) {
        let envelope = CacheEnvelope { user: record.clone(), timestamp: self.clock.now_ms() };
        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "session cache encode failed");
                return;
            }
        };
        if let Err(e) = self.storage.set(SESSION_KEY, &raw) {
            warn!(error = %e, "session cache write failed");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            warn!(error = %e, "session cache clear failed");
        }
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;

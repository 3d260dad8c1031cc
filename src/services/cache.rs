//! Process-wide freshness cache for the latest assembled race record.
//!
//! A single slot, not a keyed cache: the read endpoint only ever serves
//! "the latest race". The slot is replaced wholesale under a write lock,
//! never mutated field-by-field, so concurrent readers can never observe a
//! partially-built record. Expiry is measured against an injected clock so
//! boundary behavior is deterministic in tests.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::models::RaceRecord;

/// How long one assembled record stays servable.
const CACHE_TTL_MINUTES: i64 = 15;

/// Replaceable time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A record served from the cache, with its enrichment status.
#[derive(Debug, Clone)]
pub struct CachedRecord {
    pub record: RaceRecord,
    /// False when the record was assembled with reference data missing
    /// (degraded); surfaced to clients via a response header.
    pub enriched: bool,
}

#[derive(Clone)]
struct CacheEntry {
    record: RaceRecord,
    enriched: bool,
    expires_at: DateTime<Utc>,
}

/// Single-slot time-bounded cache. Cheap to share: clone the `Arc`.
pub struct FreshnessCache {
    slot: RwLock<Option<CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FreshnessCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl: Duration::minutes(CACHE_TTL_MINUTES),
            clock,
        }
    }

    /// The cached record, if one is present and not yet expired.
    pub async fn get(&self) -> Option<CachedRecord> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(entry) if self.clock.now() < entry.expires_at => Some(CachedRecord {
                record: entry.record.clone(),
                enriched: entry.enriched,
            }),
            _ => None,
        }
    }

    /// Replace the slot with a freshly-obtained record.
    pub async fn put(&self, record: RaceRecord, enriched: bool) {
        let entry = CacheEntry {
            record,
            enriched,
            expires_at: self.clock.now() + self.ttl,
        };
        let mut slot = self.slot.write().await;
        *slot = Some(entry);
    }

    /// Clear the slot unconditionally. Exposed for enrichment events so the
    /// next read re-derives from the durable store.
    pub async fn flush(&self) {
        let mut slot = self.slot.write().await;
        *slot = None;
    }
}

//! Request and visitor accounting.
//!
//! `total_requests` is a plain atomic. Visitors are tracked per source address
//! in a [`DashMap`]; the entry API makes the "is there a visit inside the
//! window?" check and the insert a single step per address. The visitor total is
//! never incremented on its own: it is always recomputed as
//! `retired_visits + Σ entry.visits`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::storage::{SnapshotStore, StoreError};
use crate::unix_now;

/// Default deduplication window for visitors.
pub const DEFAULT_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Visit records produced by one source address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitEntry {
    /// Timestamp of the most recent visit record, seconds since epoch.
    pub last_visit: u64,
    /// Number of visit records this address has produced.
    pub visits: u64,
}

/// Persisted form of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageDocument {
    pub total_requests: u64,
    /// Cached projection, recomputed on load.
    pub total_visitors: u64,
    /// Visits from addresses compacted out of `visitors`.
    pub retired_visits: u64,
    pub visitors: BTreeMap<String, VisitEntry>,
}

/// Read-side view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub total_requests: u64,
    pub total_visitors: u64,
}

pub struct UsageCounters {
    total_requests: AtomicU64,
    visitors: DashMap<String, VisitEntry>,
    retired_visits: AtomicU64,
    window_secs: u64,
    /// Held for writing while compacting so snapshots never count a visit twice.
    compaction: RwLock<()>,
    dirty: AtomicBool,
    flush_lock: Mutex<()>,
    backend: Arc<dyn SnapshotStore<UsageDocument>>,
}

impl UsageCounters {
    /// Restore counters from the backend.
    pub async fn load(
        backend: Arc<dyn SnapshotStore<UsageDocument>>,
        window_secs: u64,
    ) -> Result<Self, StoreError> {
        let doc = backend.load().await?.unwrap_or_default();

        let tracked: u64 = doc.visitors.values().map(|v| v.visits).sum();
        // A document written with only the two totals still keeps its visitor count.
        let retired = doc
            .retired_visits
            .max(doc.total_visitors.saturating_sub(tracked));

        let counters = Self {
            total_requests: AtomicU64::new(doc.total_requests),
            visitors: doc.visitors.into_iter().collect(),
            retired_visits: AtomicU64::new(retired),
            window_secs: window_secs.max(1),
            compaction: RwLock::new(()),
            dirty: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
            backend,
        };

        let snapshot = counters.snapshot();
        tracing::info!(
            total_requests = snapshot.total_requests,
            total_visitors = snapshot.total_visitors,
            "Loaded usage counters"
        );
        Ok(counters)
    }

    /// Count one inbound request from `source`.
    pub fn record_request(&self, source: &str) {
        self.record_request_at(source, unix_now());
    }

    /// Count one inbound request from `source` at time `now` (seconds since epoch).
    ///
    /// Returns true if the request produced a new visit record.
    pub fn record_request_at(&self, source: &str, now: u64) -> bool {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let new_visit = match self.visitors.entry(source.to_string()) {
            Entry::Occupied(mut entry) => {
                let visit = entry.get_mut();
                if now.saturating_sub(visit.last_visit) >= self.window_secs {
                    visit.last_visit = now;
                    visit.visits += 1;
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(VisitEntry {
                    last_visit: now,
                    visits: 1,
                });
                true
            }
        };

        self.dirty.store(true, Ordering::Release);
        new_visit
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let _read = self.compaction.read().unwrap_or_else(|e| e.into_inner());
        UsageSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_visitors: self.visitor_total(),
        }
    }

    /// Drop addresses whose last visit is outside the window, keeping their
    /// visit count. Returns how many addresses were compacted.
    pub fn compact(&self, now: u64) -> usize {
        let _write = self.compaction.write().unwrap_or_else(|e| e.into_inner());
        let mut removed = 0;
        self.visitors.retain(|_, visit| {
            if now.saturating_sub(visit.last_visit) >= self.window_secs {
                self.retired_visits.fetch_add(visit.visits, Ordering::Relaxed);
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            self.dirty.store(true, Ordering::Release);
        }
        removed
    }

    /// Number of addresses currently inside their window.
    pub fn tracked_addresses(&self) -> usize {
        self.visitors.len()
    }

    /// Build the persisted document from the current state.
    pub fn document(&self) -> UsageDocument {
        let _read = self.compaction.read().unwrap_or_else(|e| e.into_inner());
        let visitors: BTreeMap<String, VisitEntry> = self
            .visitors
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect();
        let retired_visits = self.retired_visits.load(Ordering::Relaxed);
        let tracked: u64 = visitors.values().map(|v| v.visits).sum();

        UsageDocument {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_visitors: retired_visits + tracked,
            retired_visits,
            visitors,
        }
    }

    /// Persist the counters if anything changed since the last flush.
    ///
    /// Returns whether a save happened. On failure the counters stay dirty so
    /// the next flush retries; in-memory values remain authoritative.
    pub async fn flush(&self) -> Result<bool, StoreError> {
        let _guard = self.flush_lock.lock().await;
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }

        let doc = self.document();
        if let Err(e) = self.backend.save(&doc).await {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(true)
    }

    pub fn backend_description(&self) -> String {
        self.backend.describe()
    }

    fn visitor_total(&self) -> u64 {
        let tracked: u64 = self.visitors.iter().map(|r| r.value().visits).sum();
        self.retired_visits.load(Ordering::Relaxed) + tracked
    }
}

//! Adapter Metrics
//!
//! Lock-free counters describing traffic through a [`CacheAdapter`]. All
//! counters use relaxed atomics; snapshots are not a consistent cut.
//!
//! [`CacheAdapter`]: crate::cache::CacheAdapter

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Adapter Metrics
// =============================================================================

/// Counters for one adapter instance
#[derive(Debug, Default)]
pub struct AdapterMetrics {
    /// Remote primitive calls issued (successful or not)
    round_trips: AtomicU64,
    /// Keys read that held a value
    hits: AtomicU64,
    /// Keys read that came back as the miss sentinel
    misses: AtomicU64,
    /// Keys written successfully
    writes: AtomicU64,
    /// Keys (or batches) whose write reported failure
    failed_writes: AtomicU64,
    /// Keys removed by delete operations
    deletes: AtomicU64,
    /// Transport failures reported by the store
    remote_errors: AtomicU64,
    /// Responses synthesized because a failure was swallowed
    degraded_responses: AtomicU64,
}

impl AdapterMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_round_trip(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_lookups(&self, hits: u64, misses: u64) {
        self.hits.fetch_add(hits, Ordering::Relaxed);
        self.misses.fetch_add(misses, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write(&self, ok: bool, keys: u64) {
        if ok {
            self.writes.fetch_add(keys, Ordering::Relaxed);
        } else {
            self.failed_writes.fetch_add(keys, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_deletes(&self, removed: u64) {
        self.deletes.fetch_add(removed, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_remote_error(&self) {
        self.remote_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_degraded(&self) {
        self.degraded_responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters
    pub fn snapshot(&self) -> AdapterStatsSnapshot {
        AdapterStatsSnapshot {
            round_trips: self.round_trips.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
            degraded_responses: self.degraded_responses.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Serializable copy of [`AdapterMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterStatsSnapshot {
    pub round_trips: u64,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub failed_writes: u64,
    pub deletes: u64,
    pub remote_errors: u64,
    pub degraded_responses: u64,
}

impl AdapterStatsSnapshot {
    /// Fraction of looked-up keys that were hits (0.0 when nothing was read)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = AdapterMetrics::new();
        metrics.record_round_trip();
        metrics.record_lookups(3, 1);
        metrics.record_write(true, 2);
        metrics.record_write(false, 1);
        metrics.record_deletes(4);
        metrics.record_remote_error();
        metrics.record_degraded();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.round_trips, 1);
        assert_eq!(snapshot.hits, 3);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.writes, 2);
        assert_eq!(snapshot.failed_writes, 1);
        assert_eq!(snapshot.deletes, 4);
        assert_eq!(snapshot.remote_errors, 1);
        assert_eq!(snapshot.degraded_responses, 1);
        assert!((snapshot.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_ratio_without_reads() {
        assert_eq!(AdapterStatsSnapshot::default().hit_ratio(), 0.0);
    }
}

//! Statistics for the settings cache.
//!
//! Counters show how often reads are served from memory and how much I/O
//! reaches the store.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for settings operations.
///
/// All counters are atomic so a shared reference can be handed to a metrics
/// exporter. Use `SettingsDatabase::stats()` for a snapshot.
#[derive(Debug, Default)]
pub struct SettingsStats {
    /// Reads answered from a materialized cache slot.
    cache_hits: AtomicU64,

    /// Reads answered by querying the store.
    store_hits: AtomicU64,

    /// Reads that found nothing and fell back to the default.
    misses: AtomicU64,

    /// Point lookups issued against the store.
    store_reads: AtomicU64,

    /// Rows upserted into the store.
    store_writes: AtomicU64,

    /// Calls to `remove`.
    removals: AtomicU64,

    /// Store statements that failed.
    store_errors: AtomicU64,

    /// Current number of cache slots.
    size: AtomicU64,
}

impl SettingsStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_hit(&self) {
        self.store_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_read(&self) {
        self.store_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_writes(&self, rows: u64) {
        self.store_writes.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the size to a specific value.
    pub fn set_size(&self, size: u64) {
        self.size.store(size, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn store_hits(&self) -> u64 {
        self.store_hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn store_reads(&self) -> u64 {
        self.store_reads.load(Ordering::Relaxed)
    }

    pub fn store_writes(&self) -> u64 {
        self.store_writes.load(Ordering::Relaxed)
    }

    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }

    pub fn store_errors(&self) -> u64 {
        self.store_errors.load(Ordering::Relaxed)
    }

    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    /// Share of reads served from memory, as a percentage (0.0 to 100.0).
    /// Returns 0.0 if nothing has been read.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.cache_hits();
        let total = hits + self.store_hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    /// Create a snapshot of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits(),
            store_hits: self.store_hits(),
            misses: self.misses(),
            store_reads: self.store_reads(),
            store_writes: self.store_writes(),
            removals: self.removals(),
            store_errors: self.store_errors(),
            size: self.size(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// A point-in-time snapshot of settings statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub store_hits: u64,
    pub misses: u64,
    pub store_reads: u64,
    pub store_writes: u64,
    pub removals: u64,
    pub store_errors: u64,
    pub size: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_stats() {
        let stats = SettingsStats::new();
        assert_eq!(stats.cache_hits(), 0);
        assert_eq!(stats.store_reads(), 0);
        assert_eq!(stats.size(), 0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = SettingsStats::new();
        assert_eq!(stats.hit_rate(), 0.0);

        // 2 from memory, 1 from the store, 1 miss = 50%
        stats.record_cache_hit();
        stats.record_cache_hit();
        stats.record_store_hit();
        stats.record_miss();

        assert!((stats.hit_rate() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_snapshot() {
        let stats = SettingsStats::new();
        stats.record_store_read();
        stats.record_store_writes(3);
        stats.record_store_error();
        stats.set_size(4);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.store_reads, 1);
        assert_eq!(snapshot.store_writes, 3);
        assert_eq!(snapshot.store_errors, 1);
        assert_eq!(snapshot.size, 4);
    }
}

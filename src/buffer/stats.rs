//! Buffer pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the buffer pool with relaxed atomics.
///
/// Counters are independent of one another, so no ordering beyond atomicity
/// is required; read them through [`PoolStats::snapshot`].
#[derive(Debug, Default)]
pub struct PoolStats {
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub evictions: AtomicU64,
    pub pages_read: AtomicU64,
    pub pages_written: AtomicU64,
    pub pages_allocated: AtomicU64,
    pub pages_deallocated: AtomicU64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            cache_hits: load(&self.cache_hits),
            cache_misses: load(&self.cache_misses),
            evictions: load(&self.evictions),
            pages_read: load(&self.pages_read),
            pages_written: load(&self.pages_written),
            pages_allocated: load(&self.pages_allocated),
            pages_deallocated: load(&self.pages_deallocated),
        }
    }
}

/// A plain copy of [`PoolStats`] that can be printed and compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub pages_allocated: u64,
    pub pages_deallocated: u64,
}

impl StatsSnapshot {
    /// Cache hit rate in `0.0..=1.0`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {}, allocated: {}, deallocated: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.pages_allocated,
            self.pages_deallocated,
            self.hit_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_hit_rate() {
        let stats = PoolStats::new();
        for _ in 0..3 {
            PoolStats::bump(&stats.cache_hits);
        }
        PoolStats::bump(&stats.cache_misses);
        PoolStats::bump(&stats.pages_allocated);

        let snap = stats.snapshot();
        assert_eq!(snap.cache_hits, 3);
        assert_eq!(snap.pages_allocated, 1);
        assert_eq!(snap.hit_rate(), 0.75);
        assert_eq!(StatsSnapshot::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_display() {
        let stats = PoolStats::new();
        PoolStats::bump(&stats.cache_hits);
        let display = format!("{}", stats.snapshot());
        assert!(display.contains("hits: 1"));
        assert!(display.contains("100.00%"));
    }
}

//! Pool counters.
//!
//! Counters live inside the bookkeeping sets and are only ever touched under
//! whatever guard already protects those sets, so there are no atomics here.

use serde::Serialize;

/// Point-in-time snapshot of a pool. In the synchronized pool the two halves
/// are read under separate locks and may straddle a concurrent call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Buffers cached for reuse.
    pub available: usize,
    /// Buffers currently on loan.
    pub checked_out: usize,
    /// Allocations served from the cache.
    pub hits: u64,
    /// Allocations that went to the primitive.
    pub misses: u64,
    /// Cached buffers handed back to the primitive on a miss.
    pub evictions: u64,
    /// Successful releases.
    pub releases: u64,
    /// Releases of addresses that were not checked out.
    pub rejected_releases: u64,
    /// High-water mark of `checked_out`.
    pub peak_checked_out: usize,
}

impl PoolStats {
    /// Cache hit ratio in `[0.0, 1.0]`; `0.0` before any allocation.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }

    pub fn summary(&self) -> String {
        format!(
            "Allocations: {} total ({} hits, {} misses, {:.0}% hit rate), \
             {} evictions, {} releases ({} rejected), {} cached, {} on loan (peak {})",
            self.hits + self.misses,
            self.hits,
            self.misses,
            self.hit_ratio() * 100.0,
            self.evictions,
            self.releases,
            self.rejected_releases,
            self.available,
            self.checked_out,
            self.peak_checked_out,
        )
    }
}

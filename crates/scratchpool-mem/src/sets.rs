//! Bookkeeping collections shared by both pool variants.
//!
//! [`AvailableSet`] holds released buffers cached for reuse and owns the
//! matching and eviction policy. [`CheckedOutSet`] holds the records of
//! buffers currently on loan and is the sole authority on whether an address
//! belongs to the pool. Neither knows about locking; `PoolAllocator` wraps each
//! in its own mutex and `UnlockedPoolAllocator` uses them bare.

use scratchpool_core::{BufferRecord, DiagnosticSink, Error, MatchRatio, PoolEvent, Result};

use crate::stats::PoolStats;

struct Cached<B> {
    record: BufferRecord,
    buffer: B,
}

/// Outcome of [`AvailableSet::lookup`].
pub(crate) enum Lookup<B> {
    /// A cached buffer matched. `record.size` is its original size.
    Reused { record: BufferRecord, buffer: B },
    /// Nothing matched. `evicted` must be handed back to the primitive.
    Miss { evicted: Option<B> },
}

/// Released buffers, in insertion order, plus the policy that reads them.
pub(crate) struct AvailableSet<B> {
    entries: Vec<Cached<B>>,
    ratio: MatchRatio,
    drop_threshold: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<B> AvailableSet<B> {
    pub(crate) fn new(ratio: MatchRatio, drop_threshold: usize) -> Self {
        Self {
            entries: Vec::new(),
            ratio,
            drop_threshold,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Single pass: first-fit match, running min and running max.
    ///
    /// On a miss with at least `drop_threshold` entries cached, evicts the
    /// smallest entry if the request exceeds everything cached, or the largest
    /// if the request is below everything cached. Ties keep the first seen.
    pub(crate) fn lookup(&mut self, size: usize) -> Lookup<B> {
        let mut hit = None;
        let (mut min_idx, mut min_size) = (0, usize::MAX);
        let (mut max_idx, mut max_size) = (0, 0);

        for (idx, entry) in self.entries.iter().enumerate() {
            let bs = entry.record.size;
            if self.ratio.accepts(bs, size) {
                hit = Some(idx);
                break;
            }
            if idx == 0 || bs < min_size {
                min_idx = idx;
                min_size = bs;
            }
            if idx == 0 || bs > max_size {
                max_idx = idx;
                max_size = bs;
            }
        }

        if let Some(idx) = hit {
            let Cached { record, buffer } = self.entries.remove(idx);
            self.hits += 1;
            return Lookup::Reused { record, buffer };
        }

        self.misses += 1;

        let victim = if !self.entries.is_empty() && self.entries.len() >= self.drop_threshold {
            if max_size < size {
                // Demand outgrew the cache: its low end is stale.
                Some(min_idx)
            } else if min_size > size {
                // Demand shrank below the cache: its high end is oversized.
                Some(max_idx)
            } else {
                None
            }
        } else {
            None
        };

        let evicted = victim.map(|idx| {
            self.evictions += 1;
            self.entries.remove(idx).buffer
        });

        Lookup::Miss { evicted }
    }

    pub(crate) fn push(&mut self, record: BufferRecord, buffer: B) {
        debug_assert!(!self.contains(record.address));
        self.entries.push(Cached { record, buffer });
    }

    pub(crate) fn contains(&self, address: usize) -> bool {
        self.entries.iter().any(|e| e.record.address == address)
    }

    /// Remove every cached buffer; the caller releases them.
    pub(crate) fn drain(&mut self) -> Vec<B> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|e| e.buffer)
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn records(&self) -> Vec<BufferRecord> {
        self.entries.iter().map(|e| e.record).collect()
    }

    pub(crate) fn ratio(&self) -> MatchRatio {
        self.ratio
    }

    pub(crate) fn set_ratio(&mut self, ratio: MatchRatio) {
        self.ratio = ratio;
    }

    pub(crate) fn drop_threshold(&self) -> usize {
        self.drop_threshold
    }

    pub(crate) fn set_drop_threshold(&mut self, drop_threshold: usize) {
        self.drop_threshold = drop_threshold;
    }

    pub(crate) fn fill_stats(&self, stats: &mut PoolStats) {
        stats.available = self.entries.len();
        stats.hits = self.hits;
        stats.misses = self.misses;
        stats.evictions = self.evictions;
    }
}

/// Records of buffers on loan, in insertion order.
#[derive(Default)]
pub(crate) struct CheckedOutSet {
    records: Vec<BufferRecord>,
    releases: u64,
    rejected_releases: u64,
    peak: usize,
}

impl CheckedOutSet {
    pub(crate) fn insert(&mut self, record: BufferRecord) {
        debug_assert!(!self.records.iter().any(|r| r.address == record.address));
        self.records.push(record);
        self.peak = self.peak.max(self.records.len());
    }

    /// Remove the record for `address`. A miss is counted as a rejected release.
    pub(crate) fn remove(&mut self, address: usize) -> Option<BufferRecord> {
        match self.records.iter().position(|r| r.address == address) {
            Some(idx) => {
                self.releases += 1;
                Some(self.records.remove(idx))
            }
            None => {
                self.rejected_releases += 1;
                None
            }
        }
    }

    pub(crate) fn take_all(&mut self) -> Vec<BufferRecord> {
        std::mem::take(&mut self.records)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn records(&self) -> Vec<BufferRecord> {
        self.records.clone()
    }

    pub(crate) fn fill_stats(&self, stats: &mut PoolStats) {
        stats.checked_out = self.records.len();
        stats.releases = self.releases;
        stats.rejected_releases = self.rejected_releases;
        stats.peak_checked_out = self.peak;
    }
}

/// Quantize a ratio, reporting a rejected value to `sink`.
pub(crate) fn quantize_ratio(ratio: f32, sink: &dyn DiagnosticSink) -> Result<MatchRatio> {
    MatchRatio::from_f32(ratio).ok_or_else(|| {
        let value = ratio.to_string();
        sink.emit(&PoolEvent::InvalidConfiguration {
            field: "match_ratio",
            value: value.clone(),
        });
        Error::InvalidConfiguration {
            field: "match_ratio",
            value,
        }
    })
}

/// Report an untracked release and build the error returned to the caller.
pub(crate) fn untracked_release(
    sink: &dyn DiagnosticSink,
    address: usize,
    double_release: bool,
    available: usize,
    checked_out: usize,
) -> Error {
    sink.emit(&PoolEvent::UntrackedRelease {
        address,
        double_release,
        available,
        checked_out,
    });
    Error::UntrackedRelease {
        address,
        double_release,
    }
}

/// One event per buffer still on loan at teardown.
pub(crate) fn report_outstanding(sink: &dyn DiagnosticSink, outstanding: &[BufferRecord]) {
    for record in outstanding {
        sink.emit(&PoolEvent::OutstandingAtTeardown {
            address: record.address,
            size: record.size,
            checked_out: outstanding.len(),
        });
    }
}

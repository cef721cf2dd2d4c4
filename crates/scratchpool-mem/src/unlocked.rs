//! Buffer pool without internal locking.
//!
//! Same bookkeeping as [`PoolAllocator`](crate::PoolAllocator), but every
//! mutating call takes `&mut self`, so the borrow checker does the serializing
//! that the mutexes do in the synchronized pool. Use it from one thread, or
//! behind a lock the caller already holds.

use std::sync::Arc;

use scratchpool_core::{
    AlignedAlloc, Allocator, BufferRecord, DiagnosticSink, Error, MatchRatio, PoolBuffer,
    PoolConfig, Result, TracingSink, DEFAULT_DROP_THRESHOLD,
};

use crate::aligned::AlignedHeap;
use crate::sets::{self, AvailableSet, CheckedOutSet, Lookup};
use crate::stats::PoolStats;

/// Unsynchronized pool allocator. Not `Clone`.
pub struct UnlockedPoolAllocator<A: AlignedAlloc = AlignedHeap> {
    backend: A,
    available: AvailableSet<A::Buffer>,
    checked_out: CheckedOutSet,
    sink: Arc<dyn DiagnosticSink>,
}

impl UnlockedPoolAllocator<AlignedHeap> {
    pub fn new() -> Self {
        Self {
            backend: AlignedHeap,
            available: AvailableSet::new(MatchRatio::ZERO, DEFAULT_DROP_THRESHOLD),
            checked_out: CheckedOutSet::default(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_config(config: &PoolConfig) -> Result<Self> {
        Self::with_backend(AlignedHeap, config, Arc::new(TracingSink))
    }
}

impl Default for UnlockedPoolAllocator<AlignedHeap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: AlignedAlloc> UnlockedPoolAllocator<A> {
    pub fn with_backend(
        backend: A,
        config: &PoolConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        let ratio = sets::quantize_ratio(config.match_ratio, &*sink)?;
        Ok(Self {
            backend,
            available: AvailableSet::new(ratio, config.drop_threshold),
            checked_out: CheckedOutSet::default(),
            sink,
        })
    }

    pub fn allocate(&mut self, size: usize) -> Result<A::Buffer> {
        let buffer = match self.available.lookup(size) {
            Lookup::Reused { record, buffer } => {
                self.checked_out.insert(record);
                return Ok(buffer);
            }
            Lookup::Miss { evicted } => {
                if let Some(old) = evicted {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(
                        address = old.address(),
                        requested = size,
                        "evicting cached buffer"
                    );
                    self.backend.release(old);
                }
                self.backend.allocate_aligned(size)?
            }
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(address = buffer.address(), size, "fresh pool allocation");

        self.checked_out.insert(BufferRecord::new(size, buffer.address()));
        Ok(buffer)
    }

    /// Return a buffer for reuse. Untracked buffers are rejected without
    /// touching either set or the primitive.
    pub fn release(&mut self, buffer: A::Buffer) -> Result<()> {
        let address = buffer.address();
        match self.checked_out.remove(address) {
            Some(record) => {
                self.available.push(record, buffer);
                Ok(())
            }
            None => Err(sets::untracked_release(
                &*self.sink,
                address,
                self.available.contains(address),
                self.available.len(),
                self.checked_out.len(),
            )),
        }
    }

    pub fn clear(&mut self) {
        for buffer in self.available.drain() {
            self.backend.release(buffer);
        }
    }

    pub fn set_match_ratio(&mut self, ratio: f32) -> Result<()> {
        let ratio = sets::quantize_ratio(ratio, &*self.sink)?;
        self.available.set_ratio(ratio);
        Ok(())
    }

    pub fn set_drop_threshold(&mut self, drop_threshold: usize) {
        self.available.set_drop_threshold(drop_threshold);
    }

    pub fn config(&self) -> PoolConfig {
        PoolConfig {
            match_ratio: self.available.ratio().as_f32(),
            drop_threshold: self.available.drop_threshold(),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats::default();
        self.available.fill_stats(&mut stats);
        self.checked_out.fill_stats(&mut stats);
        stats
    }

    pub fn available_records(&self) -> Vec<BufferRecord> {
        self.available.records()
    }

    pub fn checked_out_records(&self) -> Vec<BufferRecord> {
        self.checked_out.records()
    }

    pub fn backend(&self) -> &A {
        &self.backend
    }

    pub fn close(mut self) -> Result<()> {
        let outstanding = self.teardown();
        if outstanding.is_empty() {
            Ok(())
        } else {
            Err(Error::OutstandingAtTeardown {
                records: outstanding,
            })
        }
    }

    fn teardown(&mut self) -> Vec<BufferRecord> {
        self.clear();
        let outstanding = self.checked_out.take_all();
        sets::report_outstanding(&*self.sink, &outstanding);
        outstanding
    }
}

impl<A: AlignedAlloc> Drop for UnlockedPoolAllocator<A> {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}

impl<A: AlignedAlloc> std::fmt::Debug for UnlockedPoolAllocator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockedPoolAllocator")
            .field("config", &self.config())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<A: AlignedAlloc> Allocator for UnlockedPoolAllocator<A> {
    type Buffer = A::Buffer;

    fn allocate(&mut self, size: usize) -> Result<A::Buffer> {
        UnlockedPoolAllocator::allocate(self, size)
    }

    fn release(&mut self, buffer: A::Buffer) -> Result<()> {
        UnlockedPoolAllocator::release(self, buffer)
    }
}

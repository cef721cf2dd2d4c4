//! Thread-safe buffer pool.
//!
//! Two independent mutexes guard the available set (together with the
//! configuration it reads) and the checked-out set. They are never held at the
//! same time, so lock order does not matter. A buffer moving between the sets
//! is briefly tracked by neither; during that window only the calling thread
//! holds it.

use std::sync::Arc;

use parking_lot::Mutex;
use scratchpool_core::{
    AlignedAlloc, Allocator, BufferRecord, DiagnosticSink, Error, MatchRatio, PoolBuffer,
    PoolConfig, Result, TracingSink, DEFAULT_DROP_THRESHOLD,
};

use crate::aligned::AlignedHeap;
use crate::sets::{self, AvailableSet, CheckedOutSet, Lookup};
use crate::stats::PoolStats;

/// Synchronized pool allocator.
///
/// Share it by reference (or `Arc`) across threads; `&PoolAllocator` also
/// implements [`Allocator`]. Not `Clone`: two copies of the bookkeeping would
/// both claim the same addresses.
pub struct PoolAllocator<A: AlignedAlloc = AlignedHeap> {
    backend: A,
    available: Mutex<AvailableSet<A::Buffer>>,
    checked_out: Mutex<CheckedOutSet>,
    sink: Arc<dyn DiagnosticSink>,
}

impl PoolAllocator<AlignedHeap> {
    /// Heap-backed pool with default configuration and the tracing sink.
    pub fn new() -> Self {
        Self::from_parts(
            AlignedHeap,
            AvailableSet::new(MatchRatio::ZERO, DEFAULT_DROP_THRESHOLD),
            Arc::new(TracingSink),
        )
    }

    pub fn with_config(config: &PoolConfig) -> Result<Self> {
        Self::with_backend(AlignedHeap, config, Arc::new(TracingSink))
    }
}

impl Default for PoolAllocator<AlignedHeap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: AlignedAlloc> PoolAllocator<A> {
    pub fn with_backend(
        backend: A,
        config: &PoolConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        let ratio = sets::quantize_ratio(config.match_ratio, &*sink)?;
        Ok(Self::from_parts(
            backend,
            AvailableSet::new(ratio, config.drop_threshold),
            sink,
        ))
    }

    fn from_parts(
        backend: A,
        available: AvailableSet<A::Buffer>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            backend,
            available: Mutex::new(available),
            checked_out: Mutex::new(CheckedOutSet::default()),
            sink,
        }
    }

    /// Hand out a buffer of at least `size` bytes, reusing a cached one if the
    /// match ratio allows it.
    pub fn allocate(&self, size: usize) -> Result<A::Buffer> {
        let lookup = self.available.lock().lookup(size);

        let buffer = match lookup {
            Lookup::Reused { record, buffer } => {
                self.checked_out.lock().insert(record);
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

        self.checked_out
            .lock()
            .insert(BufferRecord::new(size, buffer.address()));
        Ok(buffer)
    }

    /// Return a buffer for reuse.
    ///
    /// A buffer this pool does not have checked out is rejected with
    /// [`Error::UntrackedRelease`]: neither set changes, the primitive is not
    /// called, and the rejected buffer is simply dropped.
    ///
    /// `double_release` on that error is best-effort: it is read under the
    /// available lock after the checked-out lock is dropped, so a concurrent
    /// `allocate` that takes the cached buffer in between makes a real double
    /// release look like a foreign buffer.
    pub fn release(&self, buffer: A::Buffer) -> Result<()> {
        let address = buffer.address();

        let removed = {
            let mut checked_out = self.checked_out.lock();
            checked_out.remove(address).ok_or(checked_out.len())
        };

        match removed {
            Ok(record) => {
                self.available.lock().push(record, buffer);
                Ok(())
            }
            Err(checked_out) => {
                let (double_release, available) = {
                    let available = self.available.lock();
                    (available.contains(address), available.len())
                };
                Err(sets::untracked_release(
                    &*self.sink,
                    address,
                    double_release,
                    available,
                    checked_out,
                ))
            }
        }
    }

    /// Release every cached buffer to the primitive. Loans are untouched.
    pub fn clear(&self) {
        let drained = self.available.lock().drain();
        for buffer in drained {
            self.backend.release(buffer);
        }
    }

    /// Rejected values leave the previous ratio in place.
    pub fn set_match_ratio(&self, ratio: f32) -> Result<()> {
        let ratio = sets::quantize_ratio(ratio, &*self.sink)?;
        self.available.lock().set_ratio(ratio);
        Ok(())
    }

    pub fn set_drop_threshold(&self, drop_threshold: usize) {
        self.available.lock().set_drop_threshold(drop_threshold);
    }

    /// Current configuration, with the ratio as quantized.
    pub fn config(&self) -> PoolConfig {
        let available = self.available.lock();
        PoolConfig {
            match_ratio: available.ratio().as_f32(),
            drop_threshold: available.drop_threshold(),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats::default();
        self.available.lock().fill_stats(&mut stats);
        self.checked_out.lock().fill_stats(&mut stats);
        stats
    }

    /// Records of cached buffers, in insertion order.
    pub fn available_records(&self) -> Vec<BufferRecord> {
        self.available.lock().records()
    }

    /// Records of buffers on loan, in insertion order.
    pub fn checked_out_records(&self) -> Vec<BufferRecord> {
        self.checked_out.lock().records()
    }

    pub fn backend(&self) -> &A {
        &self.backend
    }

    /// Tear the pool down, reporting buffers still on loan as an error.
    ///
    /// Dropping the pool runs the same sequence but only emits diagnostics.
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
        for buffer in self.available.get_mut().drain() {
            self.backend.release(buffer);
        }
        let outstanding = self.checked_out.get_mut().take_all();
        sets::report_outstanding(&*self.sink, &outstanding);
        outstanding
    }
}

impl<A: AlignedAlloc> Drop for PoolAllocator<A> {
    fn drop(&mut self) {
        // Loans outliving the pool are reported, never waited for.
        let _ = self.teardown();
    }
}

impl<A: AlignedAlloc> std::fmt::Debug for PoolAllocator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("config", &self.config())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<A: AlignedAlloc> Allocator for PoolAllocator<A> {
    type Buffer = A::Buffer;

    fn allocate(&mut self, size: usize) -> Result<A::Buffer> {
        PoolAllocator::allocate(self, size)
    }

    fn release(&mut self, buffer: A::Buffer) -> Result<()> {
        PoolAllocator::release(self, buffer)
    }
}

impl<A: AlignedAlloc> Allocator for &PoolAllocator<A> {
    type Buffer = A::Buffer;

    fn allocate(&mut self, size: usize) -> Result<A::Buffer> {
        PoolAllocator::allocate(*self, size)
    }

    fn release(&mut self, buffer: A::Buffer) -> Result<()> {
        PoolAllocator::release(*self, buffer)
    }
}

//! Shared test doubles: a counting primitive and a recording sink.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use scratchpool::{AlignedAlloc, DiagnosticSink, PoolBuffer, PoolEvent, Result};

/// Copyable stand-in for a raw pointer; lets tests release the same handle twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub address: usize,
    pub size: usize,
}

impl PoolBuffer for Handle {
    fn address(&self) -> usize {
        self.address
    }
}

/// Primitive that hands out synthetic, never-reused addresses and remembers
/// everything released to it.
#[derive(Default)]
pub struct CountingHeap {
    next: AtomicUsize,
    released: Mutex<Vec<Handle>>,
}

impl CountingHeap {
    pub fn allocations(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> Vec<Handle> {
        self.released.lock().clone()
    }

    pub fn released_sizes(&self) -> Vec<usize> {
        self.released.lock().iter().map(|h| h.size).collect()
    }
}

impl AlignedAlloc for CountingHeap {
    type Buffer = Handle;

    fn allocate_aligned(&self, size: usize) -> Result<Handle> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Ok(Handle {
            address: 0x1000 + n * 0x100,
            size,
        })
    }

    fn release(&self, buffer: Handle) {
        self.released.lock().push(buffer);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PoolEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PoolEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&PoolEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, event: &PoolEvent) {
        self.events.lock().push(event.clone());
    }
}

pub fn sizes(records: &[scratchpool::BufferRecord]) -> Vec<usize> {
    records.iter().map(|r| r.size).collect()
}

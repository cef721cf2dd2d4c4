#![forbid(unsafe_code)]
//! scratchpool-mem: size-bucketed buffer pools.
//!
//! This crate provides the concrete allocators for the interfaces defined in
//! `scratchpool-core`. A pool caches released buffers and hands them back out
//! when a later request fits, falling back to an [`AlignedAlloc`] primitive
//! on a miss. Two variants share one bookkeeping core:
//!
//! - [`PoolAllocator`]: two internal mutexes, safe to share across threads.
//! - [`UnlockedPoolAllocator`]: no locking, `&mut self` everywhere.
//!
//! [`AlignedAlloc`]: scratchpool_core::AlignedAlloc

pub mod aligned;
pub mod pool;
mod sets;
pub mod stats;
pub mod unlocked;

pub use aligned::{AlignedBuf, AlignedHeap, MALLOC_ALIGN, MALLOC_OVERREAD};
pub use pool::PoolAllocator;
pub use stats::PoolStats;
pub use unlocked::UnlockedPoolAllocator;

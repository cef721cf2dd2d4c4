#![forbid(unsafe_code)]
//! scratchpool: buffer pool allocators for repeatedly reused scratch memory.
//!
//! Facade over the workspace crates. Contracts, configuration, and diagnostics
//! come from `scratchpool-core`; the pools come from `scratchpool-mem`.
//!
//! ```
//! use scratchpool::{PoolAllocator, PoolBuffer};
//!
//! let pool = PoolAllocator::new();
//! let buf = pool.allocate(4096).unwrap();
//! let addr = buf.address();
//! pool.release(buf).unwrap();
//!
//! // Same size again: served from the cache.
//! let again = pool.allocate(4096).unwrap();
//! assert_eq!(again.address(), addr);
//! pool.release(again).unwrap();
//! ```

pub use scratchpool_core::prelude::*;
pub use scratchpool_core::DEFAULT_DROP_THRESHOLD;
pub use scratchpool_mem::{
    AlignedBuf, AlignedHeap, PoolAllocator, PoolStats, UnlockedPoolAllocator, MALLOC_ALIGN,
    MALLOC_OVERREAD,
};

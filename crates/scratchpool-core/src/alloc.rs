//! Abstract allocation interfaces.
//!
//! Two seams live here:
//!
//! - [`AlignedAlloc`] is the raw primitive a pool falls back to when it has
//!   nothing reusable. It is stateless and does no pooling.
//! - [`Allocator`] is what callers program against. Both pool variants in
//!   `scratchpool-mem` implement it.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A buffer handed out by an [`AlignedAlloc`].
///
/// `address` must be stable for the lifetime of the buffer and unique among
/// live buffers of the same primitive. Pools use it as the bookkeeping key.
pub trait PoolBuffer: Send {
    fn address(&self) -> usize;
}

/// The aligned-memory primitive a pool sits in front of.
///
/// Alignment and any over-read margin are the primitive's business; pools
/// only track the requested size. Must be callable from several threads.
pub trait AlignedAlloc: Send + Sync {
    type Buffer: PoolBuffer;

    /// Allocate a fresh buffer able to hold at least `size` bytes.
    fn allocate_aligned(&self, size: usize) -> Result<Self::Buffer>;

    /// Give a buffer back to the primitive.
    fn release(&self, buffer: Self::Buffer);
}

/// Caller-facing allocator contract.
///
/// `allocate` never returns a buffer smaller than `size`; it may return one
/// with residual capacity. `release` hands the buffer back for reuse and does
/// not necessarily free the underlying memory.
///
/// Shared pools implement this for `&Pool` as well, the same way `std::io::Write`
/// is implemented for `&File`.
pub trait Allocator {
    type Buffer;

    fn allocate(&mut self, size: usize) -> Result<Self::Buffer>;

    fn release(&mut self, buffer: Self::Buffer) -> Result<()>;
}

/// Bookkeeping entry for a buffer tracked by a pool.
///
/// `size` is the size originally requested from the primitive, not the true
/// allocation size, and never changes while the record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferRecord {
    pub size: usize,
    pub address: usize,
}

impl BufferRecord {
    pub const fn new(size: usize, address: usize) -> Self {
        Self { size, address }
    }
}

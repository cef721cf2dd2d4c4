//! Default aligned-memory primitive.
//!
//! Every buffer starts on a [`MALLOC_ALIGN`] boundary and is followed by
//! [`MALLOC_OVERREAD`] spare bytes, so vectorized kernels that read a little
//! past the end of their input stay inside the allocation.

use std::ops::{Deref, DerefMut};

use scratchpool_core::{AlignedAlloc, Error, PoolBuffer, Result};

/// Alignment of every buffer handed out by [`AlignedHeap`].
#[cfg(target_feature = "avx512f")]
pub const MALLOC_ALIGN: usize = 64;
#[cfg(all(target_feature = "avx", not(target_feature = "avx512f")))]
pub const MALLOC_ALIGN: usize = 32;
#[cfg(not(target_feature = "avx"))]
pub const MALLOC_ALIGN: usize = 16;

/// Slack bytes kept after the visible length.
pub const MALLOC_OVERREAD: usize = 64;

/// Owned, zero-initialized, aligned byte buffer.
///
/// The backing `Vec` is never resized, so [`PoolBuffer::address`] is stable
/// for the buffer's whole life.
pub struct AlignedBuf {
    storage: Vec<u8>,
    offset: usize,
    len: usize,
}

impl AlignedBuf {
    /// Allocate `len` visible bytes, aligned to [`MALLOC_ALIGN`].
    pub fn zeroed(len: usize) -> Result<Self> {
        let total = len
            .checked_add(MALLOC_ALIGN + MALLOC_OVERREAD)
            .ok_or(Error::AllocFailed { bytes: len })?;

        let storage = vec![0u8; total];
        let offset = storage.as_ptr().align_offset(MALLOC_ALIGN);
        if offset >= MALLOC_ALIGN {
            return Err(Error::AllocFailed { bytes: len });
        }

        Ok(Self {
            storage,
            offset,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Visible length plus the over-read margin that follows it.
    pub fn capacity(&self) -> usize {
        self.storage.len() - self.offset
    }
}

impl Deref for AlignedBuf {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.storage[self.offset..self.offset + self.len]
    }
}

impl DerefMut for AlignedBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.storage[self.offset..self.offset + self.len]
    }
}

impl std::fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("len", &self.len)
            .finish()
    }
}

impl PoolBuffer for AlignedBuf {
    fn address(&self) -> usize {
        self.storage.as_ptr() as usize + self.offset
    }
}

/// Heap-backed [`AlignedAlloc`]. Stateless; no pooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlignedHeap;

impl AlignedAlloc for AlignedHeap {
    type Buffer = AlignedBuf;

    fn allocate_aligned(&self, size: usize) -> Result<AlignedBuf> {
        AlignedBuf::zeroed(size)
    }

    fn release(&self, buffer: AlignedBuf) {
        drop(buffer);
    }
}

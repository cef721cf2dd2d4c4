//! Convenience re-exports for pool users.

pub use crate::alloc::{AlignedAlloc, Allocator, BufferRecord, PoolBuffer};
pub use crate::config::{MatchRatio, PoolConfig};
pub use crate::error::{Error, Result};
pub use crate::event::{DiagnosticSink, PoolEvent, TracingSink};

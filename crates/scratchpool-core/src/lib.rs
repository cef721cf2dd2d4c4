#![forbid(unsafe_code)]
//! scratchpool-core: contracts shared by every pool allocator.
//!
//! We keep only interfaces, configuration, diagnostics, and errors here so any
//! crate can depend on the API without pulling the bookkeeping logic. The
//! concrete pools live in `scratchpool-mem`.

pub mod alloc;
pub mod config;
pub mod error;
pub mod event;
pub mod prelude;

pub use alloc::{AlignedAlloc, Allocator, BufferRecord, PoolBuffer};
pub use config::{MatchRatio, PoolConfig, DEFAULT_DROP_THRESHOLD};
pub use error::{Error, Result};
pub use event::{DiagnosticSink, PoolEvent, TracingSink};

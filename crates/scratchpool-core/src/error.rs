use thiserror::Error;

use crate::alloc::BufferRecord;

/// Canonical result for scratchpool.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {field} = {value}")]
    InvalidConfiguration { field: &'static str, value: String },

    /// `release` got a buffer the pool does not have checked out.
    #[error("release of untracked buffer at {address:#x} (double release: {double_release})")]
    UntrackedRelease { address: usize, double_release: bool },

    #[error("pool torn down with {} buffer(s) still checked out", .records.len())]
    OutstandingAtTeardown { records: Vec<BufferRecord> },

    #[error("allocation failed for {bytes} bytes")]
    AllocFailed { bytes: usize },

    #[error("configuration source error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

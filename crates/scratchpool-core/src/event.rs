//! Structured diagnostics emitted by pools.
//!
//! Pools never format log lines themselves. They build a [`PoolEvent`] and hand
//! it to the [`DiagnosticSink`] they were constructed with, so callers can route
//! events to their own logging or telemetry.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolEvent {
    /// A setter or constructor got a value outside its domain; nothing changed.
    InvalidConfiguration { field: &'static str, value: String },

    /// `release` got an address the pool does not have checked out.
    UntrackedRelease {
        address: usize,
        /// The address is currently cached, so this is a repeated release.
        double_release: bool,
        available: usize,
        checked_out: usize,
    },

    /// A buffer was still on loan when its pool was torn down.
    OutstandingAtTeardown {
        address: usize,
        size: usize,
        checked_out: usize,
    },
}

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: &PoolEvent);
}

/// Default sink: forwards events to `tracing` (feature `tracing`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl DiagnosticSink for TracingSink {
    fn emit(&self, event: &PoolEvent) {
        match event {
            PoolEvent::InvalidConfiguration { field, value } => {
                tracing::warn!(%field, %value, "invalid pool configuration rejected");
            }
            PoolEvent::UntrackedRelease {
                address,
                double_release,
                available,
                checked_out,
            } => {
                tracing::error!(
                    address = %format!("{:#x}", address),
                    double_release,
                    available,
                    checked_out,
                    "pool allocator got wild buffer"
                );
            }
            PoolEvent::OutstandingAtTeardown {
                address,
                size,
                checked_out,
            } => {
                tracing::error!(
                    address = %format!("{:#x}", address),
                    size,
                    checked_out,
                    "pool allocator destroyed too early, buffer still in use"
                );
            }
        }
    }
}

#[cfg(not(feature = "tracing"))]
impl DiagnosticSink for TracingSink {
    fn emit(&self, _event: &PoolEvent) { /* no-op */
    }
}

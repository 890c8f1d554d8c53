//! Error types for the `sociogenesis-world` crate.
//!
//! Only the substrate boundary can fail: the per-tick field and economy
//! steps clamp instead of erroring.

/// Errors that can occur during substrate operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The substrate is full.
    #[error("agent substrate is at capacity ({capacity})")]
    CapacityExceeded {
        /// Maximum agent count.
        capacity: usize,
    },

    /// An agent index was outside `[0, count)`.
    #[error("agent index {index} out of range (count {count})")]
    AgentOutOfRange {
        /// The requested index.
        index: usize,
        /// Current agent count.
        count: usize,
    },

    /// A requested capacity was zero.
    #[error("substrate capacity must be at least 1")]
    ZeroCapacity,
}

//! Ring Buffer Error Types

use thiserror::Error;

/// Errors returned by the ring buffer and record helpers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    /// Ring not started or already stopped
    #[error("Connectivity log ring is not active")]
    Inactive,

    /// No free slot, the record was dropped
    #[error("Connectivity log ring is full")]
    Full,

    /// Unrecoverable resource condition at start
    #[error("Connectivity log ring unavailable: {0}")]
    Fatal(String),

    /// Raw subtype outside the tag table
    #[error("Invalid log subtype {0}")]
    InvalidSubtype(u8),

    /// Wire encoding failed
    #[error("Record encoding failed: {0}")]
    Encode(String),
}

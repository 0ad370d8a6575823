//! Frame Decoding Errors

use thiserror::Error;

/// Errors while decoding 802.11 data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Buffer shorter than a management header
    #[error("Frame too short: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    /// MAC address text could not be parsed
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),
}

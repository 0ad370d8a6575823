//! Connectivity Log Error Types

use connlog_ring::RingError;
use thiserror::Error;

/// Errors from the connectivity log façade
///
/// Producer-path variants are expected under load and only ever debug-logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// Ring rejected the record
    #[error(transparent)]
    Ring(#[from] RingError),

    /// No vdev with this id
    #[error("Invalid vdev {0}")]
    InvalidVdev(u8),

    /// Vdev not in a mode that is logged
    #[error("Vdev {vdev_id} in unsupported mode {opmode:?}")]
    WrongOpmode {
        vdev_id: u8,
        opmode: crate::OpMode,
    },

    /// No cached frames for this BSSID
    #[error("No cached SAE frames for {bssid} on vdev {vdev_id}")]
    NotFound {
        bssid: wlan_frame::MacAddr,
        vdev_id: u8,
    },

    /// Scratch buffer allocation failed
    #[error("Out of memory for delivery batch")]
    OutOfMemory,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

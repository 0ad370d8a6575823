//! Connectivity Log Ring Buffer
//!
//! Fixed-capacity circular buffer of connectivity log records. Many producers
//! enqueue under a short non-sleeping lock, a single consumer drains in FIFO
//! order through a fixed-window delivery throttle. Records that arrive while
//! the ring is full are dropped and counted.

mod buffer;
mod clock;
mod error;
mod record;
mod throttle;

pub use buffer::{RingBuffer, Slot, WLAN_MAX_LOG_RECORDS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RingError;
pub use record::{
    BtmCandidateInfo, BtmInfo, CandidateApInfo, LogRecord, MainTag, PacketInfo, RecordPayload,
    RoamResultInfo, RoamScanInfo, RoamTriggerInfo, ScanFreqList, MAX_ROAM_SCAN_CHAN,
};
pub use throttle::{DeliveryThrottle, WINDOW_MS, WLAN_RECORDS_PER_SEC};

/// Maximum records handed to the sink in a single delivery
pub const MAX_RECORD_IN_SINGLE_EVT: usize = 5;

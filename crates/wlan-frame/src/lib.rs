//! IEEE 802.11 Management Frame Helpers
//!
//! Provides the MAC address type and the small amount of management-header
//! decoding the connectivity log needs: address 3 (BSSID), the sequence
//! number and the retry bit.

mod error;
mod header;
mod mac;

pub use error::FrameError;
pub use header::{MgmtHeader, MGMT_HEADER_LEN};
pub use mac::MacAddr;

/// 802.11 authentication algorithm numbers
pub mod auth_algo {
    /// Open System
    pub const OPEN_SYSTEM: u16 = 0;
    /// Shared Key
    pub const SHARED_KEY: u16 = 1;
    /// Fast BSS Transition
    pub const FT: u16 = 2;
    /// Simultaneous Authentication of Equals (WPA3)
    pub const SAE: u16 = 3;
    /// FILS shared key
    pub const FILS_SK: u16 = 4;
}

/// Frame control field masks
pub mod fc {
    pub const TYPE_MASK: u16 = 0x000C;
    pub const SUBTYPE_MASK: u16 = 0x00F0;
    pub const TYPE_MGMT: u16 = 0x0000;
    pub const SUBTYPE_ASSOC_REQ: u16 = 0x0000;
    pub const SUBTYPE_ASSOC_RESP: u16 = 0x0010;
    pub const SUBTYPE_REASSOC_REQ: u16 = 0x0020;
    pub const SUBTYPE_REASSOC_RESP: u16 = 0x0030;
    pub const SUBTYPE_DISASSOC: u16 = 0x00A0;
    pub const SUBTYPE_AUTH: u16 = 0x00B0;
    pub const SUBTYPE_DEAUTH: u16 = 0x00C0;
    /// Retry bit in the second frame control byte
    pub const RETRY_FLAG: u8 = 0x08;
}

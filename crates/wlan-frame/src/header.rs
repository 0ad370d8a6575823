//! Management Header Decoding
//!
//! Layout (little-endian): frame control (2), duration (2), addr1 (6),
//! addr2 (6), addr3 (6), sequence control (2).

use crate::{fc, FrameError, MacAddr};

/// Length of a 802.11 management header without HT control
pub const MGMT_HEADER_LEN: usize = 24;

/// Decoded fields of a management frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MgmtHeader {
    /// Frame control field
    pub frame_control: u16,
    /// Receiver address
    pub addr1: MacAddr,
    /// Transmitter address
    pub addr2: MacAddr,
    /// BSSID
    pub addr3: MacAddr,
    /// Raw sequence control field
    pub seq_ctrl: u16,
}

impl MgmtHeader {
    /// Decode the fixed header at the start of `buf`
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < MGMT_HEADER_LEN {
            return Err(FrameError::Truncated {
                needed: MGMT_HEADER_LEN,
                actual: buf.len(),
            });
        }

        let mac_at = |offset: usize| {
            let mut octets = [0u8; 6];
            octets.copy_from_slice(&buf[offset..offset + 6]);
            MacAddr(octets)
        };

        Ok(Self {
            frame_control: u16::from_le_bytes([buf[0], buf[1]]),
            addr1: mac_at(4),
            addr2: mac_at(10),
            addr3: mac_at(16),
            seq_ctrl: u16::from_le_bytes([buf[22], buf[23]]),
        })
    }

    /// The BSSID carried in address 3
    pub fn bssid(&self) -> MacAddr {
        self.addr3
    }

    /// Sequence number (upper 12 bits of sequence control)
    pub fn sequence_number(&self) -> u16 {
        self.seq_ctrl >> 4
    }

    /// Fragment number (lower 4 bits of sequence control)
    pub fn fragment_number(&self) -> u8 {
        (self.seq_ctrl & 0x000F) as u8
    }

    /// Retry bit from the second frame control byte
    pub fn is_retry(&self) -> bool {
        (self.frame_control.to_le_bytes()[1] & fc::RETRY_FLAG) != 0
    }

    /// Management frame subtype bits
    pub fn subtype(&self) -> u16 {
        self.frame_control & fc::SUBTYPE_MASK
    }

    /// Check for a management frame
    pub fn is_mgmt(&self) -> bool {
        (self.frame_control & fc::TYPE_MASK) == fc::TYPE_MGMT
    }

    /// Check for an authentication frame
    pub fn is_auth(&self) -> bool {
        self.is_mgmt() && self.subtype() == fc::SUBTYPE_AUTH
    }

    /// Encode back into a 24-byte header
    pub fn to_bytes(&self) -> [u8; MGMT_HEADER_LEN] {
        let mut buf = [0u8; MGMT_HEADER_LEN];
        buf[0..2].copy_from_slice(&self.frame_control.to_le_bytes());
        buf[4..10].copy_from_slice(&self.addr1.0);
        buf[10..16].copy_from_slice(&self.addr2.0);
        buf[16..22].copy_from_slice(&self.addr3.0);
        buf[22..24].copy_from_slice(&self.seq_ctrl.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn auth_frame(seq: u16, retry: bool) -> Vec<u8> {
        let mut buf = vec![0u8; 30];
        buf[0] = 0xB0; // auth
        buf[1] = if retry { fc::RETRY_FLAG } else { 0 };
        buf[4..10].copy_from_slice(&[0x02, 0, 0, 0, 0, 0x01]);
        buf[10..16].copy_from_slice(&[0x02, 0, 0, 0, 0, 0x02]);
        buf[16..22].copy_from_slice(&[0x02, 0, 0, 0, 0, 0x03]);
        buf[22..24].copy_from_slice(&(seq << 4).to_le_bytes());
        buf
    }

    #[test]
    fn test_parse_auth_header() {
        let header = MgmtHeader::parse(&auth_frame(1234, true)).unwrap();
        assert!(header.is_auth());
        assert!(header.is_retry());
        assert_eq!(header.sequence_number(), 1234);
        assert_eq!(header.fragment_number(), 0);
        assert_eq!(header.bssid(), MacAddr([0x02, 0, 0, 0, 0, 0x03]));
        assert_eq!(header.addr2, MacAddr([0x02, 0, 0, 0, 0, 0x02]));
    }

    #[test]
    fn test_no_retry_bit() {
        let header = MgmtHeader::parse(&auth_frame(7, false)).unwrap();
        assert!(!header.is_retry());
    }

    #[test]
    fn test_truncated() {
        let err = MgmtHeader::parse(&[0u8; 23]).unwrap_err();
        assert_eq!(err, FrameError::Truncated { needed: 24, actual: 23 });
    }

    proptest! {
        #[test]
        fn sequence_number_is_upper_twelve_bits(seq_ctrl in any::<u16>()) {
            let mut buf = auth_frame(0, false);
            buf[22..24].copy_from_slice(&seq_ctrl.to_le_bytes());
            let header = MgmtHeader::parse(&buf).unwrap();
            prop_assert_eq!(header.sequence_number(), seq_ctrl >> 4);
            prop_assert!(header.sequence_number() < 4096);
        }
    }
}

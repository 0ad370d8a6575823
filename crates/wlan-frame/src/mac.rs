//! MAC Address Type

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::FrameError;

/// 48-bit IEEE MAC address
///
/// Text formats carry the colon-separated form, binary formats the six octets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// All-zero address
    pub const ZERO: MacAddr = MacAddr([0; 6]);

    /// Build from the first six bytes of a slice
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let octets: [u8; 6] = bytes.get(..6)?.try_into().ok()?;
        Some(Self(octets))
    }

    /// Check for the all-zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    /// Raw octets
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');

        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| FrameError::InvalidMac(s.to_string()))?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(FrameError::InvalidMac(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| FrameError::InvalidMac(s.to_string()))?;
        }

        if parts.next().is_some() {
            return Err(FrameError::InvalidMac(s.to_string()));
        }

        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = FrameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            MacAddr::try_from(s).map_err(de::Error::custom)
        } else {
            <[u8; 6]>::deserialize(deserializer).map(MacAddr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let mac = MacAddr([0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0xfe]);
        assert_eq!(mac.to_string(), "00:1a:2b:3c:4d:fe");
        assert_eq!("00:1A:2B:3C:4D:FE".parse::<MacAddr>().unwrap(), mac);
        assert_eq!("00-1a-2b-3c-4d-fe".parse::<MacAddr>().unwrap(), mac);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("00:1a:2b:3c:4d".parse::<MacAddr>().is_err());
        assert!("00:1a:2b:3c:4d:fe:01".parse::<MacAddr>().is_err());
        assert!("zz:1a:2b:3c:4d:fe".parse::<MacAddr>().is_err());
        assert!("001:a:2b:3c:4d:fe".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_parse_rejects_signed_octets() {
        assert!("+1:02:03:04:05:06".parse::<MacAddr>().is_err());
        assert!("01:02:03:04:05:-6".parse::<MacAddr>().is_err());
        assert!("01:02:03:04:05: 6".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_binary_form_is_six_octets() {
        let mac = MacAddr([0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22]);
        let bytes = postcard::to_allocvec(&mac).unwrap();
        assert_eq!(bytes, vec![0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22]);
        let back: MacAddr = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn test_serde_as_string() {
        let mac = MacAddr([0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22]);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"aa:bb:cc:00:11:22\"");
        let back: MacAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn test_from_slice() {
        assert_eq!(MacAddr::from_slice(&[1, 2, 3]), None);
        assert_eq!(
            MacAddr::from_slice(&[1, 2, 3, 4, 5, 6, 7]),
            Some(MacAddr([1, 2, 3, 4, 5, 6]))
        );
        assert!(MacAddr::ZERO.is_zero());
    }
}

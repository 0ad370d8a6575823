//! Connectivity Log Records

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use wlan_frame::MacAddr;

use crate::{Clock, RingError};

/// Event kind carried by a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MainTag {
    Connecting = 0,
    ConnectingFail,
    AuthReq,
    AuthResp,
    AssocReq,
    AssocRsp,
    ReassocReq,
    ReassocRsp,
    DeauthRx,
    DeauthTx,
    DisassocRx,
    DisassocTx,
    DisconnBmiss,
    RoamScanStart,
    RoamScanDone,
    RoamScoreCurrAp,
    RoamScoreCandAp,
    RoamResult,
    RoamCancel,
    BtmReq,
    BtmQuery,
    BtmResp,
    BtmReqCandi,
    RoamWtc,
    DhcpDiscover,
    DhcpOffer,
    DhcpRequest,
    DhcpAck,
    DhcpNack,
    EapolM1,
    EapolM2,
    EapolM3,
    EapolM4,
    GtkM1,
    GtkM2,
    EapRequest,
    EapResponse,
    EapSuccess,
    EapFailure,
    CustomLog,
}

impl MainTag {
    /// Number of defined tags; raw values at or above this are invalid
    pub const TAG_MAX: u8 = 40;

    const ALL: [MainTag; MainTag::TAG_MAX as usize] = [
        MainTag::Connecting,
        MainTag::ConnectingFail,
        MainTag::AuthReq,
        MainTag::AuthResp,
        MainTag::AssocReq,
        MainTag::AssocRsp,
        MainTag::ReassocReq,
        MainTag::ReassocRsp,
        MainTag::DeauthRx,
        MainTag::DeauthTx,
        MainTag::DisassocRx,
        MainTag::DisassocTx,
        MainTag::DisconnBmiss,
        MainTag::RoamScanStart,
        MainTag::RoamScanDone,
        MainTag::RoamScoreCurrAp,
        MainTag::RoamScoreCandAp,
        MainTag::RoamResult,
        MainTag::RoamCancel,
        MainTag::BtmReq,
        MainTag::BtmQuery,
        MainTag::BtmResp,
        MainTag::BtmReqCandi,
        MainTag::RoamWtc,
        MainTag::DhcpDiscover,
        MainTag::DhcpOffer,
        MainTag::DhcpRequest,
        MainTag::DhcpAck,
        MainTag::DhcpNack,
        MainTag::EapolM1,
        MainTag::EapolM2,
        MainTag::EapolM3,
        MainTag::EapolM4,
        MainTag::GtkM1,
        MainTag::GtkM2,
        MainTag::EapRequest,
        MainTag::EapResponse,
        MainTag::EapSuccess,
        MainTag::EapFailure,
        MainTag::CustomLog,
    ];

    /// Raw tag value
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Authentication request or response
    pub fn is_auth(&self) -> bool {
        matches!(self, MainTag::AuthReq | MainTag::AuthResp)
    }
}

impl TryFrom<u8> for MainTag {
    type Error = RingError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(RingError::InvalidSubtype(raw))
    }
}

/// Management frame details
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketInfo {
    /// Firmware tx completion status
    pub tx_status: u8,
    /// Peer RSSI (dBm)
    pub rssi: i32,
    /// 802.11 sequence number
    pub seq_num: u16,
    /// Status or reason code carried in the frame
    pub frame_status_code: u16,
    /// Authentication algorithm number
    pub auth_algo: u16,
    /// Authentication type
    pub auth_type: u8,
    /// Authentication transaction sequence number
    pub auth_seq_num: u16,
    /// Retry bit of the frame control field
    pub is_retry_frame: bool,
}

/// Roam trigger details
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoamTriggerInfo {
    pub trigger_reason: u32,
    pub trigger_sub_reason: u32,
    /// Current AP RSSI (dBm)
    pub current_rssi: i32,
    /// Current AP channel utilisation
    pub cu_load: u32,
    /// RSSI threshold (dBm), zero unless the trigger is RSSI based
    pub rssi_threshold: i32,
    pub is_full_scan: bool,
}

/// Scored roam candidate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateApInfo {
    pub cand_bssid: MacAddr,
    pub idx: u8,
    pub is_current_ap: bool,
    /// RSSI (dBm)
    pub rssi: i32,
    pub cu_load: u32,
    pub total_score: u32,
    /// Estimated throughput (bps)
    pub etp: u32,
    /// Center frequency (MHz)
    pub freq: u32,
}

/// Outcome of a roam attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoamResultInfo {
    pub is_roam_successful: bool,
    pub roam_fail_reason: u32,
}

/// Channels a roam scan report can list
pub const MAX_ROAM_SCAN_CHAN: usize = 38;

/// Scanned frequencies (MHz), stored inline so records stay `Copy`
///
/// Serialized as a plain sequence of the frequencies in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFreqList {
    len: u8,
    freqs: [u32; MAX_ROAM_SCAN_CHAN],
}

impl ScanFreqList {
    /// Keep the first [`MAX_ROAM_SCAN_CHAN`] of `freqs`
    pub fn truncated<I: IntoIterator<Item = u32>>(freqs: I) -> Self {
        let mut list = Self::default();
        for (slot, freq) in list.freqs.iter_mut().zip(freqs) {
            *slot = freq;
            list.len += 1;
        }
        list
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.freqs[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for ScanFreqList {
    fn default() -> Self {
        Self {
            len: 0,
            freqs: [0; MAX_ROAM_SCAN_CHAN],
        }
    }
}

impl Serialize for ScanFreqList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.as_slice())
    }
}

impl<'de> Deserialize<'de> for ScanFreqList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let freqs = Vec::<u32>::deserialize(deserializer)?;
        if freqs.len() > MAX_ROAM_SCAN_CHAN {
            return Err(de::Error::invalid_length(
                freqs.len(),
                &"at most 38 scan frequencies",
            ));
        }
        Ok(Self::truncated(freqs))
    }
}

/// Roam scan summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoamScanInfo {
    /// APs found besides the current one
    pub cand_ap_count: u8,
    pub scan_freq: ScanFreqList,
}

/// BSS transition management exchange details
///
/// BTM requests fill the token, mode, timers and candidate count. Responses
/// fill the token, status, delay and target. WTC records use the reason
/// fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtmInfo {
    /// Dialog token
    pub token: u8,
    /// Request mode bits
    pub mode: u8,
    /// Disassociation timer (s)
    pub disassoc_timer: u32,
    /// Validity interval (s)
    pub validity_timer: u32,
    pub candidate_list_count: u8,
    pub btm_status_code: u8,
    /// Termination delay (min)
    pub btm_delay: u8,
    pub target_bssid: MacAddr,
    pub reason: u8,
    pub sub_reason: u8,
    /// WTC disallow duration (ms)
    pub wtc_duration: u32,
}

/// Candidate listed in a BTM request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtmCandidateInfo {
    pub bssid: MacAddr,
    pub preference: u8,
    pub idx: u8,
}

/// Subtype-specific record content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordPayload {
    #[default]
    None,
    Packet(PacketInfo),
    RoamTrigger(RoamTriggerInfo),
    RoamScan(RoamScanInfo),
    CandidateAp(CandidateApInfo),
    RoamResult(RoamResultInfo),
    Btm(BtmInfo),
    BtmCandidate(BtmCandidateInfo),
}

/// Fixed-size connectivity log record, copied by value into and out of the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Wall-clock capture time (us)
    pub timestamp_us: u64,
    /// Monotonic capture time (us)
    pub ktime_us: u64,
    /// Firmware event time (us), zero for host-generated events
    pub fw_timestamp_us: u64,
    pub vdev_id: u8,
    pub log_subtype: MainTag,
    pub bssid: MacAddr,
    pub payload: RecordPayload,
}

impl LogRecord {
    /// Create an unstamped record
    pub fn new(vdev_id: u8, log_subtype: MainTag, bssid: MacAddr) -> Self {
        Self {
            timestamp_us: 0,
            ktime_us: 0,
            fw_timestamp_us: 0,
            vdev_id,
            log_subtype,
            bssid,
            payload: RecordPayload::None,
        }
    }

    /// Set both capture times from `clock`
    pub fn stamped(mut self, clock: &dyn Clock) -> Self {
        self.timestamp_us = clock.timestamp_us();
        self.ktime_us = clock.ktime_us();
        self
    }

    /// Attach a payload
    pub fn with_payload(mut self, payload: RecordPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Packet details, if this is a frame record
    pub fn packet(&self) -> Option<&PacketInfo> {
        match &self.payload {
            RecordPayload::Packet(info) => Some(info),
            _ => None,
        }
    }

    /// BTM or WTC details, if this is a BSS transition record
    pub fn btm(&self) -> Option<&BtmInfo> {
        match &self.payload {
            RecordPayload::Btm(info) => Some(info),
            _ => None,
        }
    }

    /// Encode for byte-oriented sinks
    pub fn to_wire(&self) -> Result<Vec<u8>, RingError> {
        postcard::to_allocvec(self).map_err(|e| RingError::Encode(e.to_string()))
    }

    /// Decode a record produced by [`LogRecord::to_wire`]
    pub fn from_wire(bytes: &[u8]) -> Result<Self, RingError> {
        postcard::from_bytes(bytes).map_err(|e| RingError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    #[test]
    fn test_tag_conversion() {
        assert_eq!(MainTag::try_from(2).unwrap(), MainTag::AuthReq);
        assert_eq!(MainTag::try_from(39).unwrap(), MainTag::CustomLog);
        assert_eq!(
            MainTag::try_from(MainTag::TAG_MAX),
            Err(RingError::InvalidSubtype(MainTag::TAG_MAX))
        );
    }

    #[test]
    fn test_tag_table_matches_discriminants() {
        for raw in 0..MainTag::TAG_MAX {
            assert_eq!(MainTag::try_from(raw).unwrap().as_u8(), raw);
        }
    }

    #[test]
    fn test_stamped_record() {
        let clock = ManualClock::starting_at_ms(42);
        let record = LogRecord::new(1, MainTag::AssocReq, MacAddr([1; 6])).stamped(&clock);
        assert_eq!(record.ktime_us, 42_000);
        assert_eq!(record.timestamp_us, 42_000);
        assert!(record.packet().is_none());
    }

    #[test]
    fn test_wire_encoding() {
        let record = LogRecord::new(0, MainTag::AuthResp, MacAddr([0xaa; 6])).with_payload(
            RecordPayload::Packet(PacketInfo {
                rssi: -61,
                seq_num: 812,
                auth_algo: 3,
                auth_seq_num: 2,
                ..Default::default()
            }),
        );
        let bytes = record.to_wire().unwrap();
        assert_eq!(LogRecord::from_wire(&bytes).unwrap(), record);
    }

    #[test]
    fn test_scan_freq_list_caps_and_serializes_used_prefix() {
        let list = ScanFreqList::truncated(2_400..2_500);
        assert_eq!(list.len(), MAX_ROAM_SCAN_CHAN);
        assert_eq!(list.as_slice()[0], 2_400);

        let list = ScanFreqList::truncated([2_412, 5_180]);
        assert_eq!(serde_json::to_string(&list).unwrap(), "[2412,5180]");
        let back: ScanFreqList = serde_json::from_str("[2412,5180]").unwrap();
        assert_eq!(back, list);

        let too_many = format!("{:?}", vec![5_180u32; MAX_ROAM_SCAN_CHAN + 1]);
        assert!(serde_json::from_str::<ScanFreqList>(&too_many).is_err());
    }

    #[test]
    fn test_wire_carries_scan_and_btm_payloads() {
        let scan = LogRecord::new(0, MainTag::RoamScanDone, MacAddr([2; 6])).with_payload(
            RecordPayload::RoamScan(RoamScanInfo {
                cand_ap_count: 2,
                scan_freq: ScanFreqList::truncated([2_437, 5_745, 5_955]),
            }),
        );
        let decoded = LogRecord::from_wire(&scan.to_wire().unwrap()).unwrap();
        let RecordPayload::RoamScan(info) = decoded.payload else {
            panic!("expected scan payload");
        };
        assert_eq!(info.scan_freq.as_slice(), &[2_437, 5_745, 5_955]);

        let wtc = LogRecord::new(0, MainTag::RoamWtc, MacAddr::ZERO).with_payload(
            RecordPayload::Btm(BtmInfo {
                reason: 3,
                sub_reason: 0xFF,
                ..Default::default()
            }),
        );
        let decoded = LogRecord::from_wire(&wtc.to_wire().unwrap()).unwrap();
        assert_eq!(decoded.btm().map(|b| b.sub_reason), Some(0xFF));
    }

    #[test]
    fn test_wire_macs_are_six_octets() {
        let bssid = MacAddr([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let bytes = LogRecord::new(0, MainTag::DeauthRx, bssid).to_wire().unwrap();
        // Three zero varint timestamps, vdev, tag, then the raw octets
        assert_eq!(&bytes[5..11], &bssid.0);
        assert_eq!(bytes.len(), 12);
    }
}

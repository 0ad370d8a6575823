//! Trace Event Format
//!
//! One JSON object per line, discriminated by `event`:
//!
//! ```text
//! {"event":"vdev","vdev_id":0,"opmode":"sta","initial_connect":false}
//! {"event":"mgmt","vdev_id":0,"tag":2,"auth_algo":3,"frame":[176,0,...]}
//! {"event":"flush","vdev_id":0,"bssid":"02:11:22:33:44:55"}
//! {"event":"btm_query","vdev_id":0,"query":{"token":1,"fw_timestamp_ms":10}}
//! ```

use connlog::{
    BtmQuery, BtmRequest, BtmResponse, MacAddr, OpMode, RoamCandidate, RoamFrame, RoamOutcome,
    RoamScanReport, RoamTrigger, ScanAp, WtcTrigger,
};
use serde::{Deserialize, Serialize};

/// A management frame as captured in a trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MgmtEvent {
    pub vdev_id: u8,
    /// Raw subtype value, validated on replay
    pub tag: u8,
    /// Frame bytes starting at the 802.11 header
    pub frame: Vec<u8>,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub tx_status: u8,
    #[serde(default)]
    pub rssi: i32,
    #[serde(default)]
    pub auth_algo: u16,
    #[serde(default)]
    pub auth_type: u8,
    #[serde(default)]
    pub auth_seq: u16,
}

/// One line of a replay trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// Register or replace a vdev
    Vdev {
        vdev_id: u8,
        opmode: OpMode,
        #[serde(default)]
        initial_connect: bool,
    },
    /// Mark a vdev as connecting for the first time or roaming
    InitialConnect { vdev_id: u8, initial_connect: bool },
    /// Firmware capability announcement
    Capability { roam_frame_info_per_candidate: bool },
    Mgmt(MgmtEvent),
    /// Roam candidate chosen: release its cached SAE frames
    Flush { vdev_id: u8, bssid: MacAddr },
    ClearCache { vdev_id: u8 },
    RoamTrigger { vdev_id: u8, trigger: RoamTrigger },
    RoamScanDone { vdev_id: u8, report: RoamScanReport },
    RoamCandidate { idx: u8, candidate: RoamCandidate },
    RoamResult { vdev_id: u8, outcome: RoamOutcome },
    /// Frame firmware exchanged while roaming, with the scan it roamed from
    RoamFrame {
        vdev_id: u8,
        frame: RoamFrame,
        #[serde(default)]
        scan_aps: Vec<ScanAp>,
    },
    BtmQuery { vdev_id: u8, query: BtmQuery },
    BtmRequest { vdev_id: u8, request: BtmRequest },
    BtmResponse { vdev_id: u8, response: BtmResponse },
    Wtc { vdev_id: u8, trigger: WtcTrigger },
}

//! Roam Event Records
//!
//! Firmware roam statistics arrive as a trigger, a scan summary, per-candidate
//! scores, the frames exchanged with the new AP and a final result. Each one
//! becomes a record that bypasses the SAE cache and goes straight to the ring.

use connlog_ring::{
    CandidateApInfo, Clock, LogRecord, MainTag, PacketInfo, RecordPayload, RoamResultInfo,
    RoamScanInfo, RoamTriggerInfo, ScanFreqList,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wlan_frame::{fc, MacAddr};

use crate::{ConnectivityLogger, MAX_ROAM_CANDIDATE_AP};

/// Ceiling for estimated throughput in candidate records
pub const ETP_MAX_VALUE: u32 = 10_000_000;

/// Firmware roam trigger reasons
pub mod trigger_reason {
    pub const PER: u32 = 1;
    pub const BMISS: u32 = 2;
    pub const LOW_RSSI: u32 = 3;
    pub const HIGH_RSSI: u32 = 4;
    pub const PERIODIC: u32 = 5;

    /// Triggers that report the rssi threshold they fired on
    pub fn reports_threshold(reason: u32) -> bool {
        reason == PERIODIC || reason == LOW_RSSI
    }
}

/// Firmware roam failure reasons
pub mod fail_reason {
    pub const NO_SCAN_START: u32 = 1;
    pub const NO_AP_FOUND: u32 = 2;
    pub const NO_CAND_AP_FOUND: u32 = 3;
    pub const HOST: u32 = 4;
    pub const INTERNAL_ABORT: u32 = 13;
    pub const DISCONNECT: u32 = 27;
    pub const SYNC: u32 = 28;
    pub const UNABLE_TO_START_ROAM_HO: u32 = 32;
    pub const UNKNOWN: u32 = 255;

    /// Failures that cancel the roam rather than finish it
    pub fn is_abort(reason: u32) -> bool {
        matches!(
            reason,
            SYNC | DISCONNECT | HOST | INTERNAL_ABORT | UNABLE_TO_START_ROAM_HO
        )
    }
}

/// Handshake message numbers in roam frame reports
pub mod eapol_subtype {
    pub const M1: u16 = 1;
    pub const M2: u16 = 2;
    pub const M3: u16 = 3;
    pub const M4: u16 = 4;
    pub const GTK_M1: u16 = 5;
    pub const GTK_M2: u16 = 6;
}

/// Role of an AP in a roam scan report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanApType {
    Candidate,
    Current,
    Roamed,
}

/// AP entry from a roam scan report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAp {
    pub bssid: MacAddr,
    pub ap_type: ScanApType,
    /// Signal strength magnitude as firmware reports it (dBm, sign dropped)
    pub rssi: u32,
    #[serde(default)]
    pub cu_load: u32,
}

/// Roam trigger report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoamTrigger {
    pub trigger_reason: u32,
    #[serde(default)]
    pub trigger_sub_reason: u32,
    /// Threshold magnitude for rssi based triggers
    #[serde(default)]
    pub rssi_threshold: u32,
    pub fw_timestamp_ms: u64,
    #[serde(default)]
    pub is_full_scan: bool,
    #[serde(default)]
    pub scan_aps: Vec<ScanAp>,
}

/// Single band a roaming vdev is limited to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "2g")]
    Ghz2,
    #[serde(rename = "5g")]
    Ghz5,
    #[serde(rename = "6g")]
    Ghz6,
}

impl Band {
    fn allows(self, freq: u32) -> bool {
        let is_24ghz = (2_412..=2_484).contains(&freq);
        match self {
            Band::Ghz2 => is_24ghz,
            Band::Ghz5 | Band::Ghz6 => !is_24ghz,
        }
    }
}

/// Roam scan completion report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoamScanReport {
    /// Timestamp of the first reported AP
    pub fw_timestamp_ms: u64,
    #[serde(default)]
    pub is_full_scan: bool,
    /// Every AP seen, the current one included
    #[serde(default)]
    pub scan_aps: Vec<ScanAp>,
    /// Channels scanned for a partial scan, the firmware scan channel list
    /// for a full scan
    #[serde(default)]
    pub chan_freqs: Vec<u32>,
    /// Applied to full scan channel lists only
    #[serde(default)]
    pub band: Option<Band>,
}

/// Scoring of one AP considered during a roam scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoamCandidate {
    pub vdev_id: u8,
    pub bssid: MacAddr,
    pub is_current: bool,
    pub rssi: u32,
    #[serde(default)]
    pub cu_load: u32,
    pub total_score: u32,
    /// Estimated throughput in kbps
    pub etp_kbps: u32,
    pub freq: u32,
    pub fw_timestamp_ms: u64,
}

/// Roam completion report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoamOutcome {
    /// Zero when the roam succeeded
    pub status: u32,
    #[serde(default)]
    pub fail_reason: u32,
    #[serde(default)]
    pub fail_bssid: Option<MacAddr>,
    pub fw_timestamp_ms: u64,
    #[serde(default)]
    pub scan_aps: Vec<ScanAp>,
    /// Reason the roam was triggered
    #[serde(default)]
    pub trigger_reason: u32,
    /// Result belongs to a full scan rather than a partial one
    #[serde(default)]
    pub is_full_scan: bool,
    /// Last beacon RSSI of the current AP (dBm)
    #[serde(default)]
    pub beacon_rssi: i32,
}

impl RoamOutcome {
    /// Whether to report the roam as a success
    ///
    /// Finding a candidate counts as success unless firmware explicitly said
    /// no candidate qualified.
    pub fn is_successful(&self) -> bool {
        let ap_found = reported_aps(&self.scan_aps)
            .any(|ap| matches!(ap.ap_type, ScanApType::Candidate | ScanApType::Roamed));
        self.status == 0 || (ap_found && self.fail_reason != fail_reason::NO_CAND_AP_FOUND)
    }
}

/// Kind of frame in a roam frame report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoamFrameType {
    #[default]
    Mgmt,
    Eapol,
}

/// Frame exchanged with the new AP while firmware roamed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoamFrame {
    #[serde(default)]
    pub frame_type: RoamFrameType,
    /// Frame control subtype bits for management frames, an
    /// [`eapol_subtype`] for handshake frames
    pub subtype: u16,
    /// Received from the AP rather than sent to it
    #[serde(default)]
    pub is_rsp: bool,
    pub bssid: MacAddr,
    #[serde(default)]
    pub seq_num: u16,
    #[serde(default)]
    pub auth_algo: u16,
    pub rssi: u32,
    #[serde(default)]
    pub tx_status: u8,
    #[serde(default)]
    pub status_code: u16,
    pub fw_timestamp_ms: u64,
}

impl RoamFrame {
    /// Record tag, or `None` for frames the log does not track
    pub fn tag(&self) -> Option<MainTag> {
        match self.frame_type {
            RoamFrameType::Eapol => match self.subtype {
                eapol_subtype::M1 => Some(MainTag::EapolM1),
                eapol_subtype::M2 => Some(MainTag::EapolM2),
                eapol_subtype::M3 => Some(MainTag::EapolM3),
                eapol_subtype::M4 => Some(MainTag::EapolM4),
                eapol_subtype::GTK_M1 => Some(MainTag::GtkM1),
                eapol_subtype::GTK_M2 => Some(MainTag::GtkM2),
                _ => None,
            },
            RoamFrameType::Mgmt => {
                let is_tx = !self.is_rsp;
                match self.subtype {
                    fc::SUBTYPE_ASSOC_REQ | fc::SUBTYPE_REASSOC_REQ => Some(MainTag::AssocReq),
                    fc::SUBTYPE_ASSOC_RESP | fc::SUBTYPE_REASSOC_RESP => Some(MainTag::AssocRsp),
                    fc::SUBTYPE_DISASSOC if is_tx => Some(MainTag::DisassocTx),
                    fc::SUBTYPE_DISASSOC => Some(MainTag::DisassocRx),
                    fc::SUBTYPE_AUTH if is_tx => Some(MainTag::AuthReq),
                    fc::SUBTYPE_AUTH => Some(MainTag::AuthResp),
                    fc::SUBTYPE_DEAUTH if is_tx => Some(MainTag::DeauthTx),
                    fc::SUBTYPE_DEAUTH => Some(MainTag::DeauthRx),
                    _ => None,
                }
            }
        }
    }
}

fn reported_aps(aps: &[ScanAp]) -> impl Iterator<Item = &ScanAp> {
    aps.iter().take(MAX_ROAM_CANDIDATE_AP)
}

fn current_ap(aps: &[ScanAp]) -> Option<&ScanAp> {
    reported_aps(aps).find(|ap| ap.ap_type == ScanApType::Current)
}

fn fw_us(ms: u64) -> u64 {
    ms.saturating_mul(1000)
}

fn negated(magnitude: u32) -> i32 {
    i32::try_from(magnitude).map_or(i32::MIN, |v| -v)
}

/// `RoamScanStart` record for a trigger
pub(crate) fn trigger_record(vdev_id: u8, trigger: &RoamTrigger, clock: &dyn Clock) -> LogRecord {
    let current = current_ap(&trigger.scan_aps);
    let threshold = if trigger_reason::reports_threshold(trigger.trigger_reason) {
        negated(trigger.rssi_threshold)
    } else {
        0
    };

    let mut record = LogRecord::new(vdev_id, MainTag::RoamScanStart, MacAddr::ZERO)
        .stamped(clock)
        .with_payload(RecordPayload::RoamTrigger(RoamTriggerInfo {
            trigger_reason: trigger.trigger_reason,
            trigger_sub_reason: trigger.trigger_sub_reason,
            current_rssi: current.map_or(0, |ap| negated(ap.rssi)),
            cu_load: current.map_or(0, |ap| ap.cu_load),
            rssi_threshold: threshold,
            is_full_scan: trigger.is_full_scan,
        }));
    record.fw_timestamp_us = fw_us(trigger.fw_timestamp_ms);
    record
}

/// `RoamScanDone` record for a scan report
pub(crate) fn scan_done_record(
    vdev_id: u8,
    report: &RoamScanReport,
    clock: &dyn Clock,
) -> LogRecord {
    let bssid = report.scan_aps.first().map_or(MacAddr::ZERO, |ap| ap.bssid);
    let cand_ap_count = report
        .scan_aps
        .len()
        .checked_sub(1)
        .map_or(0, |n| u8::try_from(n).unwrap_or(u8::MAX));

    let chans = report.chan_freqs.iter().copied();
    let scan_freq = match (report.is_full_scan, report.band) {
        (true, Some(band)) => ScanFreqList::truncated(chans.filter(|freq| band.allows(*freq))),
        _ => ScanFreqList::truncated(chans),
    };

    let mut record = LogRecord::new(vdev_id, MainTag::RoamScanDone, bssid)
        .stamped(clock)
        .with_payload(RecordPayload::RoamScan(RoamScanInfo {
            cand_ap_count,
            scan_freq,
        }));
    record.fw_timestamp_us = fw_us(report.fw_timestamp_ms);
    record
}

/// `RoamScoreCurrAp` or `RoamScoreCandAp` record for a scored AP
pub(crate) fn candidate_record(cand: &RoamCandidate, idx: u8, clock: &dyn Clock) -> LogRecord {
    let tag = if cand.is_current {
        MainTag::RoamScoreCurrAp
    } else {
        MainTag::RoamScoreCandAp
    };

    let mut record = LogRecord::new(cand.vdev_id, tag, cand.bssid)
        .stamped(clock)
        .with_payload(RecordPayload::CandidateAp(CandidateApInfo {
            cand_bssid: cand.bssid,
            idx,
            is_current_ap: cand.is_current,
            rssi: negated(cand.rssi),
            cu_load: cand.cu_load,
            total_score: cand.total_score,
            etp: cand.etp_kbps.saturating_mul(1000).min(ETP_MAX_VALUE),
            freq: cand.freq,
        }));
    record.fw_timestamp_us = fw_us(cand.fw_timestamp_ms);
    record
}

/// `RoamResult` record, then `RoamCancel` when the roam was aborted, then
/// `DisconnBmiss` when a beacon-miss roam found nowhere to go
///
/// Beacon-miss roams report a partial scan and, if that found no candidate,
/// a full scan. The disconnect is logged once: after the full scan, or after
/// the partial scan when `bmiss_skip_full_scan` is set.
pub(crate) fn result_records(
    vdev_id: u8,
    outcome: &RoamOutcome,
    bmiss_skip_full_scan: bool,
    clock: &dyn Clock,
) -> Vec<LogRecord> {
    let current = current_ap(&outcome.scan_aps).map_or(MacAddr::ZERO, |ap| ap.bssid);
    let bssid = outcome
        .fail_bssid
        .filter(|bssid| !bssid.is_zero())
        .unwrap_or(current);
    let is_successful = outcome.is_successful();

    let mut result = LogRecord::new(vdev_id, MainTag::RoamResult, bssid)
        .stamped(clock)
        .with_payload(RecordPayload::RoamResult(RoamResultInfo {
            is_roam_successful: is_successful,
            roam_fail_reason: outcome.fail_reason,
        }));
    result.fw_timestamp_us = fw_us(outcome.fw_timestamp_ms);
    let mut records = vec![result];

    if fail_reason::is_abort(outcome.fail_reason) {
        let mut cancel = LogRecord::new(vdev_id, MainTag::RoamCancel, MacAddr::ZERO)
            .stamped(clock)
            .with_payload(RecordPayload::RoamResult(RoamResultInfo {
                is_roam_successful: false,
                roam_fail_reason: outcome.fail_reason,
            }));
        cancel.fw_timestamp_us = cancel.timestamp_us;
        records.push(cancel);
    }

    if outcome.trigger_reason == trigger_reason::BMISS
        && !is_successful
        && outcome.is_full_scan != bmiss_skip_full_scan
    {
        records.push(
            LogRecord::new(vdev_id, MainTag::DisconnBmiss, current)
                .stamped(clock)
                .with_payload(RecordPayload::Packet(PacketInfo {
                    rssi: outcome.beacon_rssi,
                    ..Default::default()
                })),
        );
    }

    records
}

/// Frame record for a roam frame report, `None` for untracked frames
///
/// The RSSI comes from the scan report when it lists the roamed AP, whose
/// BSSID then replaces the frame's, or the frame's own AP.
pub(crate) fn frame_record(
    vdev_id: u8,
    frame: &RoamFrame,
    scan_aps: &[ScanAp],
    clock: &dyn Clock,
) -> Option<LogRecord> {
    let tag = frame.tag()?;
    let mut bssid = frame.bssid;
    let mut rssi = frame.rssi;
    for ap in reported_aps(scan_aps) {
        if ap.ap_type == ScanApType::Roamed {
            rssi = ap.rssi;
            bssid = ap.bssid;
            break;
        }
        if ap.bssid == frame.bssid {
            rssi = ap.rssi;
            break;
        }
    }

    let mut record = LogRecord::new(vdev_id, tag, bssid)
        .stamped(clock)
        .with_payload(RecordPayload::Packet(PacketInfo {
            tx_status: frame.tx_status,
            rssi: negated(rssi),
            seq_num: frame.seq_num,
            frame_status_code: frame.status_code,
            auth_algo: frame.auth_algo,
            ..Default::default()
        }));
    record.fw_timestamp_us = fw_us(frame.fw_timestamp_ms);
    Some(record)
}

impl ConnectivityLogger {
    pub(crate) fn enqueue_roam(&self, record: LogRecord) {
        if let Err(e) = self.enqueue(record) {
            debug!(
                "Roam event {:?} on vdev {} dropped: {}",
                record.log_subtype, record.vdev_id, e
            );
        }
    }

    /// Log the start of a roam scan
    pub fn roam_trigger_event(&self, vdev_id: u8, trigger: &RoamTrigger) {
        self.enqueue_roam(trigger_record(vdev_id, trigger, self.clock()));
    }

    /// Log what a roam scan found and which channels it covered
    pub fn roam_scan_done_event(&self, vdev_id: u8, report: &RoamScanReport) {
        self.enqueue_roam(scan_done_record(vdev_id, report, self.clock()));
    }

    /// Log the score firmware gave one AP during a roam scan
    pub fn candidate_ap_event(&self, candidate: &RoamCandidate, idx: u8) {
        self.enqueue_roam(candidate_record(candidate, idx, self.clock()));
    }

    /// Log how a roam attempt finished
    pub fn roam_result_event(&self, vdev_id: u8, outcome: &RoamOutcome) {
        let skip_full_scan = self.config().bmiss_skip_full_scan;
        for record in result_records(vdev_id, outcome, skip_full_scan, self.clock()) {
            self.enqueue_roam(record);
        }
    }

    /// Log a frame firmware exchanged with the new AP during roam sync
    pub fn roam_frame_event(&self, vdev_id: u8, frame: &RoamFrame, scan_aps: &[ScanAp]) {
        match frame_record(vdev_id, frame, scan_aps, self.clock()) {
            Some(record) => self.enqueue_roam(record),
            None => debug!(
                "Untracked roam frame {:?}/{} on vdev {}",
                frame.frame_type, frame.subtype, vdev_id
            ),
        }
    }
}

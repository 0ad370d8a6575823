//! BSS Transition Management Records
//!
//! BTM queries, requests with their candidate lists, responses and the
//! vendor WTC triggers that accompany them. Firmware reports timers in
//! milliseconds; the records carry the seconds used on the air.

use connlog_ring::{BtmCandidateInfo, BtmInfo, Clock, LogRecord, MainTag, RecordPayload};
use serde::{Deserialize, Serialize};
use wlan_frame::MacAddr;

use crate::ConnectivityLogger;

/// WTC sub-reason marking a record derived from a BTM response
pub const WTC_BTM_RESPONSE_SUBCODE: u8 = 0xFF;

/// Candidates logged per BTM request
pub const MAX_BTM_CANDIDATES: usize = 8;

/// Neighbor listed in a BTM request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtmCandidate {
    pub bssid: MacAddr,
    #[serde(default)]
    pub preference: u8,
    pub fw_timestamp_ms: u64,
}

/// BTM request received from the AP
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtmRequest {
    pub token: u8,
    #[serde(default)]
    pub request_mode: u8,
    #[serde(default)]
    pub disassoc_timer_ms: u32,
    #[serde(default)]
    pub validity_interval_ms: u32,
    pub fw_timestamp_ms: u64,
    #[serde(default)]
    pub candidates: Vec<BtmCandidate>,
}

/// BTM query sent to the AP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtmQuery {
    pub token: u8,
    #[serde(default)]
    pub reason: u8,
    pub fw_timestamp_ms: u64,
}

/// BTM response sent to the AP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtmResponse {
    pub token: u8,
    pub status: u8,
    /// BSS termination delay (minutes)
    #[serde(default)]
    pub delay: u8,
    #[serde(default)]
    pub target_bssid: MacAddr,
    /// Vendor WTC reason carried in the response, zero when absent
    #[serde(default)]
    pub vsie_reason: u8,
    pub fw_timestamp_ms: u64,
}

/// Vendor WTC roam trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WtcTrigger {
    pub vsie_trigger_reason: u8,
    #[serde(default)]
    pub sub_code: u8,
    #[serde(default)]
    pub duration_ms: u32,
    pub fw_timestamp_ms: u64,
}

fn btm_record(
    vdev_id: u8,
    tag: MainTag,
    info: BtmInfo,
    fw_ms: u64,
    clock: &dyn Clock,
) -> LogRecord {
    let mut record = LogRecord::new(vdev_id, tag, MacAddr::ZERO)
        .stamped(clock)
        .with_payload(RecordPayload::Btm(info));
    record.fw_timestamp_us = fw_ms.saturating_mul(1000);
    record
}

/// `BtmReq` record followed by one `BtmReqCandi` per listed candidate
pub(crate) fn request_records(
    vdev_id: u8,
    req: &BtmRequest,
    clock: &dyn Clock,
) -> Vec<LogRecord> {
    let info = BtmInfo {
        token: req.token,
        mode: req.request_mode,
        disassoc_timer: req.disassoc_timer_ms / 1000,
        validity_timer: req.validity_interval_ms / 1000,
        candidate_list_count: u8::try_from(req.candidates.len()).unwrap_or(u8::MAX),
        ..Default::default()
    };

    let mut records = vec![btm_record(
        vdev_id,
        MainTag::BtmReq,
        info,
        req.fw_timestamp_ms,
        clock,
    )];
    records.extend(
        req.candidates
            .iter()
            .take(MAX_BTM_CANDIDATES)
            .zip(0u8..)
            .map(|(cand, idx)| {
                let mut record = LogRecord::new(vdev_id, MainTag::BtmReqCandi, MacAddr::ZERO)
                    .stamped(clock)
                    .with_payload(RecordPayload::BtmCandidate(BtmCandidateInfo {
                        bssid: cand.bssid,
                        preference: cand.preference,
                        idx,
                    }));
                record.fw_timestamp_us = cand.fw_timestamp_ms.saturating_mul(1000);
                record
            }),
    );
    records
}

pub(crate) fn query_record(vdev_id: u8, query: &BtmQuery, clock: &dyn Clock) -> LogRecord {
    let info = BtmInfo {
        token: query.token,
        reason: query.reason,
        ..Default::default()
    };
    btm_record(vdev_id, MainTag::BtmQuery, info, query.fw_timestamp_ms, clock)
}

/// `BtmResp` record, preceded by a `RoamWtc` record when the response
/// carries a vendor reason
pub(crate) fn response_records(
    vdev_id: u8,
    resp: &BtmResponse,
    clock: &dyn Clock,
) -> Vec<LogRecord> {
    let mut records = Vec::with_capacity(2);
    if resp.vsie_reason != 0 {
        let wtc = BtmInfo {
            reason: resp.vsie_reason,
            sub_reason: WTC_BTM_RESPONSE_SUBCODE,
            ..Default::default()
        };
        records.push(btm_record(
            vdev_id,
            MainTag::RoamWtc,
            wtc,
            resp.fw_timestamp_ms,
            clock,
        ));
    }

    let info = BtmInfo {
        token: resp.token,
        btm_status_code: resp.status,
        btm_delay: resp.delay,
        target_bssid: resp.target_bssid,
        ..Default::default()
    };
    records.push(btm_record(
        vdev_id,
        MainTag::BtmResp,
        info,
        resp.fw_timestamp_ms,
        clock,
    ));
    records
}

pub(crate) fn wtc_record(vdev_id: u8, trigger: &WtcTrigger, clock: &dyn Clock) -> LogRecord {
    let info = BtmInfo {
        reason: trigger.vsie_trigger_reason,
        sub_reason: trigger.sub_code,
        wtc_duration: trigger.duration_ms,
        ..Default::default()
    };
    btm_record(vdev_id, MainTag::RoamWtc, info, trigger.fw_timestamp_ms, clock)
}

impl ConnectivityLogger {
    /// Log a BTM request and the candidates it lists
    pub fn btm_request_event(&self, vdev_id: u8, request: &BtmRequest) {
        for record in request_records(vdev_id, request, self.clock()) {
            self.enqueue_roam(record);
        }
    }

    pub fn btm_query_event(&self, vdev_id: u8, query: &BtmQuery) {
        self.enqueue_roam(query_record(vdev_id, query, self.clock()));
    }

    /// Log a BTM response and any WTC reason it carries
    pub fn btm_response_event(&self, vdev_id: u8, response: &BtmResponse) {
        for record in response_records(vdev_id, response, self.clock()) {
            self.enqueue_roam(record);
        }
    }

    pub fn wtc_event(&self, vdev_id: u8, trigger: &WtcTrigger) {
        self.enqueue_roam(wtc_record(vdev_id, trigger, self.clock()));
    }
}

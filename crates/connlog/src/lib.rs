//! Connectivity Event Logging
//!
//! Best-effort instrumentation of station connect and roam activity:
//! - management frame events classified and stamped by the dispatch façade
//! - roam and BSS transition reports from firmware turned into records
//! - SAE authentication frames held per roam candidate until one is chosen
//! - a bounded ring drained by a background delivery worker into a sink
//!
//! Nothing here ever fails the connection path that produced an event.

mod btm;
mod capability;
mod delivery;
mod dispatch;
mod error;
mod logger;
mod roam;
mod sae_cache;
mod settings;
mod vdev;

pub use btm::{
    BtmCandidate, BtmQuery, BtmRequest, BtmResponse, WtcTrigger, MAX_BTM_CANDIDATES,
    WTC_BTM_RESPONSE_SUBCODE,
};
pub use capability::{CapabilityProvider, FwCapabilities};
pub use delivery::{DeliveryWorker, LogSink};
pub use dispatch::MgmtFrameEvent;
pub use error::LogError;
pub use logger::ConnectivityLogger;
pub use roam::{
    eapol_subtype, fail_reason, trigger_reason, Band, RoamCandidate, RoamFrame, RoamFrameType,
    RoamOutcome, RoamScanReport, RoamTrigger, ScanAp, ScanApType, ETP_MAX_VALUE,
};
pub use sae_cache::{AddOutcome, SaeAuthCache, MAX_CACHED_AUTH_FRAMES, MAX_ROAM_CANDIDATE_AP};
pub use settings::ConnLogConfig;
pub use vdev::{OpMode, VdevProvider, VdevSnapshot, VdevTable};

pub use connlog_ring::{
    BtmCandidateInfo, BtmInfo, Clock, LogRecord, MainTag, ManualClock, PacketInfo, RecordPayload,
    RoamScanInfo, ScanFreqList, SystemClock,
};
pub use wlan_frame::MacAddr;

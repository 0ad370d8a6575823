//! Management Frame Event Dispatch

use connlog_ring::{LogRecord, MainTag, PacketInfo, RecordPayload};
use tracing::debug;
use wlan_frame::{auth_algo, MgmtHeader};

use crate::ConnectivityLogger;

/// A management frame sent or received by MLME
#[derive(Debug, Clone, Copy)]
pub struct MgmtFrameEvent<'a> {
    /// Frame bytes starting at the 802.11 header
    pub frame: &'a [u8],
    pub vdev_id: u8,
    /// Status or reason code from the frame body
    pub status_code: u16,
    pub tx_status: u8,
    pub peer_rssi: i32,
    pub auth_algo: u16,
    pub auth_type: u8,
    pub auth_seq: u16,
    pub tag: MainTag,
}

impl MgmtFrameEvent<'_> {
    /// Build the log record for this frame
    fn to_record(&self, header: &MgmtHeader, logger: &ConnectivityLogger) -> LogRecord {
        LogRecord::new(self.vdev_id, self.tag, header.bssid())
            .stamped(logger.clock())
            .with_payload(RecordPayload::Packet(PacketInfo {
                tx_status: self.tx_status,
                rssi: self.peer_rssi,
                seq_num: header.sequence_number(),
                frame_status_code: self.status_code,
                auth_algo: self.auth_algo,
                auth_type: self.auth_type,
                auth_seq_num: self.auth_seq,
                is_retry_frame: header.is_retry(),
            }))
    }
}

impl ConnectivityLogger {
    /// Log a management frame event
    ///
    /// SAE auth frames seen while roaming are held per candidate when the
    /// firmware reports per-candidate roam frame info; everything else goes
    /// straight to the ring. Failures are only debug-logged.
    pub fn record_connectivity_event(&self, event: &MgmtFrameEvent<'_>) {
        let Some(vdev) = self.vdevs().lookup(event.vdev_id) else {
            debug!("Connectivity event for unknown vdev {} ignored", event.vdev_id);
            return;
        };

        if !vdev.opmode.is_client() {
            debug!(
                "Connectivity event on vdev {} in {:?} mode ignored",
                event.vdev_id, vdev.opmode
            );
            return;
        }

        let header = match MgmtHeader::parse(event.frame) {
            Ok(header) => header,
            Err(e) => {
                debug!("Connectivity event on vdev {} ignored: {}", event.vdev_id, e);
                return;
            }
        };

        let record = event.to_record(&header, self);

        let cache_for_candidate = !vdev.is_initial_connect
            && event.tag.is_auth()
            && event.auth_algo == auth_algo::SAE
            && self.capabilities().roam_frame_info_per_candidate();

        if cache_for_candidate {
            self.cache_sae_auth(record);
            return;
        }

        if let Err(e) = self.enqueue(record) {
            debug!(
                "Connectivity event {:?} on vdev {} dropped: {}",
                event.tag, event.vdev_id, e
            );
        }
    }
}

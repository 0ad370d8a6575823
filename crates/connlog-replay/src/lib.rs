//! Connectivity Log Trace Replay
//!
//! Feeds a recorded trace of vdev, frame and roam events through a
//! [`ConnectivityLogger`] and writes whatever the delivery worker hands
//! to the sink.

mod event;
mod output;

pub use event::{MgmtEvent, ReplayEvent};
pub use output::{OutputFormat, RecordWriter};

use anyhow::{Context, Result};
use connlog::{
    ConnLogConfig, ConnectivityLogger, DeliveryWorker, FwCapabilities, LogSink, MainTag,
    MgmtFrameEvent, VdevSnapshot, VdevTable,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Totals reported once a trace has been replayed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Trace lines applied
    pub events: u64,
    /// Records lost to ring overflow
    pub dropped: u64,
}

/// Initialize logging on stderr, leaving stdout for records
pub fn init_logging(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .with_context(|| format!("invalid log level {:?}", level))?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Logger plus the vdev and capability state a trace drives
struct Replay {
    logger: Arc<ConnectivityLogger>,
    vdevs: Arc<VdevTable>,
    caps: Arc<FwCapabilities>,
}

impl Replay {
    fn new(config: ConnLogConfig) -> Self {
        let vdevs = Arc::new(VdevTable::new());
        let caps = Arc::new(FwCapabilities::new(true));
        let logger = Arc::new(ConnectivityLogger::init(config, vdevs.clone(), caps.clone()));
        Self {
            logger,
            vdevs,
            caps,
        }
    }

    fn apply(&self, event: ReplayEvent) {
        match event {
            ReplayEvent::Vdev {
                vdev_id,
                opmode,
                initial_connect,
            } => {
                self.vdevs.insert(VdevSnapshot {
                    vdev_id,
                    opmode,
                    is_initial_connect: initial_connect,
                });
            }
            ReplayEvent::InitialConnect {
                vdev_id,
                initial_connect,
            } => {
                if !self.vdevs.set_initial_connect(vdev_id, initial_connect) {
                    debug!("Initial connect update for unknown vdev {}", vdev_id);
                }
            }
            ReplayEvent::Capability {
                roam_frame_info_per_candidate,
            } => {
                self.caps
                    .set_roam_frame_info_per_candidate(roam_frame_info_per_candidate);
            }
            ReplayEvent::Mgmt(mgmt) => self.apply_mgmt(&mgmt),
            ReplayEvent::Flush { vdev_id, bssid } => {
                if let Err(e) = self.logger.flush_cached_sae_auth_logs(&bssid, vdev_id) {
                    debug!("Nothing flushed: {}", e);
                }
            }
            ReplayEvent::ClearCache { vdev_id } => self.logger.clear_sae_auth_cache(vdev_id),
            ReplayEvent::RoamTrigger { vdev_id, trigger } => {
                self.logger.roam_trigger_event(vdev_id, &trigger)
            }
            ReplayEvent::RoamScanDone { vdev_id, report } => {
                self.logger.roam_scan_done_event(vdev_id, &report)
            }
            ReplayEvent::RoamCandidate { idx, candidate } => {
                self.logger.candidate_ap_event(&candidate, idx)
            }
            ReplayEvent::RoamResult { vdev_id, outcome } => {
                self.logger.roam_result_event(vdev_id, &outcome)
            }
            ReplayEvent::RoamFrame {
                vdev_id,
                frame,
                scan_aps,
            } => self.logger.roam_frame_event(vdev_id, &frame, &scan_aps),
            ReplayEvent::BtmQuery { vdev_id, query } => {
                self.logger.btm_query_event(vdev_id, &query)
            }
            ReplayEvent::BtmRequest { vdev_id, request } => {
                self.logger.btm_request_event(vdev_id, &request)
            }
            ReplayEvent::BtmResponse { vdev_id, response } => {
                self.logger.btm_response_event(vdev_id, &response)
            }
            ReplayEvent::Wtc { vdev_id, trigger } => self.logger.wtc_event(vdev_id, &trigger),
        }
    }

    fn apply_mgmt(&self, mgmt: &MgmtEvent) {
        let tag = match MainTag::try_from(mgmt.tag) {
            Ok(tag) => tag,
            Err(e) => {
                warn!("Skipping frame on vdev {}: {}", mgmt.vdev_id, e);
                return;
            }
        };

        self.logger.record_connectivity_event(&MgmtFrameEvent {
            frame: &mgmt.frame,
            vdev_id: mgmt.vdev_id,
            status_code: mgmt.status_code,
            tx_status: mgmt.tx_status,
            peer_rssi: mgmt.rssi,
            auth_algo: mgmt.auth_algo,
            auth_type: mgmt.auth_type,
            auth_seq: mgmt.auth_seq,
            tag,
        });
    }
}

/// Apply every trace line, returning how many events were applied
async fn feed<R>(replay: &Replay, input: R) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut events = 0u64;
    let mut lines = input.lines();
    let mut line_no = 0u64;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: ReplayEvent = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid trace event", line_no))?;
        replay.apply(event);
        events += 1;
        tokio::task::yield_now().await;
    }
    Ok(events)
}

/// Replay a JSON-lines trace, delivering records into `sink`
///
/// Returns once every queued record has reached the sink.
pub async fn run_replay<R>(
    input: R,
    config: ConnLogConfig,
    sink: Arc<dyn LogSink>,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let retry = Duration::from_millis(config.retry_interval_ms.max(1));
    let replay = Replay::new(config);
    replay.logger.start(sink)?;

    let (shutdown, worker) = DeliveryWorker::channel(replay.logger.clone());
    let handle = tokio::spawn(worker.run());

    let fed = feed(&replay, input).await;

    while replay.logger.has_pending() && !handle.is_finished() {
        tokio::time::sleep(retry).await;
    }
    let dropped = replay.logger.dropped_count();

    let _ = shutdown.send(true);
    let worker_result = handle.await.context("delivery worker panicked");
    replay.logger.stop();

    let summary = ReplaySummary {
        events: fed?,
        dropped,
    };
    worker_result??;

    info!(
        "Replayed {} events, {} records dropped",
        summary.events, summary.dropped
    );
    Ok(summary)
}

//! Connectivity Logger Handle

use connlog_ring::{Clock, LogRecord, RingBuffer, RingError, SystemClock};
use metrics::counter;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info};
use wlan_frame::MacAddr;

use crate::{
    AddOutcome, CapabilityProvider, ConnLogConfig, LogError, LogSink, OpMode, SaeAuthCache,
    VdevProvider,
};

/// Ring and sink installed between start and stop
#[derive(Clone)]
struct ActiveLog {
    ring: Arc<RingBuffer>,
    sink: Arc<dyn LogSink>,
}

/// Owned handle to the connectivity log
///
/// Created inactive; `start` allocates a ring and registers the sink,
/// `stop` tears both down. Producers may call in from any thread.
pub struct ConnectivityLogger {
    config: ConnLogConfig,
    active: RwLock<Option<ActiveLog>>,
    /// SAE caches keyed by vdev id
    sae_caches: Mutex<HashMap<u8, SaeAuthCache>>,
    vdevs: Arc<dyn VdevProvider>,
    capabilities: Arc<dyn CapabilityProvider>,
    clock: Arc<dyn Clock>,
    /// Signalled whenever a record is queued
    pending: Arc<Notify>,
}

impl ConnectivityLogger {
    /// Create an inactive logger
    pub fn init(
        config: ConnLogConfig,
        vdevs: Arc<dyn VdevProvider>,
        capabilities: Arc<dyn CapabilityProvider>,
    ) -> Self {
        Self::with_clock(config, vdevs, capabilities, Arc::new(SystemClock::new()))
    }

    /// Create an inactive logger reading time from `clock`
    pub fn with_clock(
        config: ConnLogConfig,
        vdevs: Arc<dyn VdevProvider>,
        capabilities: Arc<dyn CapabilityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            active: RwLock::new(None),
            sae_caches: Mutex::new(HashMap::new()),
            vdevs,
            capabilities,
            clock,
            pending: Arc::new(Notify::new()),
        }
    }

    /// Allocate a fresh ring and register the sink
    ///
    /// A logger that is already active is stopped first.
    pub fn start(&self, sink: Arc<dyn LogSink>) -> Result<(), LogError> {
        self.config.validate()?;
        let ring = RingBuffer::start(
            self.config.capacity,
            self.config.throttle(),
            self.clock.clone(),
        )?;

        let previous = self.active.write().replace(ActiveLog {
            ring: Arc::new(ring),
            sink,
        });
        if let Some(previous) = previous {
            previous.ring.stop();
        }

        info!("Connectivity logging started");
        Ok(())
    }

    /// Stop logging; a second call is a no-op
    pub fn stop(&self) {
        let released = self.active.write().take();
        match released {
            Some(active) => {
                active.ring.stop();
                info!("Connectivity logging stopped");
            }
            None => debug!("Connectivity logging already stopped"),
        }
    }

    /// Check whether records are being accepted
    pub fn is_active(&self) -> bool {
        self.active.read().is_some()
    }

    fn ring(&self) -> Option<Arc<RingBuffer>> {
        self.active.read().as_ref().map(|active| active.ring.clone())
    }

    /// Queue a record for delivery
    pub fn enqueue(&self, record: LogRecord) -> Result<(), LogError> {
        let ring = self.ring().ok_or(RingError::Inactive)?;

        let vdev = self
            .vdevs
            .lookup(record.vdev_id)
            .ok_or(LogError::InvalidVdev(record.vdev_id))?;
        if vdev.opmode != OpMode::Sta {
            return Err(LogError::WrongOpmode {
                vdev_id: vdev.vdev_id,
                opmode: vdev.opmode,
            });
        }

        ring.enqueue(record)?;
        self.pending.notify_one();
        Ok(())
    }

    /// Drain one batch into the sink, returning how many records it received
    ///
    /// Returns without touching the sink when nothing is queued. The sink runs
    /// after every ring lock has been released.
    pub fn dequeue_and_deliver(&self) -> Result<usize, LogError> {
        let Some(active) = self.active.read().clone() else {
            return Ok(0);
        };
        if active.ring.is_empty() {
            return Ok(0);
        }

        let max = self.config.max_records_per_event;
        let mut batch: Vec<LogRecord> = Vec::new();
        batch
            .try_reserve_exact(max)
            .map_err(|_| LogError::OutOfMemory)?;
        active.ring.dequeue_into(&mut batch, max);

        active.sink.deliver(&batch);
        counter!("connlog_records_delivered_total").increment(batch.len() as u64);
        Ok(batch.len())
    }

    /// Check whether the ring holds undelivered records
    pub fn has_pending(&self) -> bool {
        self.ring().map_or(false, |ring| !ring.is_empty())
    }

    /// Records dropped by the current ring because it was full
    pub fn dropped_count(&self) -> u64 {
        self.ring().map_or(0, |ring| ring.dropped_count())
    }

    /// Notification fired whenever a record is queued
    pub fn pending(&self) -> Arc<Notify> {
        self.pending.clone()
    }

    /// Active configuration
    pub fn config(&self) -> &ConnLogConfig {
        &self.config
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn vdevs(&self) -> &dyn VdevProvider {
        self.vdevs.as_ref()
    }

    pub(crate) fn capabilities(&self) -> &dyn CapabilityProvider {
        self.capabilities.as_ref()
    }

    /// Hold an SAE auth frame until its candidate is chosen
    pub fn cache_sae_auth(&self, record: LogRecord) -> AddOutcome {
        let outcome = self
            .sae_caches
            .lock()
            .entry(record.vdev_id)
            .or_insert_with(|| {
                SaeAuthCache::new(
                    self.config.max_roam_candidates,
                    self.config.max_cached_auth_frames,
                )
            })
            .add(record);

        match outcome {
            AddOutcome::Appended { .. } | AddOutcome::Bound { .. } => {
                counter!("connlog_sae_frames_cached_total").increment(1);
            }
            AddOutcome::SlotFull { slot } => {
                debug!("SAE cache slot {} full for {}, frame ignored", slot, record.bssid);
            }
            AddOutcome::NoCandidateSlot => {
                debug!(
                    "No free SAE cache slot on vdev {} for {}, frame dropped",
                    record.vdev_id, record.bssid
                );
            }
        }
        outcome
    }

    /// Check whether SAE frames are cached for `bssid`
    pub fn is_log_present_for_bssid(&self, bssid: &MacAddr, vdev_id: u8) -> bool {
        self.sae_caches
            .lock()
            .get(&vdev_id)
            .map_or(false, |cache| cache.is_present(bssid))
    }

    /// Move the frames cached for `bssid` into the ring in arrival order
    pub fn flush_cached_sae_auth_logs(&self, bssid: &MacAddr, vdev_id: u8) -> Result<(), LogError> {
        let records = self
            .sae_caches
            .lock()
            .get_mut(&vdev_id)
            .and_then(|cache| cache.take_for_bssid(bssid))
            .ok_or(LogError::NotFound {
                bssid: *bssid,
                vdev_id,
            })?;

        debug!(
            "Flushing {} cached SAE frames for {} on vdev {}",
            records.len(),
            bssid,
            vdev_id
        );
        for record in records {
            if let Err(e) = self.enqueue(record) {
                debug!("Cached SAE frame for {} dropped: {}", bssid, e);
            }
        }
        Ok(())
    }

    /// Drop every SAE frame cached for the vdev and release its cache
    pub fn clear_sae_auth_cache(&self, vdev_id: u8) {
        if self.sae_caches.lock().remove(&vdev_id).is_some() {
            debug!("SAE auth cache cleared for vdev {}", vdev_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FwCapabilities, VdevSnapshot, VdevTable};
    use connlog_ring::{MainTag, ManualClock};

    fn sta_table() -> Arc<VdevTable> {
        let table = VdevTable::new();
        table.insert(VdevSnapshot {
            vdev_id: 0,
            opmode: OpMode::Sta,
            is_initial_connect: false,
        });
        table.insert(VdevSnapshot {
            vdev_id: 1,
            opmode: OpMode::Sap,
            is_initial_connect: false,
        });
        Arc::new(table)
    }

    fn logger(capacity: usize) -> ConnectivityLogger {
        let config = ConnLogConfig {
            capacity,
            max_records_per_event: 4,
            ..ConnLogConfig::unthrottled()
        };
        ConnectivityLogger::with_clock(
            config,
            sta_table(),
            Arc::new(FwCapabilities::new(true)),
            Arc::new(ManualClock::starting_at_ms(1_000)),
        )
    }

    fn record(vdev_id: u8, n: u64) -> LogRecord {
        let mut record = LogRecord::new(vdev_id, MainTag::AssocReq, MacAddr([0x02, 0, 0, 0, 0, 1]));
        record.ktime_us = n;
        record
    }

    type Delivered = Arc<Mutex<Vec<Vec<u64>>>>;

    fn recording_sink() -> (Arc<dyn LogSink>, Delivered) {
        let delivered: Delivered = Arc::new(Mutex::new(Vec::new()));
        let captured = delivered.clone();
        let sink = move |records: &[LogRecord]| {
            captured
                .lock()
                .push(records.iter().map(|r| r.ktime_us).collect());
        };
        (Arc::new(sink), delivered)
    }

    #[test]
    fn test_delivery_scenario() {
        let logger = logger(4);
        let (sink, delivered) = recording_sink();
        logger.start(sink).unwrap();

        for n in 1..=4 {
            logger.enqueue(record(0, n)).unwrap();
        }
        assert_eq!(logger.dropped_count(), 0);
        assert_eq!(
            logger.enqueue(record(0, 5)),
            Err(LogError::Ring(RingError::Full))
        );
        assert_eq!(logger.dropped_count(), 1);

        assert_eq!(logger.dequeue_and_deliver().unwrap(), 4);
        assert_eq!(*delivered.lock(), vec![vec![1, 2, 3, 4]]);
        assert!(!logger.has_pending());

        logger.enqueue(record(0, 6)).unwrap();
        logger.stop();
        assert_eq!(
            logger.enqueue(record(0, 7)),
            Err(LogError::Ring(RingError::Inactive))
        );
        logger.stop();
    }

    #[test]
    fn test_empty_ring_skips_sink() {
        let logger = logger(4);
        let (sink, delivered) = recording_sink();
        logger.start(sink).unwrap();

        assert_eq!(logger.dequeue_and_deliver().unwrap(), 0);
        assert!(delivered.lock().is_empty());
    }

    #[test]
    fn test_batch_ceiling() {
        let logger = logger(16);
        let (sink, delivered) = recording_sink();
        logger.start(sink).unwrap();

        for n in 1..=10 {
            logger.enqueue(record(0, n)).unwrap();
        }
        assert_eq!(logger.dequeue_and_deliver().unwrap(), 4);
        assert_eq!(logger.dequeue_and_deliver().unwrap(), 4);
        assert_eq!(logger.dequeue_and_deliver().unwrap(), 2);
        assert_eq!(logger.dequeue_and_deliver().unwrap(), 0);
        assert!(delivered.lock().iter().all(|batch| batch.len() <= 4));
    }

    #[test]
    fn test_enqueue_rejects_unknown_or_non_sta_vdev() {
        let logger = logger(4);
        let (sink, _) = recording_sink();
        logger.start(sink).unwrap();

        assert_eq!(logger.enqueue(record(7, 1)), Err(LogError::InvalidVdev(7)));
        assert_eq!(
            logger.enqueue(record(1, 1)),
            Err(LogError::WrongOpmode {
                vdev_id: 1,
                opmode: OpMode::Sap
            })
        );
        assert_eq!(logger.dropped_count(), 0);
    }

    #[test]
    fn test_inactive_before_start() {
        let logger = logger(4);
        assert!(!logger.is_active());
        assert_eq!(
            logger.enqueue(record(0, 1)),
            Err(LogError::Ring(RingError::Inactive))
        );
        assert_eq!(logger.dequeue_and_deliver().unwrap(), 0);
    }

    #[test]
    fn test_restart_allocates_fresh_ring() {
        let logger = logger(2);
        let (sink, _) = recording_sink();
        logger.start(sink.clone()).unwrap();
        logger.enqueue(record(0, 1)).unwrap();
        logger.enqueue(record(0, 2)).unwrap();
        let _ = logger.enqueue(record(0, 3));
        assert_eq!(logger.dropped_count(), 1);

        logger.stop();
        logger.start(sink).unwrap();
        assert_eq!(logger.dropped_count(), 0);
        assert!(!logger.has_pending());
    }

    #[test]
    fn test_sae_flush_scenario() {
        let logger = logger(8);
        let (sink, delivered) = recording_sink();
        logger.start(sink).unwrap();
        let b1 = MacAddr([0x02, 0, 0, 0, 0, 1]);

        assert_eq!(logger.cache_sae_auth(record(0, 10)), AddOutcome::Bound { slot: 0 });
        assert!(logger.is_log_present_for_bssid(&b1, 0));
        assert_eq!(
            logger.cache_sae_auth(record(0, 11)),
            AddOutcome::Appended { slot: 0, position: 1 }
        );
        assert!(!logger.has_pending());

        logger.flush_cached_sae_auth_logs(&b1, 0).unwrap();
        assert!(!logger.is_log_present_for_bssid(&b1, 0));
        assert_eq!(
            logger.flush_cached_sae_auth_logs(&b1, 0),
            Err(LogError::NotFound { bssid: b1, vdev_id: 0 })
        );

        logger.dequeue_and_deliver().unwrap();
        assert_eq!(*delivered.lock(), vec![vec![10, 11]]);
    }

    #[test]
    fn test_clear_sae_cache() {
        let logger = logger(8);
        let b1 = MacAddr([0x02, 0, 0, 0, 0, 1]);
        logger.cache_sae_auth(record(0, 1));
        assert!(logger.sae_caches.lock().contains_key(&0));
        logger.clear_sae_auth_cache(0);
        assert!(!logger.is_log_present_for_bssid(&b1, 0));
        assert!(logger.sae_caches.lock().is_empty());
        // Unknown vdev is a no-op
        logger.clear_sae_auth_cache(5);
    }
}

//! Record Delivery
//!
//! The sink receives drained batches; the worker stands in for the deferred
//! work item that drains the ring whenever a producer signals new records.

use connlog_ring::LogRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{ConnectivityLogger, LogError};

/// Consumer of drained log records
pub trait LogSink: Send + Sync {
    fn deliver(&self, records: &[LogRecord]);
}

impl<F> LogSink for F
where
    F: Fn(&[LogRecord]) + Send + Sync,
{
    fn deliver(&self, records: &[LogRecord]) {
        self(records)
    }
}

/// Background task draining the ring into the sink
pub struct DeliveryWorker {
    logger: Arc<ConnectivityLogger>,
    /// Set to `true` (or dropped) to stop the worker
    shutdown: watch::Receiver<bool>,
    /// Back-off while the throttle holds records back
    retry_interval: Duration,
}

impl DeliveryWorker {
    /// Create a worker stopped through `shutdown`
    pub fn new(logger: Arc<ConnectivityLogger>, shutdown: watch::Receiver<bool>) -> Self {
        let retry_interval = Duration::from_millis(logger.config().retry_interval_ms);
        Self {
            logger,
            shutdown,
            retry_interval,
        }
    }

    /// Create a worker together with its shutdown handle
    pub fn channel(logger: Arc<ConnectivityLogger>) -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self::new(logger, rx))
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Run until shutdown is requested
    pub async fn run(mut self) -> Result<(), LogError> {
        info!("Starting connectivity log delivery worker");
        let pending = self.logger.pending();

        while !self.shutdown_requested() {
            tokio::select! {
                _ = pending.notified() => {
                    if !self.drain().await? {
                        break;
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Delivery worker shutdown handle dropped");
                        break;
                    }
                }
            }
        }

        info!("Connectivity log delivery worker stopped");
        Ok(())
    }

    /// Deliver until the ring is empty; `false` if shutdown interrupted it
    async fn drain(&mut self) -> Result<bool, LogError> {
        loop {
            let delivered = self.logger.dequeue_and_deliver()?;
            if !self.logger.has_pending() {
                return Ok(true);
            }

            if delivered == 0 {
                debug!(
                    "Delivery throttled, retrying in {}ms",
                    self.retry_interval.as_millis()
                );
                tokio::select! {
                    _ = tokio::time::sleep(self.retry_interval) => {}
                    changed = self.shutdown.changed() => {
                        if changed.is_err() || self.shutdown_requested() {
                            return Ok(false);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnLogConfig, FwCapabilities, OpMode, VdevSnapshot, VdevTable};
    use connlog_ring::{MainTag, ManualClock};
    use parking_lot::Mutex;
    use wlan_frame::MacAddr;

    fn logger(config: ConnLogConfig, clock: Arc<ManualClock>) -> Arc<ConnectivityLogger> {
        let vdevs = VdevTable::new();
        vdevs.insert(VdevSnapshot {
            vdev_id: 0,
            opmode: OpMode::Sta,
            is_initial_connect: true,
        });
        Arc::new(ConnectivityLogger::with_clock(
            config,
            Arc::new(vdevs),
            Arc::new(FwCapabilities::default()),
            clock,
        ))
    }

    fn record(n: u64) -> LogRecord {
        let mut record = LogRecord::new(0, MainTag::DeauthRx, MacAddr([0x02, 0, 0, 0, 0, 9]));
        record.ktime_us = n;
        record
    }

    fn collecting_sink() -> (Arc<dyn LogSink>, Arc<Mutex<Vec<usize>>>) {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let captured = batches.clone();
        let sink = move |records: &[LogRecord]| captured.lock().push(records.len());
        (Arc::new(sink), batches)
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_worker_drains_on_signal() {
        let logger = logger(
            ConnLogConfig::unthrottled(),
            Arc::new(ManualClock::starting_at_ms(1_000)),
        );
        let (sink, batches) = collecting_sink();
        logger.start(sink).unwrap();

        let (shutdown, worker) = DeliveryWorker::channel(logger.clone());
        let handle = tokio::spawn(worker.run());

        for n in 1..=12 {
            logger.enqueue(record(n)).unwrap();
        }

        let observed = batches.clone();
        wait_for(move || observed.lock().iter().sum::<usize>() == 12).await;
        assert!(batches.lock().iter().all(|len| *len <= 5));
        assert!(!logger.has_pending());

        shutdown.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_worker_respects_throttle() {
        let clock = Arc::new(ManualClock::starting_at_ms(10_000));
        let config = ConnLogConfig {
            records_per_sec: 3,
            retry_interval_ms: 5,
            ..Default::default()
        };
        let logger = logger(config, clock.clone());
        let (sink, batches) = collecting_sink();
        logger.start(sink).unwrap();

        let (shutdown, worker) = DeliveryWorker::channel(logger.clone());
        let handle = tokio::spawn(worker.run());

        for n in 1..=7 {
            logger.enqueue(record(n)).unwrap();
        }

        let observed = batches.clone();
        wait_for(move || observed.lock().iter().sum::<usize>() == 3).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(batches.lock().iter().sum::<usize>(), 3);

        // Next window releases the next three
        clock.advance_ms(1_001);
        let observed = batches.clone();
        wait_for(move || observed.lock().iter().sum::<usize>() == 6).await;

        shutdown.send(true).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(logger.dropped_count(), 0);
    }

    #[tokio::test]
    async fn test_worker_stops_when_handle_dropped() {
        let logger = logger(
            ConnLogConfig::unthrottled(),
            Arc::new(ManualClock::starting_at_ms(1_000)),
        );
        let (shutdown, worker) = DeliveryWorker::channel(logger);
        let handle = tokio::spawn(worker.run());
        drop(shutdown);
        handle.await.unwrap().unwrap();
    }
}

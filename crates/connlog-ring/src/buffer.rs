//! Bounded Connectivity Log Ring

use metrics::{counter, gauge};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{Clock, DeliveryThrottle, LogRecord, RingError};

/// Default ring capacity
pub const WLAN_MAX_LOG_RECORDS: usize = 45;

/// Drops between repeated overflow warnings
const DROP_WARN_INTERVAL: u64 = 100;

/// Occupancy of a ring slot or cache position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Slot {
    #[default]
    Empty,
    Filled(LogRecord),
}

impl Slot {
    /// Check whether the slot holds a record
    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }

    /// Borrow the held record
    pub fn record(&self) -> Option<&LogRecord> {
        match self {
            Slot::Filled(record) => Some(record),
            Slot::Empty => None,
        }
    }

    /// Move the record out, leaving the slot empty
    pub fn take(&mut self) -> Option<LogRecord> {
        match std::mem::take(self) {
            Slot::Filled(record) => Some(record),
            Slot::Empty => None,
        }
    }
}

/// State that only exists while the ring is active
struct RingState {
    slots: Box<[Slot]>,
    read: usize,
    write: usize,
    throttle: DeliveryThrottle,
}

impl RingState {
    fn next(&self, idx: usize) -> usize {
        if idx + 1 == self.slots.len() {
            0
        } else {
            idx + 1
        }
    }

    fn len(&self) -> usize {
        let capacity = self.slots.len();
        if self.read == self.write {
            if self.slots[self.write].is_filled() {
                capacity
            } else {
                0
            }
        } else {
            (self.write + capacity - self.read) % capacity
        }
    }
}

/// Multi-producer, single-consumer ring of log records
///
/// Producers and the consumer share one short critical section guarded by a
/// non-sleeping mutex. A record that finds the ring full is dropped and
/// counted; nothing already queued is overwritten.
pub struct RingBuffer {
    /// `None` once stopped
    state: Mutex<Option<RingState>>,
    /// Capacity fixed at start
    capacity: usize,
    /// Records dropped because the ring was full
    dropped: AtomicU64,
    /// Time source for the delivery throttle
    clock: Arc<dyn Clock>,
}

impl RingBuffer {
    /// Allocate an active ring of `capacity` records
    pub fn start(
        capacity: usize,
        throttle: DeliveryThrottle,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RingError> {
        if capacity == 0 {
            error!("Connectivity log ring requested with zero capacity");
            return Err(RingError::Fatal("zero capacity".to_string()));
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|e| {
            error!("Connectivity log ring allocation failed: {}", e);
            RingError::Fatal(e.to_string())
        })?;
        slots.resize(capacity, Slot::Empty);

        info!(
            "Connectivity log ring started: capacity={}, records_per_sec={}",
            capacity,
            throttle.limit()
        );
        gauge!("connlog_ring_depth").set(0.0);

        Ok(Self {
            state: Mutex::new(Some(RingState {
                slots: slots.into_boxed_slice(),
                read: 0,
                write: 0,
                throttle,
            })),
            capacity,
            dropped: AtomicU64::new(0),
            clock,
        })
    }

    /// Tear down the ring; later calls are no-ops
    pub fn stop(&self) {
        let released = self.state.lock().take();
        match released {
            Some(state) => info!(
                "Connectivity log ring stopped: {} unread, {} dropped",
                state.len(),
                self.dropped_count()
            ),
            None => debug!("Connectivity log ring already stopped"),
        }
    }

    /// Check whether the ring accepts records
    pub fn is_active(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Append a record, dropping it if the ring is full
    pub fn enqueue(&self, record: LogRecord) -> Result<(), RingError> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(RingError::Inactive)?;

        let write = state.write;
        if state.slots[write].is_filled() {
            debug_assert_eq!(state.read, write);
            drop(guard);

            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            counter!("connlog_records_dropped_total").increment(1);
            debug!(
                "Connectivity log ring full, dropped {:?} for vdev {} (total {})",
                record.log_subtype, record.vdev_id, total
            );
            if total % DROP_WARN_INTERVAL == 0 {
                warn!("Connectivity log ring has dropped {} records", total);
            }
            return Err(RingError::Full);
        }

        state.slots[write] = Slot::Filled(record);
        state.write = state.next(write);
        let depth = state.len();
        drop(guard);

        counter!("connlog_records_enqueued_total").increment(1);
        gauge!("connlog_ring_depth").set(depth as f64);
        Ok(())
    }

    /// Take up to `max_records` oldest records, honouring the delivery throttle
    ///
    /// The lock is taken per record so producers are never held off for a
    /// whole batch. Records left behind by the throttle stay queued.
    pub fn dequeue_batch(&self, max_records: usize) -> Vec<LogRecord> {
        let mut batch = Vec::with_capacity(max_records.min(self.capacity));
        self.dequeue_into(&mut batch, max_records);
        batch
    }

    /// Append up to `max_records` oldest records to `out`, returning how many
    pub fn dequeue_into(&self, out: &mut Vec<LogRecord>, max_records: usize) -> usize {
        let mut taken = 0;

        while taken < max_records {
            let mut guard = self.state.lock();
            let Some(state) = guard.as_mut() else {
                break;
            };

            let read = state.read;
            if !state.slots[read].is_filled() {
                break;
            }

            if !state.throttle.admit(self.clock.now_ms()) {
                debug!(
                    "Connectivity log delivery throttled after {} records",
                    state.throttle.sent_in_window()
                );
                break;
            }

            if let Some(record) = state.slots[read].take() {
                out.push(record);
                taken += 1;
            }
            state.read = state.next(read);
        }

        if taken > 0 {
            gauge!("connlog_ring_depth").set(self.len() as f64);
        }
        taken
    }

    /// Number of unread records
    pub fn len(&self) -> usize {
        self.state.lock().as_ref().map_or(0, RingState::len)
    }

    /// Check whether no record is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ring capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records dropped because the ring was full
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

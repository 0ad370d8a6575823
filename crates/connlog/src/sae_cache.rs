//! SAE Authentication Frame Cache
//!
//! During roam pre-authentication the station may run SAE with several
//! candidate APs. Their auth frames are held here, one candidate slot per
//! BSSID, until the roam picks a candidate and its frames are flushed into the
//! ring in arrival order.

use connlog_ring::{LogRecord, Slot};
use wlan_frame::MacAddr;

/// Candidate slots per vdev
pub const MAX_ROAM_CANDIDATE_AP: usize = 8;

/// Frame positions per candidate slot
pub const MAX_CACHED_AUTH_FRAMES: usize = 8;

/// Result of caching one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored in the slot already bound to the BSSID
    Appended { slot: usize, position: usize },
    /// Bound a vacant slot to the BSSID
    Bound { slot: usize },
    /// Slot for the BSSID has no free position, frame ignored
    SlotFull { slot: usize },
    /// Every slot is bound to another BSSID, frame ignored
    NoCandidateSlot,
}

#[derive(Debug, Clone)]
struct CandidateSlot {
    frames: Box<[Slot]>,
}

impl CandidateSlot {
    fn new(max_frames: usize) -> Self {
        Self {
            frames: vec![Slot::Empty; max_frames].into_boxed_slice(),
        }
    }

    /// BSSID of the first cached frame
    fn bound_bssid(&self) -> Option<MacAddr> {
        self.frames[0].record().map(|record| record.bssid)
    }

    fn is_vacant(&self) -> bool {
        self.frames.iter().all(|frame| !frame.is_filled())
    }

    fn clear(&mut self) {
        self.frames.iter_mut().for_each(|frame| *frame = Slot::Empty);
    }
}

/// Per-vdev cache of SAE auth frames keyed by candidate BSSID
#[derive(Debug, Clone)]
pub struct SaeAuthCache {
    candidates: Vec<CandidateSlot>,
}

impl SaeAuthCache {
    /// Create an empty cache
    pub fn new(max_candidates: usize, max_frames: usize) -> Self {
        let max_frames = max_frames.max(1);
        Self {
            candidates: (0..max_candidates)
                .map(|_| CandidateSlot::new(max_frames))
                .collect(),
        }
    }

    fn slot_for(&self, bssid: &MacAddr) -> Option<usize> {
        self.candidates
            .iter()
            .position(|slot| slot.bound_bssid().as_ref() == Some(bssid))
    }

    /// Check whether frames are cached for `bssid`
    pub fn is_present(&self, bssid: &MacAddr) -> bool {
        self.slot_for(bssid).is_some()
    }

    /// Cache a frame under its BSSID
    pub fn add(&mut self, record: LogRecord) -> AddOutcome {
        if let Some(slot) = self.slot_for(&record.bssid) {
            let frames = &mut self.candidates[slot].frames;
            return match frames.iter().position(|frame| !frame.is_filled()) {
                Some(position) => {
                    frames[position] = Slot::Filled(record);
                    AddOutcome::Appended { slot, position }
                }
                None => AddOutcome::SlotFull { slot },
            };
        }

        match self.candidates.iter().position(CandidateSlot::is_vacant) {
            Some(slot) => {
                self.candidates[slot].frames[0] = Slot::Filled(record);
                AddOutcome::Bound { slot }
            }
            None => AddOutcome::NoCandidateSlot,
        }
    }

    /// Remove and return the frames cached for `bssid` in arrival order
    pub fn take_for_bssid(&mut self, bssid: &MacAddr) -> Option<Vec<LogRecord>> {
        let slot = self.slot_for(bssid)?;
        let records = self.candidates[slot]
            .frames
            .iter_mut()
            .filter_map(Slot::take)
            .collect();
        Some(records)
    }

    /// Drop every cached frame
    pub fn clear_all(&mut self) {
        self.candidates.iter_mut().for_each(CandidateSlot::clear);
    }

    /// Number of slots currently bound to a BSSID
    pub fn bound_count(&self) -> usize {
        self.candidates
            .iter()
            .filter(|slot| slot.bound_bssid().is_some())
            .count()
    }
}

impl Default for SaeAuthCache {
    fn default() -> Self {
        Self::new(MAX_ROAM_CANDIDATE_AP, MAX_CACHED_AUTH_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connlog_ring::MainTag;
    use proptest::prelude::*;

    fn frame(bssid: u8, seq: u64) -> LogRecord {
        let mut record = LogRecord::new(0, MainTag::AuthReq, MacAddr([0x02, 0, 0, 0, 0, bssid]));
        record.ktime_us = seq;
        record
    }

    #[test]
    fn test_bind_then_append() {
        let mut cache = SaeAuthCache::default();
        let b1 = MacAddr([0x02, 0, 0, 0, 0, 1]);

        assert!(!cache.is_present(&b1));
        assert_eq!(cache.add(frame(1, 10)), AddOutcome::Bound { slot: 0 });
        assert!(cache.is_present(&b1));
        assert_eq!(
            cache.add(frame(1, 11)),
            AddOutcome::Appended { slot: 0, position: 1 }
        );

        let flushed = cache.take_for_bssid(&b1).unwrap();
        let order: Vec<u64> = flushed.iter().map(|r| r.ktime_us).collect();
        assert_eq!(order, vec![10, 11]);
        assert!(!cache.is_present(&b1));
        assert!(cache.take_for_bssid(&b1).is_none());
    }

    #[test]
    fn test_first_fit_slots() {
        let mut cache = SaeAuthCache::new(3, 2);
        assert_eq!(cache.add(frame(1, 1)), AddOutcome::Bound { slot: 0 });
        assert_eq!(cache.add(frame(2, 2)), AddOutcome::Bound { slot: 1 });
        assert_eq!(cache.add(frame(3, 3)), AddOutcome::Bound { slot: 2 });
        assert_eq!(cache.add(frame(4, 4)), AddOutcome::NoCandidateSlot);

        // Freed slot is reused by the next new BSSID
        cache.take_for_bssid(&MacAddr([0x02, 0, 0, 0, 0, 2])).unwrap();
        assert_eq!(cache.add(frame(4, 5)), AddOutcome::Bound { slot: 1 });
    }

    #[test]
    fn test_full_slot_ignores_frame() {
        let mut cache = SaeAuthCache::new(1, 2);
        cache.add(frame(1, 1));
        cache.add(frame(1, 2));
        assert_eq!(cache.add(frame(1, 3)), AddOutcome::SlotFull { slot: 0 });

        let flushed = cache.take_for_bssid(&MacAddr([0x02, 0, 0, 0, 0, 1])).unwrap();
        assert_eq!(flushed.len(), 2);
    }

    #[test]
    fn test_zero_ktime_frame_is_cached() {
        let mut cache = SaeAuthCache::default();
        cache.add(frame(7, 0));
        assert!(cache.is_present(&MacAddr([0x02, 0, 0, 0, 0, 7])));
    }

    #[test]
    fn test_clear() {
        let mut cache = SaeAuthCache::default();
        cache.add(frame(1, 1));
        cache.add(frame(2, 2));
        assert_eq!(cache.bound_count(), 2);
        cache.clear_all();
        assert_eq!(cache.bound_count(), 0);
    }

    proptest! {
        // A BSSID never occupies two slots and stays present until flushed
        #[test]
        fn single_slot_per_bssid(bssids in proptest::collection::vec(0u8..6, 1..64)) {
            let mut cache = SaeAuthCache::new(4, 3);
            let mut seen = std::collections::HashSet::new();

            for (seq, b) in bssids.iter().enumerate() {
                let outcome = cache.add(frame(*b, seq as u64));
                if outcome != AddOutcome::NoCandidateSlot {
                    seen.insert(*b);
                }

                for id in &seen {
                    let mac = MacAddr([0x02, 0, 0, 0, 0, *id]);
                    let bound = cache
                        .candidates
                        .iter()
                        .filter(|slot| slot.bound_bssid() == Some(mac))
                        .count();
                    prop_assert_eq!(bound, 1);
                    prop_assert!(cache.is_present(&mac));
                }
            }
        }
    }
}

//! Firmware Capability Queries

use std::sync::atomic::{AtomicBool, Ordering};

/// Firmware capabilities consulted when routing events
pub trait CapabilityProvider: Send + Sync {
    /// Firmware reports roam frame info per candidate AP
    fn roam_frame_info_per_candidate(&self) -> bool;
}

/// Capability set updated when firmware announces its features
#[derive(Debug, Default)]
pub struct FwCapabilities {
    roam_frame_info_per_candidate: AtomicBool,
}

impl FwCapabilities {
    pub fn new(roam_frame_info_per_candidate: bool) -> Self {
        Self {
            roam_frame_info_per_candidate: AtomicBool::new(roam_frame_info_per_candidate),
        }
    }

    pub fn set_roam_frame_info_per_candidate(&self, enabled: bool) {
        self.roam_frame_info_per_candidate
            .store(enabled, Ordering::Relaxed);
    }
}

impl CapabilityProvider for FwCapabilities {
    fn roam_frame_info_per_candidate(&self) -> bool {
        self.roam_frame_info_per_candidate.load(Ordering::Relaxed)
    }
}

//! Virtual Device Lookup

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Operating mode of a vdev
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpMode {
    Sta,
    P2pClient,
    Sap,
    P2pGo,
    Monitor,
    Ndi,
}

impl OpMode {
    /// Station or P2P client, the modes whose frames are logged
    pub fn is_client(&self) -> bool {
        matches!(self, OpMode::Sta | OpMode::P2pClient)
    }
}

/// Point-in-time view of a vdev
///
/// Returned by value, so no reference is held past the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdevSnapshot {
    pub vdev_id: u8,
    pub opmode: OpMode,
    /// First connection attempt, as opposed to a roam
    pub is_initial_connect: bool,
}

/// Source of vdev state
pub trait VdevProvider: Send + Sync {
    fn lookup(&self, vdev_id: u8) -> Option<VdevSnapshot>;
}

/// In-memory vdev registry
#[derive(Debug, Default)]
pub struct VdevTable {
    vdevs: RwLock<HashMap<u8, VdevSnapshot>>,
}

impl VdevTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a vdev
    pub fn insert(&self, vdev: VdevSnapshot) {
        self.vdevs.write().insert(vdev.vdev_id, vdev);
    }

    /// Remove a vdev, returning its last state
    pub fn remove(&self, vdev_id: u8) -> Option<VdevSnapshot> {
        self.vdevs.write().remove(&vdev_id)
    }

    /// Mark whether the vdev is on its initial connection
    pub fn set_initial_connect(&self, vdev_id: u8, initial: bool) -> bool {
        match self.vdevs.write().get_mut(&vdev_id) {
            Some(vdev) => {
                vdev.is_initial_connect = initial;
                true
            }
            None => false,
        }
    }
}

impl VdevProvider for VdevTable {
    fn lookup(&self, vdev_id: u8) -> Option<VdevSnapshot> {
        self.vdevs.read().get(&vdev_id).copied()
    }
}

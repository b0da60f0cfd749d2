use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// One USB-attached storage volume.
///
/// Identity follows the raw device path alone: two records for the same
/// `/dev/disk…` path compare equal even when their volume metadata differs.
/// Records from the legacy `system_profiler` path carry only a mount point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbStorageDevice {
    /// Raw device path (`/dev/disk3s1`). Empty on the legacy path.
    pub device: String,
    /// Filesystem path the volume is mounted at.
    pub mount_point: String,
    /// Human-readable volume name, when the OS reports one.
    pub name: String,
    /// Volume UUID, when the OS reports one.
    pub uuid: String,
}

impl UsbStorageDevice {
    /// Record carrying only a mount point. The legacy `system_profiler`
    /// grammar exposes nothing else at this parse step.
    pub(crate) fn from_mount_point(mount_point: impl Into<String>) -> Self {
        Self {
            device: String::new(),
            mount_point: mount_point.into(),
            name: String::new(),
            uuid: String::new(),
        }
    }
}

impl PartialEq for UsbStorageDevice {
    fn eq(&self, other: &Self) -> bool {
        self.device == other.device
    }
}

impl Eq for UsbStorageDevice {}

impl Hash for UsbStorageDevice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.device.hash(state);
    }
}

impl fmt::Display for UsbStorageDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.name, self.device, self.mount_point)
    }
}

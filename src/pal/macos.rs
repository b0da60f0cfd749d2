//! USB storage detection for macOS.
//!
//! Two incompatible tool grammars exist across the OS history. 10.8 and
//! newer expose per-volume metadata through `df -l` plus `diskutil info`;
//! older releases only reveal mount points inside `system_profiler`'s USB
//! topology dump. The release resolved at construction picks the path.

use std::sync::LazyLock;

use regex::Regex;

use crate::device::UsbStorageDevice;
use crate::process::{CommandExecutor, SystemCommandExecutor};
use crate::{Error, Result};

const CMD_DF: &str = "df -l";
const CMD_DISKUTIL_INFO: &str = "diskutil info";
const CMD_SYSTEM_PROFILER_USB: &str = "system_profiler SPUSBDataType";

const DISK_PREFIX: &str = "/dev/disk";

const INFO_MOUNT_POINT: &str = "Mount Point";
const INFO_PROTOCOL: &str = "Protocol";
const INFO_VOLUME_NAME: &str = "Volume Name";
const INFO_VOLUME_UUID: &str = "Volume UUID";
const PROTOCOL_USB: &str = "USB";

/// `system_profiler` indents its output, so the pattern runs against the
/// trimmed line and must then consume it entirely.
static LEGACY_MOUNT_POINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Mount Point: (.+)$").unwrap());

/// Known macOS releases, oldest first.
///
/// Comparison is declaration order, so "at least Mountain Lion" never
/// depends on parsing version strings of mixed shape ("10.8" vs "11").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MacosRelease {
    Tiger,
    Leopard,
    SnowLeopard,
    Lion,
    MountainLion,
    Mavericks,
    Yosemite,
    ElCapitan,
    Sierra,
    HighSierra,
    Mojave,
    Catalina,
    BigSur,
    Monterey,
    Ventura,
    Sonoma,
}

impl MacosRelease {
    const PREFIXES: [(MacosRelease, &'static str); 16] = [
        (MacosRelease::Tiger, "10.4"),
        (MacosRelease::Leopard, "10.5"),
        (MacosRelease::SnowLeopard, "10.6"),
        (MacosRelease::Lion, "10.7"),
        (MacosRelease::MountainLion, "10.8"),
        (MacosRelease::Mavericks, "10.9"),
        (MacosRelease::Yosemite, "10.10"),
        (MacosRelease::ElCapitan, "10.11"),
        (MacosRelease::Sierra, "10.12"),
        (MacosRelease::HighSierra, "10.13"),
        (MacosRelease::Mojave, "10.14"),
        (MacosRelease::Catalina, "10.15"),
        (MacosRelease::BigSur, "11"),
        (MacosRelease::Monterey, "12"),
        (MacosRelease::Ventura, "13"),
        (MacosRelease::Sonoma, "14"),
    ];

    /// Resolve a raw product version ("13.4.1") to a release, trying the
    /// prefixes in declaration order. An unknown version is a recoverable
    /// condition, not an error.
    pub fn from_version(version: &str) -> Option<Self> {
        Self::PREFIXES
            .iter()
            .find(|(_, prefix)| version.starts_with(prefix))
            .map(|(release, _)| *release)
    }

    /// Version prefix the release is recognized by.
    pub fn version_prefix(self) -> &'static str {
        Self::PREFIXES[self as usize].1
    }
}

/// Source of the raw OS product version, queried once per detector.
pub trait OsVersionSource {
    fn os_version(&self) -> Result<String>;
}

/// Queries the version with `sw_vers -productVersion`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwVers;

impl OsVersionSource for SwVers {
    fn os_version(&self) -> Result<String> {
        let output = std::process::Command::new("sw_vers")
            .arg("-productVersion")
            .output()?;
        if !output.status.success() {
            return Err(Error::CommandFailed("sw_vers".to_string(), output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Accumulator for one `diskutil info` invocation. Created per device,
/// filled line by line, then turned into at most one [`UsbStorageDevice`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct DiskInfo {
    device: String,
    mount_point: String,
    volume_name: String,
    volume_uuid: String,
    is_usb: bool,
}

impl DiskInfo {
    fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            ..Self::default()
        }
    }

    /// Fold one `diskutil info` output line into the accumulator.
    ///
    /// Lines without a colon and unknown keys are tool noise, not errors.
    /// A repeated key overwrites the previous value.
    fn apply_line(&mut self, line: &str) {
        let Some((key, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();
        match key.trim() {
            INFO_MOUNT_POINT => self.mount_point = value.to_string(),
            INFO_PROTOCOL => self.is_usb = value == PROTOCOL_USB,
            INFO_VOLUME_NAME => self.volume_name = value.to_string(),
            INFO_VOLUME_UUID => self.volume_uuid = value.to_string(),
            _ => {}
        }
    }

    /// Build the output record; `None` when the volume is not mounted.
    fn into_device(self) -> Option<UsbStorageDevice> {
        if self.mount_point.is_empty() {
            return None;
        }
        Some(UsbStorageDevice {
            device: self.device,
            mount_point: self.mount_point,
            name: self.volume_name,
            uuid: self.volume_uuid,
        })
    }
}

/// Detector for USB storage on macOS.
///
/// The OS release is resolved once at construction; every call to
/// [`storage_devices`](Self::storage_devices) re-runs the detection
/// commands against that release.
#[derive(Debug)]
pub struct MacosDetector<E = SystemCommandExecutor> {
    executor: E,
    release: Option<MacosRelease>,
}

impl MacosDetector<SystemCommandExecutor> {
    /// Detector wired to the real system commands.
    pub fn system() -> Self {
        Self::new(SystemCommandExecutor, &SwVers)
    }
}

impl<E: CommandExecutor> MacosDetector<E> {
    pub fn new(executor: E, version_source: &impl OsVersionSource) -> Self {
        let release = match version_source.os_version() {
            Ok(version) => {
                let release = MacosRelease::from_version(version.trim());
                if release.is_none() {
                    tracing::error!("Unsupported macOS version: {version}");
                }
                release
            }
            Err(e) => {
                tracing::error!("Failed to query the macOS version: {e}");
                None
            }
        };
        Self { executor, release }
    }

    /// Snapshot of the USB storage devices currently attached.
    ///
    /// Never fails: command problems are logged and truncate only the
    /// affected command's contribution, and an unrecognized OS release
    /// yields an empty list. Devices appear in command output order, with
    /// no deduplication.
    pub fn storage_devices(&self) -> Vec<UsbStorageDevice> {
        match self.release {
            Some(release) if release >= MacosRelease::MountainLion => self.from_disk_listing(),
            Some(_) => self.from_usb_topology(),
            None => Vec::new(),
        }
    }

    /// Modern path: `df -l` lists mounted filesystems; every `/dev/disk…`
    /// subject is inspected with `diskutil info` and kept when its
    /// protocol is USB and it has a mount point.
    fn from_disk_listing(&self) -> Vec<UsbStorageDevice> {
        let mut devices = Vec::new();
        let lines = match self.executor.execute(CMD_DF) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!("Failed to run `{CMD_DF}`: {e}");
                return devices;
            }
        };

        for line in lines {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Failed reading `{CMD_DF}` output: {e}");
                    break;
                }
            };
            let Some(subject) = line.split_whitespace().next() else {
                continue;
            };
            if !subject.starts_with(DISK_PREFIX) {
                continue;
            }
            let info = self.disk_info(subject);
            if info.is_usb {
                devices.extend(info.into_device());
            }
        }

        devices
    }

    /// Legacy path: only mount points are recoverable from the
    /// `system_profiler` USB topology dump, so the records carry neither
    /// device path nor volume metadata.
    fn from_usb_topology(&self) -> Vec<UsbStorageDevice> {
        let mut devices = Vec::new();
        let lines = match self.executor.execute(CMD_SYSTEM_PROFILER_USB) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!("Failed to run `{CMD_SYSTEM_PROFILER_USB}`: {e}");
                return devices;
            }
        };

        for line in lines {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Failed reading `{CMD_SYSTEM_PROFILER_USB}` output: {e}");
                    break;
                }
            };
            if let Some(caps) = LEGACY_MOUNT_POINT.captures(line.trim()) {
                devices.push(UsbStorageDevice::from_mount_point(&caps[1]));
            }
        }

        devices
    }

    /// Run `diskutil info` for one device and fold its key/value output.
    /// Returns whatever was gathered before an I/O failure, if any.
    fn disk_info(&self, device: &str) -> DiskInfo {
        let mut info = DiskInfo::new(device);
        let command = format!("{CMD_DISKUTIL_INFO} {device}");
        let lines = match self.executor.execute(&command) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!("Failed to run `{command}`: {e}");
                return info;
            }
        };

        for line in lines {
            match line {
                Ok(line) => info.apply_line(&line),
                Err(e) => {
                    tracing::error!("Failed reading `{command}` output: {e}");
                    break;
                }
            }
        }

        info
    }
}

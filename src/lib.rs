//! Detect USB-attached storage devices by driving native OS tools and
//! parsing their human-readable output.
//!
//! Detection is a one-shot, synchronous snapshot: no polling, no hot-plug
//! events. Currently implements the macOS backend, which picks between two
//! incompatible tool grammars depending on the OS release (`df`/`diskutil`
//! on 10.8 and newer, `system_profiler` before that).
//!
//! ```no_run
//! for device in usb_drive_detector::storage_devices() {
//!     println!("{device}");
//! }
//! ```

use thiserror::Error;

mod device;
mod pal;
mod process;

pub use device::UsbStorageDevice;
pub use pal::macos::{MacosDetector, MacosRelease, OsVersionSource, SwVers};
pub use process::{CommandExecutor, OutputLines, SystemCommandExecutor};

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
/// Errors for this crate
pub enum Error {
    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Cannot execute an empty command")]
    EmptyCommand,
    #[error("`{0}` exited with {1}")]
    CommandFailed(String, std::process::ExitStatus),
}

/// Enumerate the USB storage devices currently attached to the system.
///
/// Never fails: every command or I/O problem is logged and degrades to
/// omitting the unreadable part of the result. An empty list means no USB
/// storage is attached, or the OS release is not recognized.
pub fn storage_devices() -> Vec<UsbStorageDevice> {
    MacosDetector::system().storage_devices()
}

//! Platform-specific detection backends.
//!
//! Only the macOS backend exists here. Its logic is pure over the injected
//! [`CommandExecutor`](crate::CommandExecutor), so the module compiles and
//! tests on any platform; only the commands it issues are macOS-specific.

pub(crate) mod macos;

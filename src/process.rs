//! Command execution seam.
//!
//! The detectors treat command strings as opaque apart from appending a
//! device path, so the whole OS interaction funnels through one trait that
//! can be scripted in tests.

use std::io::{self, BufRead, BufReader, Lines};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::{Error, Result};

/// Line-oriented output of one executed command.
///
/// The stream is finite and non-restartable. Dropping it releases the
/// underlying resource on every exit path, including early termination.
pub type OutputLines = Box<dyn Iterator<Item = io::Result<String>>>;

/// Runs a command and yields its stdout line by line.
pub trait CommandExecutor {
    fn execute(&self, command: &str) -> Result<OutputLines>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(&self, command: &str) -> Result<OutputLines> {
        (**self).execute(command)
    }
}

/// [`CommandExecutor`] backed by [`std::process::Command`].
///
/// Command strings are split on whitespace; the detector commands are fixed
/// prefixes plus a device path, so no shell quoting exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str) -> Result<OutputLines> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(Error::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child.stdout.take().expect("stdout is piped");

        Ok(Box::new(ChildLines {
            lines: BufReader::new(stdout).lines(),
            child,
        }))
    }
}

struct ChildLines {
    lines: Lines<BufReader<ChildStdout>>,
    child: Child,
}

impl Iterator for ChildLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

impl Drop for ChildLines {
    fn drop(&mut self) {
        // Reap the child even when iteration stopped early.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(
            SystemCommandExecutor.execute("   "),
            Err(Error::EmptyCommand)
        ));
    }

    #[test]
    fn missing_program_is_an_io_error() {
        assert!(matches!(
            SystemCommandExecutor.execute("definitely-not-a-real-program-0xf00"),
            Err(Error::IoError(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn yields_stdout_lines() {
        let lines: Vec<String> = SystemCommandExecutor
            .execute("echo hello world")
            .unwrap()
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(lines, vec!["hello world".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn early_drop_releases_the_stream() {
        let mut lines = SystemCommandExecutor.execute("yes").unwrap();
        assert!(lines.next().is_some());
        drop(lines);
    }
}

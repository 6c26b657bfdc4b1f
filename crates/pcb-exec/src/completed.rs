//! Execution options and results.

use std::borrow::Cow;
use std::path::PathBuf;

use pcb_common::error::{PcbError, Result};
use serde::de::DeserializeOwned;

/// How a single command is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Fail when the process exits non-zero.
    pub check: bool,
    /// Capture standard output instead of inheriting it.
    pub capture_stdout: bool,
    /// Working directory for the process.
    pub work_dir: Option<PathBuf>,
}

impl ExecOptions {
    /// Checked execution with inherited output.
    #[must_use]
    pub const fn checked() -> Self {
        Self {
            check: true,
            capture_stdout: false,
            work_dir: None,
        }
    }

    /// Execution that tolerates a non-zero exit.
    #[must_use]
    pub const fn unchecked() -> Self {
        Self {
            check: false,
            capture_stdout: false,
            work_dir: None,
        }
    }

    /// Captures standard output.
    #[must_use]
    pub fn capture(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// Runs the process in `dir`.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self::checked()
    }
}

/// Outcome of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedExec {
    /// Exit code, `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    /// Standard output, present only when capture was requested.
    pub stdout: Option<Vec<u8>>,
}

impl CompletedExec {
    /// Returns whether the process exited with code zero.
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Captured standard output as text (lossy), empty when not captured.
    pub fn stdout_text(&self) -> Cow<'_, str> {
        self.stdout
            .as_deref()
            .map_or(Cow::Borrowed(""), String::from_utf8_lossy)
    }

    /// Parses the captured standard output as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if output was not captured or is not valid JSON
    /// for `T`.
    pub fn to_json<T: DeserializeOwned>(&self) -> Result<T> {
        let stdout = self
            .stdout
            .as_deref()
            .ok_or_else(|| PcbError::config("standard output was not captured"))?;
        Ok(serde_json::from_slice(stdout)?)
    }
}

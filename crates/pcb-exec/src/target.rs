//! The executor capability and shell discovery shared by every target.
//!
//! A target only has to know how to run an argument vector. Running a
//! shell string is built on top of that: the target probes a fixed list
//! of shells once, caches the first one that works, and then runs
//! `<shell> -c <string>` through its own [`ExecutorTarget::exec`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use pcb_common::constants::SHELL_CANDIDATES;
use pcb_common::error::{PcbError, Result};

use crate::completed::{CompletedExec, ExecOptions};

/// A place commands can be run: the host, a binary, a container.
pub trait ExecutorTarget: fmt::Debug + Send + Sync {
    /// Runs `command` as an argument vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned, or if
    /// `options.check` is set and it exits non-zero.
    fn exec(&self, command: &[String], options: &ExecOptions) -> Result<CompletedExec>;

    /// Cache holding the shell discovered for this target.
    fn shell_cache(&self) -> &ShellCache;

    /// Shell interpreter usable on this target, discovered on first use.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NoShell`] if no candidate runs successfully.
    fn found_shell(&self) -> Result<&str> {
        self.shell_cache().get_or_discover(SHELL_CANDIDATES, |shell| {
            let probe = [shell.to_owned(), "-c".to_owned(), "true".to_owned()];
            self.exec(&probe, &ExecOptions::unchecked())
                .map(|done| done.success())
        })
    }

    /// Runs `shell_cmd` through the discovered shell.
    ///
    /// # Errors
    ///
    /// Returns an error if no shell is available or the execution fails.
    fn exec_shell(&self, shell_cmd: &str, options: &ExecOptions) -> Result<CompletedExec> {
        let shell = self.found_shell()?.to_owned();
        self.exec(&[shell, "-c".to_owned(), shell_cmd.to_owned()], options)
    }
}

/// Executor target shared between wrappers.
pub type SharedTarget = Arc<dyn ExecutorTarget>;

/// Per-target memo of the discovered shell.
#[derive(Debug, Default)]
pub struct ShellCache(OnceLock<String>);

impl ShellCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the cached shell, if discovery already ran.
    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }

    /// Returns the cached shell or runs discovery with `probe`.
    ///
    /// Only a successful discovery is cached.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NoShell`] if every candidate is rejected.
    pub fn get_or_discover<F>(&self, candidates: &[&str], probe: F) -> Result<&str>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        if let Some(shell) = self.get() {
            return Ok(shell);
        }
        let shell = search_shell(candidates, probe)?;
        Ok(self.0.get_or_init(|| shell).as_str())
    }
}

/// Returns the first candidate accepted by `probe`.
///
/// A probe error counts as a rejection: missing binaries are the normal
/// case on hosts lacking some of the candidates.
///
/// # Errors
///
/// Returns [`PcbError::NoShell`] if every candidate is rejected.
pub fn search_shell<F>(candidates: &[&str], mut probe: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    for shell in candidates {
        match probe(shell) {
            Ok(true) => {
                tracing::debug!(shell, "found shell");
                return Ok((*shell).to_owned());
            }
            Ok(false) => tracing::debug!(shell, "shell probe exited non-zero"),
            Err(e) => tracing::debug!(shell, error = %e, "shell probe failed"),
        }
    }
    Err(PcbError::NoShell {
        searched: candidates.iter().map(|s| (*s).to_owned()).collect(),
    })
}

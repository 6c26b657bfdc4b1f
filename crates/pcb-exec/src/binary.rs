//! Executor prefixing every command with a fixed binary invocation.

use pcb_common::error::Result;

use crate::completed::{CompletedExec, ExecOptions};
use crate::target::{ExecutorTarget, SharedTarget, ShellCache};

/// Runs `prefix + command` on an inner executor.
///
/// Used for the container engine (`podman [global args]`) and the compose
/// orchestrator (`podman-compose`).
#[derive(Debug)]
pub struct BinaryExecutor {
    inner: SharedTarget,
    prefix: Vec<String>,
    shell: ShellCache,
}

impl BinaryExecutor {
    /// Wraps `inner`, prefixing every call with `prefix`.
    #[must_use]
    pub fn new<I, S>(inner: SharedTarget, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            prefix: prefix.into_iter().map(Into::into).collect(),
            shell: ShellCache::new(),
        }
    }

    /// The leading tokens of every call.
    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }
}

impl ExecutorTarget for BinaryExecutor {
    fn exec(&self, command: &[String], options: &ExecOptions) -> Result<CompletedExec> {
        let mut full = Vec::with_capacity(self.prefix.len() + command.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(command);
        self.inner.exec(&full, options)
    }

    fn shell_cache(&self) -> &ShellCache {
        &self.shell
    }
}

//! A scripted executor target for tests.
//!
//! [`ScriptedExecutor`] never spawns anything: it records every call and
//! answers with the reply of the first rule whose prefix matches the
//! command, or with its default reply.

use std::sync::Mutex;

use pcb_common::error::{PcbError, Result};

use crate::command::join_quoted;
use crate::completed::{CompletedExec, ExecOptions};
use crate::target::{ExecutorTarget, ShellCache};

/// Canned answer for a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Exit code reported.
    pub exit_code: i32,
    /// Output reported when capture is requested.
    pub stdout: String,
}

impl Reply {
    /// Reply with the given exit code and no output.
    #[must_use]
    pub const fn exit(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
        }
    }

    /// Successful reply printing `stdout`.
    #[must_use]
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
        }
    }
}

/// A call seen by a [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Argument vector received.
    pub command: Vec<String>,
    /// Options received.
    pub options: ExecOptions,
}

/// Executor target answering from a script and recording its calls.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Vec<(Vec<String>, Reply)>,
    default: Reply,
    calls: Mutex<Vec<RecordedCall>>,
    shell: ShellCache,
}

impl ScriptedExecutor {
    /// Target answering every call with exit code zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the reply used when no rule matches.
    #[must_use]
    pub fn with_default(mut self, reply: Reply) -> Self {
        self.default = reply;
        self
    }

    /// Answers commands starting with `prefix` with `reply`.
    #[must_use]
    pub fn on(mut self, prefix: &[&str], reply: Reply) -> Self {
        self.rules
            .push((prefix.iter().map(|s| (*s).to_owned()).collect(), reply));
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn reply_for(&self, command: &[String]) -> &Reply {
        self.rules
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix))
            .map_or(&self.default, |(_, reply)| reply)
    }
}

impl ExecutorTarget for ScriptedExecutor {
    fn exec(&self, command: &[String], options: &ExecOptions) -> Result<CompletedExec> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                command: command.to_vec(),
                options: options.clone(),
            });
        }
        let reply = self.reply_for(command);
        let stdout = options
            .capture_stdout
            .then(|| reply.stdout.clone().into_bytes());
        if options.check && reply.exit_code != 0 {
            return Err(PcbError::ExecFailed {
                command: join_quoted(command),
                exit_code: reply.exit_code,
                stdout: options.capture_stdout.then(|| reply.stdout.clone()),
            });
        }
        Ok(CompletedExec {
            exit_code: reply.exit_code,
            stdout,
        })
    }

    fn shell_cache(&self) -> &ShellCache {
        &self.shell
    }
}

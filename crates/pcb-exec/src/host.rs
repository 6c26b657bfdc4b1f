//! The base executor: processes spawned directly on the local host.

use std::io::Read;
use std::process::{Child, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use pcb_common::error::{PcbError, Result};

use crate::command::join_quoted;
use crate::completed::{CompletedExec, ExecOptions};
use crate::target::{ExecutorTarget, ShellCache};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs commands as local processes, without shell interpretation.
///
/// There is one host executor per run: the binary constructs it once and
/// hands it down, wrapped in an `Arc`, to every executor built on top.
/// Standard input and standard error are inherited; standard output is
/// inherited unless capture is requested.
#[derive(Debug, Default)]
pub struct HostExecutor {
    timeout: Option<Duration>,
    shell: ShellCache,
}

impl HostExecutor {
    /// Host executor waiting for processes without limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Host executor killing processes that run longer than `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            shell: ShellCache::new(),
        }
    }

    /// The configured timeout, if any.
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl ExecutorTarget for HostExecutor {
    fn exec(&self, command: &[String], options: &ExecOptions) -> Result<CompletedExec> {
        let Some((program, args)) = command.split_first() else {
            return Err(PcbError::config("no command specified to run"));
        };
        let rendered = join_quoted(command);
        tracing::debug!(cmd = %rendered, work_dir = ?options.work_dir, "spawning process");

        let mut process = std::process::Command::new(program);
        let _ = process.args(args).stdout(if options.capture_stdout {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });
        if let Some(dir) = &options.work_dir {
            let _ = process.current_dir(dir);
        }

        let child = process.spawn().map_err(|source| PcbError::Spawn {
            command: rendered.clone(),
            source,
        })?;
        let (status, stdout) = match self.timeout {
            None => wait(child, &rendered)?,
            Some(timeout) => wait_with_timeout(child, timeout, &rendered)?,
        };

        let exit_code = status.code().unwrap_or(-1);
        let stdout = options.capture_stdout.then_some(stdout);
        tracing::debug!(cmd = %rendered, exit_code, "process finished");

        if options.check && !status.success() {
            return Err(PcbError::ExecFailed {
                command: rendered,
                exit_code,
                stdout: stdout.map(|out| String::from_utf8_lossy(&out).into_owned()),
            });
        }
        Ok(CompletedExec { exit_code, stdout })
    }

    fn shell_cache(&self) -> &ShellCache {
        &self.shell
    }
}

fn wait(child: Child, rendered: &str) -> Result<(ExitStatus, Vec<u8>)> {
    let output = child.wait_with_output().map_err(|source| PcbError::Spawn {
        command: rendered.to_owned(),
        source,
    })?;
    Ok((output.status, output.stdout))
}

fn wait_with_timeout(
    mut child: Child,
    timeout: Duration,
    rendered: &str,
) -> Result<(ExitStatus, Vec<u8>)> {
    // Drain stdout concurrently so a full pipe cannot stall the child.
    let reader = child.stdout.take().map(|mut out| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = out.read_to_end(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                tracing::warn!(cmd = rendered, pid = child.id(), "timeout elapsed, killing process");
                if let Err(e) = child.kill() {
                    tracing::warn!(pid = child.id(), error = %e, "failed to kill process");
                }
                let _ = child.wait();
                return Err(PcbError::Timeout {
                    command: rendered.to_owned(),
                    timeout,
                });
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(source) => {
                return Err(PcbError::Spawn {
                    command: rendered.to_owned(),
                    source,
                });
            }
        }
    };

    let stdout = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    Ok((status, stdout))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn cmd(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| (*t).to_owned()).collect()
    }

    #[test]
    fn successful_process() {
        let done = HostExecutor::new()
            .exec(&cmd(&["true"]), &ExecOptions::checked())
            .unwrap();
        assert!(done.success());
        assert!(done.stdout.is_none());
    }

    #[test]
    fn checked_failure_carries_exit_code() {
        let err = HostExecutor::new()
            .exec(&cmd(&["false"]), &ExecOptions::checked())
            .unwrap_err();
        assert!(matches!(err, PcbError::ExecFailed { exit_code: 1, .. }));
    }

    #[test]
    fn unchecked_failure_is_reported() {
        let done = HostExecutor::new()
            .exec(&cmd(&["false"]), &ExecOptions::unchecked())
            .unwrap();
        assert_eq!(done.exit_code, 1);
    }

    #[test]
    fn captures_stdout() {
        let done = HostExecutor::new()
            .exec(&cmd(&["echo", "a  b"]), &ExecOptions::checked().capture())
            .unwrap();
        assert_eq!(done.stdout_text(), "a  b\n");
    }

    #[test]
    fn runs_in_work_dir() {
        let done = HostExecutor::new()
            .exec(&cmd(&["pwd"]), &ExecOptions::checked().capture().in_dir("/"))
            .unwrap();
        assert_eq!(done.stdout_text().trim(), "/");
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let err = HostExecutor::new()
            .exec(
                &cmd(&["/nonexistent/pcb-test-binary"]),
                &ExecOptions::unchecked(),
            )
            .unwrap_err();
        assert!(matches!(err, PcbError::Spawn { .. }));
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = HostExecutor::new()
            .exec(&[], &ExecOptions::checked())
            .unwrap_err();
        assert!(matches!(err, PcbError::Config { .. }));
    }

    #[test]
    fn timeout_kills_process() {
        let host = HostExecutor::with_timeout(Duration::from_millis(100));
        let err = host
            .exec(&cmd(&["sleep", "5"]), &ExecOptions::checked())
            .unwrap_err();
        assert!(matches!(
            err,
            PcbError::Timeout { timeout, .. } if timeout == Duration::from_millis(100)
        ));
        assert!(err.to_string().ends_with("timed out after 100ms"), "{err}");
    }

    #[test]
    fn timeout_still_captures_output() {
        let host = HostExecutor::with_timeout(Duration::from_secs(10));
        let done = host
            .exec(&cmd(&["echo", "quick"]), &ExecOptions::checked().capture())
            .unwrap();
        assert_eq!(done.stdout_text(), "quick\n");
    }

    #[test]
    fn finds_a_shell_on_the_host() {
        let host = HostExecutor::new();
        let shell = host.found_shell().unwrap().to_owned();
        assert!(pcb_common::constants::SHELL_CANDIDATES.contains(&shell.as_str()));

        let done = host
            .exec_shell("echo one | tr o O", &ExecOptions::checked().capture())
            .unwrap();
        assert_eq!(done.stdout_text(), "One\n");
    }
}

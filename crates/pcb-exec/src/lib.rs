//! # pcb-exec
//!
//! Command composition and execution against a container host.
//!
//! - **Command**: argument-vector and shell-string commands with
//!   composition (concatenation, piping, redirection).
//! - **Target**: the [`ExecutorTarget`](target::ExecutorTarget) capability
//!   and lazy, cached shell discovery shared by every target.
//! - **Host** / **Binary**: the base executor spawning local processes and
//!   the wrapper prefixing every call with a fixed binary.
//! - **Podman**: the engine and compose executors used by the rest of the
//!   workspace.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod binary;
pub mod command;
pub mod completed;
pub mod host;
pub mod podman;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;
pub mod target;

pub use binary::BinaryExecutor;
pub use command::{ArgCommand, Command, ShellCommand};
pub use completed::{CompletedExec, ExecOptions};
pub use host::HostExecutor;
pub use podman::PodmanClient;
pub use target::{ExecutorTarget, SharedTarget, ShellCache};

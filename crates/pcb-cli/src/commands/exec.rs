//! `podman-compose-backup exec`: Run a command inside a service's container.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use pcb_exec::{ArgCommand, Command, ExecOptions, ShellCommand};

use super::Context;

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Service whose container runs the command.
    pub service: String,

    /// Working directory inside the container.
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Run the command through the container's shell.
    #[arg(long)]
    pub shell: bool,

    /// Command to execute.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

impl ExecArgs {
    fn to_command(&self) -> Command {
        if self.shell {
            ShellCommand::new(self.command.join(" ")).into()
        } else {
            ArgCommand::new(&self.command).into()
        }
    }
}

/// Executes the `exec` command.
///
/// Output is streamed and the process exits with the command's exit code.
///
/// # Errors
///
/// Returns an error for an unknown service, if podman cannot be located,
/// or if no shell is found for `--shell`.
pub fn execute(args: &ExecArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let service = ctx.project.service(&args.service)?;
    let podman = ctx.podman()?;
    let target = service.target(&podman);

    let mut options = ExecOptions::unchecked();
    options.work_dir.clone_from(&args.workdir);

    let command = args.to_command();
    tracing::info!(service = %service.name(), %command, "running command in container");
    let done = command.run(&target, &options)?;
    tracing::debug!(exit_code = done.exit_code, "command finished");

    Ok(ExitCode::from(u8::try_from(done.exit_code).unwrap_or(1)))
}

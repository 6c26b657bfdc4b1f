//! Executor targets scoped to a compose project or one of its services.

use std::path::{Path, PathBuf};

use pcb_common::error::Result;
use pcb_common::types::{ContainerName, ProjectName};
use pcb_exec::{ArgCommand, CompletedExec, ExecOptions, ExecutorTarget, ShellCache};

/// Runs `podman-compose --project-name=<name> --file=<f>... <command>`.
///
/// Commands run in the project's reference directory unless the caller
/// passes another working directory.
#[derive(Debug)]
pub struct ComposeTarget<'a> {
    compose: &'a dyn ExecutorTarget,
    project_name: &'a ProjectName,
    files: &'a [PathBuf],
    ref_dir: &'a Path,
    shell: &'a ShellCache,
}

impl<'a> ComposeTarget<'a> {
    /// Scopes `compose` to a project.
    #[must_use]
    pub const fn new(
        compose: &'a dyn ExecutorTarget,
        project_name: &'a ProjectName,
        files: &'a [PathBuf],
        ref_dir: &'a Path,
        shell: &'a ShellCache,
    ) -> Self {
        Self {
            compose,
            project_name,
            files,
            ref_dir,
            shell,
        }
    }

    fn project_args(&self) -> ArgCommand {
        ArgCommand::from_single(format!("--project-name={}", self.project_name)).extend_present(
            self.files
                .iter()
                .map(|file| Some(format!("--file={}", file.display()))),
        )
    }
}

impl ExecutorTarget for ComposeTarget<'_> {
    fn exec(&self, command: &[String], options: &ExecOptions) -> Result<CompletedExec> {
        let full = self.project_args() + ArgCommand::new(command);
        let mut options = options.clone();
        if options.work_dir.is_none() {
            options.work_dir = Some(self.ref_dir.to_path_buf());
        }
        full.run(self.compose, &options)
    }

    fn shell_cache(&self) -> &ShellCache {
        self.shell
    }
}

/// Runs commands inside a service's container through
/// `podman container exec`.
///
/// The working directory is applied inside the container with
/// `--workdir`, never to the engine process on the host.
#[derive(Debug)]
pub struct ServiceTarget<'a> {
    engine: &'a dyn ExecutorTarget,
    container: &'a ContainerName,
    shell: &'a ShellCache,
}

impl<'a> ServiceTarget<'a> {
    /// Scopes `engine` to one container.
    #[must_use]
    pub const fn new(
        engine: &'a dyn ExecutorTarget,
        container: &'a ContainerName,
        shell: &'a ShellCache,
    ) -> Self {
        Self {
            engine,
            container,
            shell,
        }
    }

    /// The container commands are run in.
    pub const fn container(&self) -> &ContainerName {
        self.container
    }
}

impl ExecutorTarget for ServiceTarget<'_> {
    fn exec(&self, command: &[String], options: &ExecOptions) -> Result<CompletedExec> {
        let workdir = options
            .work_dir
            .as_ref()
            .map(|dir| format!("--workdir={}", dir.display()));
        let full = ArgCommand::combine([
            vec![
                Some("container".to_owned()),
                Some("exec".to_owned()),
                Some("--interactive=false".to_owned()),
                workdir,
                Some(self.container.to_string()),
            ],
            command.iter().cloned().map(Some).collect(),
        ]);
        let options = ExecOptions {
            work_dir: None,
            ..options.clone()
        };
        full.run(self.engine, &options)
    }

    fn shell_cache(&self) -> &ShellCache {
        self.shell
    }
}

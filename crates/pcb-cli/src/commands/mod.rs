//! CLI command definitions and dispatch.

pub mod config;
pub mod exec;
pub mod services;
pub mod volumes;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use pcb_common::config::ToolConfig;
use pcb_common::constants::DEFAULT_COMPOSE_FILE;
use pcb_compose::{ComposeLoader, Project};
use pcb_exec::{HostExecutor, PodmanClient, SharedTarget};

/// Inspect podman-compose projects and their volume backup policies.
#[derive(Parser, Debug)]
#[command(name = pcb_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Compose file, repeatable; later files override earlier ones.
    #[arg(short = 'f', long = "file", global = true, default_value = DEFAULT_COMPOSE_FILE)]
    pub files: Vec<PathBuf>,

    /// Project name; defaults to the directory of the first file.
    #[arg(short = 'p', long, global = true)]
    pub project_name: Option<String>,

    /// Path to the podman binary.
    #[arg(long, global = true, env = "PODMAN_PATH")]
    pub podman_path: Option<PathBuf>,

    /// Path to the podman-compose binary.
    #[arg(long, global = true, env = "PODMAN_COMPOSE_PATH")]
    pub podman_compose_path: Option<PathBuf>,

    /// Global argument passed to podman on every call, repeatable.
    #[arg(long = "podman-arg", global = true, allow_hyphen_values = true)]
    pub podman_args: Vec<String>,

    /// Kill commands still running after this many seconds.
    #[arg(long, global = true, value_name = "SECONDS")]
    pub exec_timeout: Option<u64>,

    /// Volume label prefix, repeatable; earlier prefixes take precedence.
    #[arg(long = "label-prefix", global = true)]
    pub label_prefixes: Vec<String>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged and interpolated compose definition.
    Config(config::ConfigArgs),
    /// List services, their mounts, and the startup order.
    Services(services::ServicesArgs),
    /// List volumes and, optionally, their backup policies.
    Volumes(volumes::VolumesArgs),
    /// Run a command inside a service's container.
    Exec(exec::ExecArgs),
}

impl Cli {
    /// Tool configuration for this invocation.
    pub fn tool_config(&self) -> ToolConfig {
        let defaults = ToolConfig::default();
        ToolConfig {
            files: self.files.clone(),
            project_name: self.project_name.clone(),
            podman_path: self.podman_path.clone(),
            podman_compose_path: self.podman_compose_path.clone(),
            podman_args: self.podman_args.clone(),
            exec_timeout: self.exec_timeout.map(Duration::from_secs),
            label_prefixes: if self.label_prefixes.is_empty() {
                defaults.label_prefixes
            } else {
                self.label_prefixes.clone()
            },
        }
    }
}

/// Everything a command needs: the configuration and the loaded project.
#[derive(Debug)]
pub struct Context {
    /// Tool configuration.
    pub config: ToolConfig,
    /// The resolved compose project.
    pub project: Project,
}

impl Context {
    /// Loads the project named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the compose files cannot be resolved.
    pub fn load(config: ToolConfig) -> anyhow::Result<Self> {
        let project = ComposeLoader::new()
            .project_name(config.project_name.clone())
            .load(&config.files)
            .context("cannot resolve compose project")?;
        Ok(Self { config, project })
    }

    /// Podman executors over the local host.
    ///
    /// # Errors
    ///
    /// Returns an error if a binary cannot be located.
    pub fn podman(&self) -> anyhow::Result<PodmanClient> {
        let host: SharedTarget = match self.config.exec_timeout {
            Some(timeout) => Arc::new(HostExecutor::with_timeout(timeout)),
            None => Arc::new(HostExecutor::new()),
        };
        Ok(PodmanClient::from_config(host, &self.config)?)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if loading the project or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let ctx = Context::load(cli.tool_config())?;
    match cli.command {
        Command::Config(args) => config::execute(&args, &ctx),
        Command::Services(args) => services::execute(&args, &ctx),
        Command::Volumes(args) => volumes::execute(&args, &ctx),
        Command::Exec(args) => exec::execute(&args, &ctx),
    }
}

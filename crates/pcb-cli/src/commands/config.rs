//! `podman-compose-backup config`: Print the resolved compose definition.

use std::process::ExitCode;

use clap::Args;

use super::Context;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print only the service names, one per line.
    #[arg(long)]
    pub services: bool,
}

/// Executes the `config` command.
///
/// # Errors
///
/// Returns an error if the project cannot be rendered as YAML.
#[allow(clippy::print_stdout)]
pub fn execute(args: &ConfigArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    if args.services {
        for name in ctx.project.services().keys() {
            println!("{name}");
        }
    } else {
        print!("{}", ctx.project.to_yaml()?);
    }
    Ok(ExitCode::SUCCESS)
}

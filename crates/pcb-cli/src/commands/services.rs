//! `podman-compose-backup services`: List services and their startup order.

use std::process::ExitCode;

use clap::Args;

use super::Context;
use crate::output::{format_mount, list_or_dash};

/// Arguments for the `services` command.
#[derive(Args, Debug)]
pub struct ServicesArgs {
    /// Only show this service and what it transitively depends on.
    pub service: Option<String>,
}

/// Executes the `services` command.
///
/// # Errors
///
/// Returns an error for unknown services, unresolvable dependencies,
/// dependency cycles, or unsupported volume mounts.
#[allow(clippy::print_stdout)]
pub fn execute(args: &ServicesArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let project = &ctx.project;

    let (services, order) = match &args.service {
        Some(name) => {
            let mut order = project.transitive_dependencies(name)?;
            order.push(project.service(name)?);
            (order.clone(), order)
        }
        None => (
            project.services().values().collect(),
            project.startup_order()?,
        ),
    };

    println!(
        "{:<20} {:<30} {:<30} {}",
        "SERVICE", "CONTAINER", "DEPENDS ON", "MOUNTS"
    );
    for service in &services {
        let mounts = service.volume_mounts(project)?;
        println!(
            "{:<20} {:<30} {:<30} {}",
            service.name(),
            service.container_name(),
            list_or_dash(service.depends_on()),
            list_or_dash(mounts.iter().map(format_mount)),
        );
    }
    println!();
    println!(
        "startup order: {}",
        list_or_dash(order.iter().map(|service| service.name()))
    );
    Ok(ExitCode::SUCCESS)
}

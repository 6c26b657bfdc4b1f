//! `podman-compose-backup volumes`: List volumes and their backup policies.

use std::process::ExitCode;

use clap::Args;
use pcb_compose::{BackupConfig, Volume};
use pcb_exec::PodmanClient;

use super::Context;
use crate::output::{format_mount, list_or_dash, or_dash};

/// Arguments for the `volumes` command.
#[derive(Args, Debug)]
pub struct VolumesArgs {
    /// Query podman for each volume and show its backup policy.
    #[arg(long)]
    pub inspect: bool,
}

/// Executes the `volumes` command.
///
/// # Errors
///
/// Returns an error if a mount cannot be parsed, podman cannot be
/// located, or a volume's inspection or labels are invalid.
#[allow(clippy::print_stdout)]
pub fn execute(args: &VolumesArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let project = &ctx.project;
    let podman = if args.inspect {
        Some(ctx.podman()?)
    } else {
        None
    };

    for volume in project.volumes().values() {
        let users = project.volume_users(volume.name().as_str())?;
        println!("{}", volume.name());
        println!("  public name: {}", volume.public_name());
        println!("  external:    {}", volume.is_external());
        println!(
            "  used by:     {}",
            list_or_dash(users.iter().map(|m| format!("{} ({})", m.service, format_mount(m))))
        );
        if let Some(podman) = &podman {
            print_inspection(volume, podman, &ctx.config.label_prefixes)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::print_stdout)]
fn print_inspection(
    volume: &Volume,
    podman: &PodmanClient,
    prefixes: &[String],
) -> anyhow::Result<()> {
    let inspect = volume.inspect(podman.engine())?;
    println!("  driver:      {}", inspect.driver);
    println!("  mountpoint:  {}", inspect.mountpoint.display());
    println!("  created:     {}", inspect.created_at.to_rfc3339());

    let BackupConfig {
        enable,
        container,
        image,
        mount_target,
        stop,
        backup_cmd,
        restore_cmd,
        compress_image,
        compress_cmd,
        decompress_cmd,
    } = volume.backup_config(podman.engine(), prefixes)?;
    println!("  backup:");
    println!("    enable:         {enable}");
    println!("    container:      {}", or_dash(container.as_ref()));
    println!("    image:          {image}");
    println!("    mount target:   {mount_target}");
    println!("    stop:           {stop}");
    println!("    backup cmd:     {backup_cmd}");
    println!("    restore cmd:    {restore_cmd}");
    println!("    compress image: {}", or_dash(compress_image.as_ref()));
    println!("    compress cmd:   {}", or_dash(compress_cmd.as_ref()));
    println!("    decompress cmd: {}", or_dash(decompress_cmd.as_ref()));
    Ok(())
}

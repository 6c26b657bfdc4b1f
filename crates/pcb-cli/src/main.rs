//! # podman-compose-backup
//!
//! Inspects podman-compose projects: the merged compose definition, its
//! services and their startup order, volumes and their backup policies,
//! and runs commands inside service containers.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use pcb_common::error::PcbError;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match commands::execute(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            #[allow(clippy::print_stderr)]
            {
                eprintln!("error: {err:#}");
            }
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// File access problems exit with 2, everything else with 1.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PcbError>() {
        Some(pcb) if pcb.is_file_access() => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn missing_file_maps_to_two() {
        let err = anyhow::Error::new(PcbError::Io {
            path: PathBuf::from("docker-compose.yml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn schema_errors_map_to_one() {
        let err = anyhow::Error::new(PcbError::UnsupportedVersion {
            version: "2.4".to_owned(),
        })
        .context("loading project");
        assert_eq!(exit_code_for(&err), 1);
    }
}

//! The container engine and compose orchestrator executors.

use std::path::{Path, PathBuf};

use pcb_common::config::ToolConfig;
use pcb_common::constants::{PODMAN_BIN, PODMAN_COMPOSE_BIN};
use pcb_common::error::{PcbError, Result};

use crate::binary::BinaryExecutor;
use crate::target::SharedTarget;

/// Binary executors for `podman` and `podman-compose` over one host.
#[derive(Debug)]
pub struct PodmanClient {
    engine: BinaryExecutor,
    compose: BinaryExecutor,
}

impl PodmanClient {
    /// Builds the client from explicit binary paths.
    ///
    /// `podman_args` are placed right after the engine binary on every call.
    #[must_use]
    pub fn new(
        host: SharedTarget,
        podman: &Path,
        podman_args: &[String],
        podman_compose: &Path,
    ) -> Self {
        let engine_prefix = std::iter::once(podman.to_string_lossy().into_owned())
            .chain(podman_args.iter().cloned());
        Self {
            engine: BinaryExecutor::new(host.clone(), engine_prefix),
            compose: BinaryExecutor::new(host, [podman_compose.to_string_lossy().into_owned()]),
        }
    }

    /// Builds the client from the tool configuration, looking binaries up
    /// on `PATH` when no explicit path is configured.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NotFound`] if a binary cannot be located.
    pub fn from_config(host: SharedTarget, config: &ToolConfig) -> Result<Self> {
        let podman = locate(config.podman_path.as_deref(), PODMAN_BIN)?;
        let podman_compose = locate(config.podman_compose_path.as_deref(), PODMAN_COMPOSE_BIN)?;
        tracing::info!(
            podman = %podman.display(),
            podman_compose = %podman_compose.display(),
            "using container engine binaries"
        );
        Ok(Self::new(host, &podman, &config.podman_args, &podman_compose))
    }

    /// Executor running `podman [global args] ...`.
    pub const fn engine(&self) -> &BinaryExecutor {
        &self.engine
    }

    /// Executor running `podman-compose ...`.
    pub const fn compose(&self) -> &BinaryExecutor {
        &self.compose
    }
}

fn locate(explicit: Option<&Path>, name: &str) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    which::which(name).map_err(|e| PcbError::NotFound {
        kind: "binary",
        id: format!("{name} ({e})"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::completed::ExecOptions;
    use crate::scripted::ScriptedExecutor;
    use crate::target::ExecutorTarget;

    #[test]
    fn engine_carries_global_args() {
        let host = Arc::new(ScriptedExecutor::new());
        let client = PodmanClient::new(
            host.clone(),
            Path::new("/usr/bin/podman"),
            &["--remote".to_owned()],
            Path::new("/usr/bin/podman-compose"),
        );
        let _ = client
            .engine()
            .exec(&["ps".to_owned()], &ExecOptions::checked())
            .unwrap();
        let _ = client
            .compose()
            .exec(&["up".to_owned()], &ExecOptions::checked())
            .unwrap();

        let calls = host.calls();
        assert_eq!(calls[0].command, ["/usr/bin/podman", "--remote", "ps"]);
        assert_eq!(calls[1].command, ["/usr/bin/podman-compose", "up"]);
    }

    #[test]
    fn explicit_paths_skip_lookup() {
        let config = ToolConfig {
            podman_path: Some("/opt/podman".into()),
            podman_compose_path: Some("/opt/podman-compose".into()),
            ..ToolConfig::default()
        };
        let client = PodmanClient::from_config(Arc::new(ScriptedExecutor::new()), &config).unwrap();
        assert_eq!(client.engine().prefix(), ["/opt/podman"]);
        assert_eq!(client.compose().prefix(), ["/opt/podman-compose"]);
    }

    #[test]
    fn unknown_binary_is_not_found() {
        let err = locate(None, "pcb-definitely-not-installed").unwrap_err();
        assert!(matches!(err, PcbError::NotFound { kind: "binary", .. }));
    }
}

//! Tool configuration assembled from the command line and environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Root configuration for one invocation of the tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Compose documents, merged in order.
    pub files: Vec<PathBuf>,
    /// Explicit project name; derived from the first file's directory when absent.
    pub project_name: Option<String>,
    /// Container engine binary; looked up on `PATH` when absent.
    pub podman_path: Option<PathBuf>,
    /// Compose orchestration binary; looked up on `PATH` when absent.
    pub podman_compose_path: Option<PathBuf>,
    /// Global arguments placed after the engine binary on every call.
    pub podman_args: Vec<String>,
    /// Kill processes running longer than this.
    pub exec_timeout: Option<Duration>,
    /// Volume label prefixes, in precedence order.
    pub label_prefixes: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            files: vec![PathBuf::from(constants::DEFAULT_COMPOSE_FILE)],
            project_name: None,
            podman_path: None,
            podman_compose_path: None,
            podman_args: Vec::new(),
            exec_timeout: None,
            label_prefixes: constants::LABEL_PREFIXES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }
}

//! Unified error types for the podman-compose-backup workspace.
//!
//! Every crate reports failures through [`PcbError`]; the CLI maps the
//! variants onto process exit codes.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum PcbError {
    /// An input file could not be opened or read.
    #[error("{}: {}", .source, .path.display())]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A compose document or label set is structurally invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The merged project declares a compose schema outside the 3.x family.
    #[error("compose file version {version:?} is not supported, only 3.x compose files are")]
    UnsupportedVersion {
        /// Version string found in the merged project.
        version: String,
    },

    /// A service volume definition uses a mount kind that cannot be handled.
    #[error("unsupported volume mount {definition:?}: {reason}")]
    UnsupportedMount {
        /// The offending definition, rendered as written.
        definition: String,
        /// Why the definition was rejected.
        reason: String,
    },

    /// A referenced service or volume does not exist in the project.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The `depends_on` relation between services contains a cycle.
    #[error("cyclic dependency detected between services: {}", .services.join(", "))]
    CyclicDependency {
        /// Services taking part in the cycle.
        services: Vec<String>,
    },

    /// A decompress command was configured without a compress command.
    #[error("compress-cmd must be specified as it cannot be derived from decompress-cmd {decompress:?}")]
    DecompressWithoutCompress {
        /// The configured decompress command.
        decompress: String,
    },

    /// A process could not be spawned at all.
    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A checked process exited with a non-zero status.
    #[error("command {command:?} exited with code {exit_code}")]
    ExecFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, `-1` when terminated by a signal.
        exit_code: i32,
        /// Captured standard output, if capture was requested.
        stdout: Option<String>,
    },

    /// A process exceeded the configured execution timeout and was killed.
    #[error("command {command:?} timed out after {timeout:?}")]
    Timeout {
        /// Rendered command line.
        command: String,
        /// Timeout that elapsed.
        timeout: std::time::Duration,
    },

    /// No candidate shell could be run on an executor target.
    #[error("could not find an acceptable shell on this target, searched for {searched:?}")]
    NoShell {
        /// Candidates probed, in order.
        searched: Vec<String>,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML (de)serialization failed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl PcbError {
    /// Shorthand for a [`PcbError::Config`] with the given message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns whether this error is a failure to access an input file
    /// (missing, is a directory, or a path component is not a directory).
    pub fn is_file_access(&self) -> bool {
        use std::io::ErrorKind;

        matches!(
            self,
            Self::Io { source, .. } if matches!(
                source.kind(),
                ErrorKind::NotFound | ErrorKind::IsADirectory | ErrorKind::NotADirectory
            )
        )
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PcbError>;

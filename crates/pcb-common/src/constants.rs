//! Tool-wide constants and defaults.

/// Label prefixes recognised on volumes, in precedence order.
///
/// Several prefixes may coexist once the label scheme is standardised;
/// for a given field the first matching prefix wins.
pub const LABEL_PREFIXES: &[&str] = &["work.banananet.podman.backup."];

/// Default path the volume is mounted at inside the backup container.
pub const DEFAULT_MOUNT_TARGET: &str = "/_volume";

/// Default image used for backup containers.
pub const DEFAULT_BACKUP_IMAGE: &str = "docker.io/library/debian:stable";

/// Default command streaming the volume content to stdout.
pub const DEFAULT_BACKUP_CMD: &str = "tar -cf - .";

/// Default command restoring the volume content from stdin.
pub const DEFAULT_RESTORE_CMD: &str = "tar -xf -";

/// POSIX shells probed, in order, when a target must run a shell string.
pub const SHELL_CANDIDATES: &[&str] = &["/usr/bin/bash", "/bin/bash", "/usr/bin/sh", "/bin/sh"];

/// Compose file loaded when none is given.
pub const DEFAULT_COMPOSE_FILE: &str = "./docker-compose.yml";

/// Prefix every supported compose schema version starts with.
pub const SUPPORTED_VERSION_PREFIX: &str = "3.";

/// Container engine binary looked up on `PATH`.
pub const PODMAN_BIN: &str = "podman";

/// Compose orchestration binary looked up on `PATH`.
pub const PODMAN_COMPOSE_BIN: &str = "podman-compose";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "podman-compose-backup";

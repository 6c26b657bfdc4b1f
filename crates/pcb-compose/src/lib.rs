//! # pcb-compose
//!
//! Compose project resolution for podman-compose deployments.
//!
//! - **Loader**: reads compose files, normalizes short forms, substitutes
//!   environment variables, and merges them in order.
//! - **Project**: services, volumes, dependency ordering, and volume usage
//!   of the merged definition.
//! - **Mount**: parsing of named-volume mounts in both notations.
//! - **Backup**: per-volume backup policy derived from engine labels.
//! - **Target**: executor targets for `podman-compose` and for commands
//!   inside a service's container.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod backup;
pub mod graph;
pub mod interpolate;
pub mod loader;
pub mod merge;
pub mod mount;
pub mod normalize;
pub mod project;
pub mod service;
pub mod target;
pub mod volume;

pub use backup::BackupConfig;
pub use loader::{ComposeLoader, load};
pub use mount::ServiceVolumeMount;
pub use project::Project;
pub use service::Service;
pub use target::{ComposeTarget, ServiceTarget};
pub use volume::{Volume, VolumeInspect};

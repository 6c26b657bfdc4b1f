//! Services of a compose project.

use std::sync::OnceLock;

use pcb_common::error::{PcbError, Result};
use pcb_common::types::{ContainerName, ProjectName, ServiceName};
use pcb_exec::{PodmanClient, ShellCache};
use serde_yaml::{Mapping, Value};

use crate::mount::ServiceVolumeMount;
use crate::project::Project;
use crate::target::ServiceTarget;

/// A container definition within a project.
///
/// Dependencies and mounts refer to other parts of the project and are
/// resolved against it on access, so an unknown name only fails when it is
/// actually looked up.
#[derive(Debug)]
pub struct Service {
    name: ServiceName,
    container_name: ContainerName,
    depends_on: Vec<ServiceName>,
    volume_defs: Vec<Value>,
    definition: Mapping,
    mounts: OnceLock<Vec<ServiceVolumeMount>>,
    shell: ShellCache,
}

impl Service {
    /// Builds the service from its normalized definition.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::Config`] if the definition is not a mapping or
    /// `depends_on` / `volumes` have the wrong shape.
    pub fn new(project: &ProjectName, name: ServiceName, definition: &Value) -> Result<Self> {
        let definition = match definition {
            Value::Null => Mapping::new(),
            Value::Mapping(def) => def.clone(),
            _ => {
                return Err(PcbError::config(format!(
                    "service {name} must be a mapping"
                )));
            }
        };

        let container_name = match definition.get("container_name") {
            None | Some(Value::Null) => ContainerName::derived(project, &name),
            Some(Value::String(explicit)) => ContainerName::new(explicit.as_str()),
            Some(other) => {
                return Err(PcbError::config(format!(
                    "container_name of service {name} must be a string, got {other:?}"
                )));
            }
        };

        let depends_on = match definition.get("depends_on") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(deps)) => deps
                .iter()
                .map(|dep| {
                    dep.as_str().map(ServiceName::new).ok_or_else(|| {
                        PcbError::config(format!(
                            "depends_on of service {name} must list service names"
                        ))
                    })
                })
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(PcbError::config(format!(
                    "depends_on of service {name} must be a list"
                )));
            }
        };

        let volume_defs = match definition.get("volumes") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(defs)) => defs.clone(),
            Some(_) => {
                return Err(PcbError::config(format!(
                    "volumes of service {name} must be a list"
                )));
            }
        };

        Ok(Self {
            name,
            container_name,
            depends_on,
            volume_defs,
            definition,
            mounts: OnceLock::new(),
            shell: ShellCache::new(),
        })
    }

    /// Service name.
    pub const fn name(&self) -> &ServiceName {
        &self.name
    }

    /// Name of the service's container.
    pub const fn container_name(&self) -> &ContainerName {
        &self.container_name
    }

    /// Names listed in `depends_on`, unresolved.
    pub fn depends_on(&self) -> &[ServiceName] {
        &self.depends_on
    }

    /// The merged definition.
    pub const fn definition(&self) -> &Mapping {
        &self.definition
    }

    /// Services this one directly depends on.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NotFound`] for a name missing from the project.
    pub fn dependencies<'p>(&self, project: &'p Project) -> Result<Vec<&'p Service>> {
        self.depends_on
            .iter()
            .map(|dep| project.service(dep.as_str()))
            .collect()
    }

    /// Named volumes mounted by this service, parsed once.
    ///
    /// # Errors
    ///
    /// Returns the first mount that fails to parse or references an
    /// undeclared volume.
    pub fn volume_mounts(&self, project: &Project) -> Result<&[ServiceVolumeMount]> {
        if let Some(mounts) = self.mounts.get() {
            return Ok(mounts);
        }
        let mounts = self
            .volume_defs
            .iter()
            .map(|def| ServiceVolumeMount::parse(&self.name, def, project.volumes()))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(service = %self.name, count = mounts.len(), "parsed volume mounts");
        Ok(self.mounts.get_or_init(|| mounts))
    }

    /// Executor running commands inside this service's container.
    pub fn target<'a>(&'a self, podman: &'a PodmanClient) -> ServiceTarget<'a> {
        ServiceTarget::new(podman.engine(), &self.container_name, &self.shell)
    }
}

//! The resolved compose project.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pcb_common::constants::SUPPORTED_VERSION_PREFIX;
use pcb_common::error::{PcbError, Result};
use pcb_common::types::{ProjectName, ServiceName, VolumeName};
use pcb_exec::{PodmanClient, ShellCache};
use serde_yaml::{Mapping, Value};

use crate::graph::DependencyGraph;
use crate::mount::ServiceVolumeMount;
use crate::service::Service;
use crate::target::ComposeTarget;
use crate::volume::Volume;

/// A merged and validated compose definition.
#[derive(Debug)]
pub struct Project {
    name: ProjectName,
    ref_dir: PathBuf,
    files: Vec<PathBuf>,
    version: String,
    document: Mapping,
    services: BTreeMap<ServiceName, Service>,
    volumes: BTreeMap<VolumeName, Volume>,
    compose_shell: ShellCache,
}

impl Project {
    /// Builds a project from an already merged document.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::UnsupportedVersion`] unless the version starts
    /// with `3.`, and [`PcbError::Config`] if `services` or `volumes` are
    /// malformed.
    pub fn from_document(
        name: ProjectName,
        ref_dir: PathBuf,
        files: Vec<PathBuf>,
        document: Mapping,
    ) -> Result<Self> {
        let version = document_version(&document)?;
        if !version.starts_with(SUPPORTED_VERSION_PREFIX) {
            return Err(PcbError::UnsupportedVersion { version });
        }

        let services = section(&document, "services")?
            .iter()
            .map(|(key, def)| -> Result<_> {
                let svc = ServiceName::new(key_name(key, "services")?);
                Ok((svc.clone(), Service::new(&name, svc, def)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        let volumes = section(&document, "volumes")?
            .iter()
            .map(|(key, def)| -> Result<_> {
                let vol = VolumeName::new(key_name(key, "volumes")?);
                Ok((vol.clone(), Volume::new(&name, vol, def)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        tracing::info!(
            project = %name,
            %version,
            services = services.len(),
            volumes = volumes.len(),
            "resolved compose project"
        );
        Ok(Self {
            name,
            ref_dir,
            files,
            version,
            document,
            services,
            volumes,
            compose_shell: ShellCache::new(),
        })
    }

    /// Project name.
    pub const fn name(&self) -> &ProjectName {
        &self.name
    }

    /// Directory of the first compose file.
    pub fn ref_dir(&self) -> &Path {
        &self.ref_dir
    }

    /// Compose files, in merge order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Schema version of the merged document.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The merged, interpolated document.
    pub const fn document(&self) -> &Mapping {
        &self.document
    }

    /// All services by name.
    pub const fn services(&self) -> &BTreeMap<ServiceName, Service> {
        &self.services
    }

    /// All volumes by logical name.
    pub const fn volumes(&self) -> &BTreeMap<VolumeName, Volume> {
        &self.volumes
    }

    /// Looks up a service.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NotFound`] if no such service exists.
    pub fn service(&self, name: &str) -> Result<&Service> {
        self.services.get(name).ok_or_else(|| PcbError::NotFound {
            kind: "service",
            id: name.to_owned(),
        })
    }

    /// Looks up a volume by logical name.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NotFound`] if no such volume exists.
    pub fn volume(&self, name: &str) -> Result<&Volume> {
        self.volumes.get(name).ok_or_else(|| PcbError::NotFound {
            kind: "volume",
            id: name.to_owned(),
        })
    }

    /// Direct dependencies of `service`.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NotFound`] for an unknown service or dependency.
    pub fn dependencies(&self, service: &str) -> Result<Vec<&Service>> {
        self.service(service)?.dependencies(self)
    }

    /// Graph of every `depends_on` edge in the project.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NotFound`] if a service depends on an unknown
    /// name.
    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        for service in self.services.values() {
            let _ = graph.add_service(service.name());
            for dep in service.dependencies(self)? {
                graph.add_dependency(service.name(), dep.name());
            }
        }
        Ok(graph)
    }

    /// Every service, dependencies before their dependents.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::CyclicDependency`] for circular dependencies and
    /// [`PcbError::NotFound`] for unknown names.
    pub fn startup_order(&self) -> Result<Vec<&Service>> {
        self.dependency_graph()?
            .resolve_order()?
            .iter()
            .map(|name| self.service(name.as_str()))
            .collect()
    }

    /// Every service that has to run before `service`, in startup order.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NotFound`] for an unknown name and
    /// [`PcbError::CyclicDependency`] if `service` or one of its
    /// dependencies is part of a cycle. Cycles among unrelated services
    /// are ignored.
    pub fn transitive_dependencies(&self, service: &str) -> Result<Vec<&Service>> {
        let service = self.service(service)?;
        self.dependency_graph()?
            .dependencies_of(service.name())?
            .iter()
            .map(|name| self.service(name.as_str()))
            .collect()
    }

    /// Mounts of every service.
    ///
    /// # Errors
    ///
    /// Returns the first mount that fails to parse.
    pub fn volume_mounts(&self) -> Result<Vec<&ServiceVolumeMount>> {
        let mut all = Vec::new();
        for service in self.services.values() {
            all.extend(service.volume_mounts(self)?);
        }
        Ok(all)
    }

    /// Mounts referencing `volume`, across all services.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::NotFound`] for an unknown volume, or the first
    /// mount that fails to parse.
    pub fn volume_users(&self, volume: &str) -> Result<Vec<&ServiceVolumeMount>> {
        let volume = self.volume(volume)?;
        Ok(self
            .volume_mounts()?
            .into_iter()
            .filter(|mount| &mount.volume == volume.name())
            .collect())
    }

    /// The merged document as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::Yaml`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.document)?)
    }

    /// Executor running `podman-compose` against this project.
    pub fn compose_target<'a>(&'a self, podman: &'a PodmanClient) -> ComposeTarget<'a> {
        ComposeTarget::new(
            podman.compose(),
            &self.name,
            &self.files,
            &self.ref_dir,
            &self.compose_shell,
        )
    }
}

fn document_version(document: &Mapping) -> Result<String> {
    match document.get("version") {
        Some(Value::String(version)) => Ok(version.clone()),
        Some(Value::Number(version)) => Ok(version.to_string()),
        None | Some(Value::Null) => Err(PcbError::config("compose file has no version")),
        Some(other) => Err(PcbError::config(format!(
            "compose version must be a string, got {other:?}"
        ))),
    }
}

fn section<'d>(document: &'d Mapping, key: &str) -> Result<Cow<'d, Mapping>> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(Cow::Owned(Mapping::new())),
        Some(Value::Mapping(entries)) => Ok(Cow::Borrowed(entries)),
        Some(_) => Err(PcbError::config(format!("top-level {key} must be a mapping"))),
    }
}

fn key_name<'k>(key: &'k Value, section: &str) -> Result<&'k str> {
    key.as_str()
        .ok_or_else(|| PcbError::config(format!("{section} keys must be strings, got {key:?}")))
}
